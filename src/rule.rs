use crate::window::ActivityWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A declarative fraud rule. Wire names are camelCase to match the public
/// API; `conditions` is a tagged list, every entry of which must hold for
/// the rule to match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RuleStatus,
    pub conditions: Vec<Condition>,
    pub action: RuleAction,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    #[default]
    Active,
    Inactive,
}

/// What a matching rule asks for. `Block` outranks `Review` when several
/// rules match the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Review,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl CompareOp {
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Gt => lhs > rhs,
            CompareOp::Gte => lhs >= rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Lte => lhs <= rhs,
            CompareOp::Eq => (lhs - rhs).abs() < f64::EPSILON,
        }
    }
}

/// One check inside a rule, discriminated by `type` on the wire:
/// `amount_threshold`, `location_allowlist`, or `frequency_window`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Transaction amount compared against a fixed value.
    AmountThreshold { op: CompareOp, value: f64 },
    /// Matches when a country is present and NOT in the allow-list.
    /// Transactions without a country never match.
    LocationAllowlist { countries: Vec<String> },
    /// Number of transactions from the same customer within the trailing
    /// window, compared against `count`. The transaction under evaluation
    /// is included in the tally.
    FrequencyWindow {
        op: CompareOp,
        count: u32,
        window_seconds: u64,
    },
}

/// Everything a condition may inspect about the transaction being checked.
pub struct CheckContext<'a> {
    pub amount: f64,
    pub country: Option<&'a str>,
    pub activity: &'a ActivityWindow,
    pub now: Instant,
}

impl Condition {
    pub fn matches(&self, ctx: &CheckContext<'_>) -> bool {
        match self {
            Condition::AmountThreshold { op, value } => op.holds(ctx.amount, *value),
            Condition::LocationAllowlist { countries } => ctx
                .country
                .is_some_and(|c| !countries.iter().any(|allowed| allowed == c)),
            Condition::FrequencyWindow {
                op,
                count,
                window_seconds,
            } => {
                let seen = ctx
                    .activity
                    .count_within(Duration::from_secs(*window_seconds), ctx.now);
                op.holds(seen as f64, f64::from(*count))
            }
        }
    }
}

impl Rule {
    pub fn new(
        name: String,
        description: Option<String>,
        conditions: Vec<Condition>,
        action: RuleAction,
    ) -> Self {
        Self {
            id: short_id("rule"),
            name,
            description,
            status: RuleStatus::Active,
            conditions,
            action,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// A rule matches when it is active and every condition holds. A rule
    /// with no conditions never matches.
    pub fn matches(&self, ctx: &CheckContext<'_>) -> bool {
        self.status == RuleStatus::Active
            && !self.conditions.is_empty()
            && self.conditions.iter().all(|c| c.matches(ctx))
    }

    pub fn apply(&mut self, patch: RulePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(conditions) = patch.conditions {
            self.conditions = conditions;
        }
        if let Some(action) = patch.action {
            self.action = action;
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Partial update for `PUT /api/rules/:id`. Unknown fields in the request
/// body are ignored; `id` and `createdAt` are not patchable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<RuleStatus>,
    pub conditions: Option<Vec<Condition>>,
    pub action: Option<RuleAction>,
}

/// Short prefixed id in the style `rule-1a2b3c4d` / `alert-1a2b3c4d`.
pub fn short_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &uuid[..8])
}
