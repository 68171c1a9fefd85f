use crate::rule::{CheckContext, Rule, RuleAction};
use crate::window::ActivityWindow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// Transaction descriptor submitted for analysis. All fields are required
/// except `country`; card details are opaque to the engine and dropped at
/// the boundary.
#[derive(Debug, Clone)]
pub struct TransactionCheck {
    pub transaction_id: String,
    pub customer_id: String,
    pub amount: f64,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Overall recommendation for the transaction. Unlike `RuleAction`, this
/// includes `approve` for the clean case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Review,
    Block,
}

/// Projection of a matched rule into the evaluation result.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedRule {
    pub id: String,
    pub name: String,
    pub action: RuleAction,
}

impl From<&Rule> for FlaggedRule {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            action: rule.action,
        }
    }
}

/// Ephemeral verdict returned synchronously from an analyze call. Never
/// stored; `alert_id` is present only when the transaction was flagged.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub transaction_id: String,
    pub customer_id: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub flagged: bool,
    pub risk: RiskLevel,
    pub action: Verdict,
    pub flagged_rules: Vec<FlaggedRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Sweep the rule set in insertion order and collect every match. Insertion
/// order is what makes alert attribution deterministic: the first entry of
/// the returned list is the primary rule.
pub fn run_checks(
    rules: &[Rule],
    check: &TransactionCheck,
    activity: &ActivityWindow,
    now: Instant,
) -> Vec<FlaggedRule> {
    let ctx = CheckContext {
        amount: check.amount,
        country: check.country.as_deref(),
        activity,
        now,
    };
    rules
        .iter()
        .filter(|rule| rule.matches(&ctx))
        .map(FlaggedRule::from)
        .collect()
}

/// Severity aggregates across ALL matches: any blocking rule makes the
/// transaction high-risk, any match at all makes it at least medium.
pub fn risk_level(flagged: &[FlaggedRule]) -> RiskLevel {
    if flagged.is_empty() {
        RiskLevel::Low
    } else if flagged.iter().any(|r| r.action == RuleAction::Block) {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

pub fn verdict(flagged: &[FlaggedRule]) -> Verdict {
    if flagged.iter().any(|r| r.action == RuleAction::Block) {
        Verdict::Block
    } else if flagged.is_empty() {
        Verdict::Approve
    } else {
        Verdict::Review
    }
}
