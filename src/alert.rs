use crate::evaluator::TransactionCheck;
use crate::rule::{short_id, RuleAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persistent record of a flagged evaluation, tracked through the review
/// workflow. Attribution (`rule_id`/`rule_name`) always names the first rule
/// that matched, even when several did.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub transaction_id: String,
    pub customer_id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub status: AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// `pending_review` and `blocked` are the two entry states, picked by the
/// triggering rule's action. `approved` and `rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    PendingReview,
    Blocked,
    Approved,
    Rejected,
}

impl AlertStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AlertStatus::Approved | AlertStatus::Rejected)
    }
}

/// Operator decision on a pending alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Approve,
    Reject,
}

impl Resolution {
    pub fn terminal_status(self) -> AlertStatus {
        match self {
            Resolution::Approve => AlertStatus::Approved,
            Resolution::Reject => AlertStatus::Rejected,
        }
    }
}

impl Alert {
    /// Build the alert for a flagged evaluation. `created_at` is the
    /// evaluation's own timestamp so the two records agree.
    pub fn from_check(
        check: &TransactionCheck,
        rule_id: &str,
        rule_name: &str,
        rule_action: RuleAction,
        created_at: DateTime<Utc>,
    ) -> Self {
        let status = match rule_action {
            RuleAction::Block => AlertStatus::Blocked,
            RuleAction::Review => AlertStatus::PendingReview,
        };
        Self {
            id: short_id("alert"),
            transaction_id: check.transaction_id.clone(),
            customer_id: check.customer_id.clone(),
            rule_id: rule_id.to_owned(),
            rule_name: rule_name.to_owned(),
            amount: check.amount,
            country: check.country.clone(),
            status,
            notes: None,
            created_at,
            resolved_at: None,
        }
    }
}
