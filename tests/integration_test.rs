use fraudwatch::alert::{AlertStatus, Resolution};
use fraudwatch::config::FraudWatchConfig;
use fraudwatch::error::ServiceError;
use fraudwatch::evaluator::{RiskLevel, TransactionCheck, Verdict};
use fraudwatch::rule::{CompareOp, Condition, RuleAction, RulePatch, RuleStatus};
use fraudwatch::FraudEngine;

async fn engine() -> FraudEngine {
    FraudEngine::from_config(FraudWatchConfig::default())
        .await
        .unwrap()
}

fn check(tx: &str, customer: &str, amount: f64, country: Option<&str>) -> TransactionCheck {
    TransactionCheck {
        transaction_id: tx.to_string(),
        customer_id: customer.to_string(),
        amount,
        country: country.map(str::to_string),
    }
}

#[tokio::test]
async fn clean_transaction_approves() {
    let mut engine = engine().await;

    let result = engine.analyze(check("t1", "c1", 500.0, Some("US"))).await;

    assert!(!result.flagged);
    assert_eq!(result.risk, RiskLevel::Low);
    assert_eq!(result.action, Verdict::Approve);
    assert!(result.flagged_rules.is_empty());
    assert!(result.alert_id.is_none());
    assert!(engine.list_alerts().await.is_empty());
}

#[tokio::test]
async fn missing_country_skips_location_check() {
    let mut engine = engine().await;

    let result = engine.analyze(check("t1", "c1", 500.0, None)).await;
    assert!(!result.flagged);
    assert_eq!(result.action, Verdict::Approve);
}

#[tokio::test]
async fn high_amount_flags_for_review() {
    let mut engine = engine().await;

    let result = engine.analyze(check("t2", "c2", 1500.0, Some("US"))).await;

    assert!(result.flagged);
    assert_eq!(result.risk, RiskLevel::Medium);
    assert_eq!(result.action, Verdict::Review);
    assert_eq!(result.flagged_rules.len(), 1);
    assert_eq!(result.flagged_rules[0].id, "rule-001");

    let alerts = engine.list_alerts().await;
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(Some(alert.id.clone()), result.alert_id);
    assert_eq!(alert.status, AlertStatus::PendingReview);
    assert_eq!(alert.rule_id, "rule-001");
    assert_eq!(alert.rule_name, "High Amount Transactions");
    assert_eq!(alert.transaction_id, "t2");
    assert_eq!(alert.customer_id, "c2");
    assert_eq!(alert.created_at, result.timestamp);
}

#[tokio::test]
async fn unusual_location_blocks() {
    let mut engine = engine().await;

    let result = engine.analyze(check("t3", "c3", 500.0, Some("RU"))).await;

    assert!(result.flagged);
    assert_eq!(result.risk, RiskLevel::High);
    assert_eq!(result.action, Verdict::Block);
    assert_eq!(result.flagged_rules.len(), 1);
    assert_eq!(result.flagged_rules[0].id, "rule-003");

    let alerts = engine.list_alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, AlertStatus::Blocked);
}

#[tokio::test]
async fn attribution_goes_to_first_match_with_one_alert() {
    let mut engine = engine().await;

    // Matches both the amount rule (review) and the location rule (block):
    // severity aggregates across both, attribution goes to the first.
    let result = engine.analyze(check("t4", "c4", 2000.0, Some("RU"))).await;

    assert!(result.flagged);
    assert_eq!(result.flagged_rules.len(), 2);
    assert_eq!(result.risk, RiskLevel::High);
    assert_eq!(result.action, Verdict::Block);

    let alerts = engine.list_alerts().await;
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.rule_id, "rule-001");
    assert_eq!(alert.rule_name, "High Amount Transactions");
    // Entry status follows the primary rule's action, not the verdict.
    assert_eq!(alert.status, AlertStatus::PendingReview);
}

#[tokio::test]
async fn burst_of_transactions_trips_frequency_rule() {
    let mut engine = engine().await;

    for i in 0..3 {
        let result = engine
            .analyze(check(&format!("t{}", i), "c5", 100.0, Some("US")))
            .await;
        assert!(!result.flagged, "transaction {} should be clean", i);
    }

    let result = engine.analyze(check("t-burst", "c5", 100.0, Some("US"))).await;
    assert!(result.flagged);
    assert_eq!(result.flagged_rules[0].id, "rule-002");
    assert_eq!(result.risk, RiskLevel::Medium);
    assert_eq!(result.action, Verdict::Review);

    // Bursts are tracked per customer; a different customer stays clean.
    let other = engine.analyze(check("t-other", "c6", 100.0, Some("US"))).await;
    assert!(!other.flagged);
}

#[tokio::test]
async fn resolve_alert_workflow() {
    let mut engine = engine().await;

    let result = engine.analyze(check("t7", "c7", 1500.0, Some("US"))).await;
    let alert_id = result.alert_id.unwrap();

    let resolved = engine
        .resolve_alert(&alert_id, Resolution::Approve, Some("manual review ok".to_string()))
        .await
        .unwrap();
    assert_eq!(resolved.status, AlertStatus::Approved);
    assert_eq!(resolved.notes.as_deref(), Some("manual review ok"));
    assert!(resolved.resolved_at.is_some());

    // The store reflects the terminal state.
    let stored = engine.get_alert(&alert_id).await.unwrap();
    assert_eq!(stored.status, AlertStatus::Approved);

    // A second resolution is a conflict.
    let again = engine
        .resolve_alert(&alert_id, Resolution::Reject, None)
        .await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn reject_resolution_sets_rejected() {
    let mut engine = engine().await;

    let result = engine.analyze(check("t8", "c8", 500.0, Some("KP"))).await;
    let alert_id = result.alert_id.unwrap();

    let resolved = engine
        .resolve_alert(&alert_id, Resolution::Reject, None)
        .await
        .unwrap();
    assert_eq!(resolved.status, AlertStatus::Rejected);
    assert!(resolved.notes.is_none());
}

#[tokio::test]
async fn resolve_unknown_alert_is_not_found() {
    let engine = engine().await;

    let missing = engine
        .resolve_alert("alert-missing", Resolution::Approve, None)
        .await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn rule_crud_roundtrip() {
    let engine = engine().await;

    let created = engine
        .create_rule(
            "Large Withdrawals".to_string(),
            Some("Block very large withdrawals".to_string()),
            vec![Condition::AmountThreshold {
                op: CompareOp::Gt,
                value: 5000.0,
            }],
            RuleAction::Block,
        )
        .await;
    assert!(created.id.starts_with("rule-"));
    assert_eq!(created.status, RuleStatus::Active);
    assert!(created.updated_at.is_none());

    let fetched = engine.get_rule(&created.id).await.unwrap();
    assert_eq!(fetched.name, "Large Withdrawals");

    let patch = RulePatch {
        name: Some("Very Large Withdrawals".to_string()),
        status: Some(RuleStatus::Inactive),
        ..RulePatch::default()
    };
    let updated = engine.update_rule(&created.id, patch).await.unwrap();
    assert_eq!(updated.name, "Very Large Withdrawals");
    assert_eq!(updated.status, RuleStatus::Inactive);
    assert!(updated.updated_at.is_some());

    let missing = engine.get_rule("rule-missing").await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn created_rule_participates_in_evaluation() {
    let mut engine = engine().await;

    engine
        .create_rule(
            "Very High Amount".to_string(),
            None,
            vec![Condition::AmountThreshold {
                op: CompareOp::Gt,
                value: 5000.0,
            }],
            RuleAction::Block,
        )
        .await;

    let result = engine.analyze(check("t9", "c9", 6000.0, Some("US"))).await;

    assert_eq!(result.flagged_rules.len(), 2);
    assert_eq!(result.risk, RiskLevel::High);
    assert_eq!(result.action, Verdict::Block);

    // The seeded amount rule still comes first in evaluation order, so the
    // alert is attributed to it.
    let alerts = engine.list_alerts().await;
    assert_eq!(alerts[0].rule_id, "rule-001");
    assert_eq!(alerts[0].status, AlertStatus::PendingReview);
}

#[tokio::test]
async fn deactivated_rule_no_longer_flags() {
    let mut engine = engine().await;

    let patch = RulePatch {
        status: Some(RuleStatus::Inactive),
        ..RulePatch::default()
    };
    engine.update_rule("rule-001", patch).await.unwrap();

    let result = engine.analyze(check("t10", "c10", 1500.0, Some("US"))).await;
    assert!(!result.flagged);
    assert!(engine.list_alerts().await.is_empty());
}
