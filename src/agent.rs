use crate::alert::Alert;
use crate::evaluator::{RiskLevel, Verdict};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

/// Payload handed to notifiers when an evaluation creates an alert.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub alert: Alert,
    pub risk: RiskLevel,
    pub verdict: Verdict,
}

/// Downstream sink for newly created alerts. Dispatch is best-effort: a
/// failing notifier is logged and counted, never surfaced to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()>;
}

/// Emits a structured tracing event per alert.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()> {
        info!(
            notifier = self.name(),
            alert_id = %event.alert.id,
            transaction_id = %event.alert.transaction_id,
            rule_id = %event.alert.rule_id,
            rule_name = %event.alert.rule_name,
            risk = ?event.risk,
            verdict = ?event.verdict,
            "Fraud alert raised"
        );
        Ok(())
    }
}

/// POSTs the alert event as JSON to a configured URL.
pub struct WebhookNotifier {
    pub url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { url, client }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "alertId": event.alert.id,
            "transactionId": event.alert.transaction_id,
            "customerId": event.alert.customer_id,
            "ruleId": event.alert.rule_id,
            "ruleName": event.alert.rule_name,
            "amount": event.alert.amount,
            "country": event.alert.country,
            "status": event.alert.status,
            "risk": event.risk,
            "action": event.verdict,
            "timestamp": event.alert.created_at.to_rfc3339(),
        });

        debug!(url = %self.url, alert_id = %event.alert.id, "Sending alert webhook");
        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
