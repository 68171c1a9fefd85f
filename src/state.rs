use crate::alert::Alert;
use crate::rule::{Rule, RulePatch};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Storage seam for the rule set. The in-memory implementation backs tests
/// and the default deployment; a persistent implementation would slot in
/// behind the same trait.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All rules in insertion order. Insertion order is evaluation order.
    async fn list(&self) -> Vec<Rule>;
    async fn get(&self, id: &str) -> Option<Rule>;
    async fn insert(&self, rule: Rule);
    /// Shallow-merge `patch` onto the rule, stamping `updated_at`.
    async fn update(&self, id: &str, patch: RulePatch) -> Option<Rule>;
}

/// Storage seam for the alert log.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list(&self) -> Vec<Alert>;
    async fn get(&self, id: &str) -> Option<Alert>;
    /// Upsert by id, preserving the original position of existing entries.
    async fn save(&self, alert: Alert);
}

#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    inner: Mutex<Vec<Rule>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            inner: Mutex::new(rules),
        }
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn list(&self) -> Vec<Rule> {
        self.inner.lock().await.clone()
    }

    async fn get(&self, id: &str) -> Option<Rule> {
        self.inner.lock().await.iter().find(|r| r.id == id).cloned()
    }

    async fn insert(&self, rule: Rule) {
        self.inner.lock().await.push(rule);
    }

    async fn update(&self, id: &str, patch: RulePatch) -> Option<Rule> {
        let mut rules = self.inner.lock().await;
        let rule = rules.iter_mut().find(|r| r.id == id)?;
        rule.apply(patch);
        Some(rule.clone())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    inner: Mutex<Vec<Alert>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn list(&self) -> Vec<Alert> {
        self.inner.lock().await.clone()
    }

    async fn get(&self, id: &str) -> Option<Alert> {
        self.inner.lock().await.iter().find(|a| a.id == id).cloned()
    }

    async fn save(&self, alert: Alert) {
        let mut alerts = self.inner.lock().await;
        match alerts.iter_mut().find(|a| a.id == alert.id) {
            Some(existing) => *existing = alert,
            None => alerts.push(alert),
        }
    }
}
