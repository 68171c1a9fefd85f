//! Fraud rule-evaluation engine: a configurable rule set swept over incoming
//! transaction descriptors, an append-only alert log with a review workflow,
//! and best-effort notifier dispatch on every new alert.

pub mod agent;
pub mod alert;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod rule;
pub mod server;
pub mod state;
pub mod window;

use crate::agent::{AlertEvent, LogNotifier, Notifier, WebhookNotifier};
use crate::alert::{Alert, Resolution};
use crate::config::FraudWatchConfig;
use crate::error::{ServiceError, ALERT_NOT_FOUND, RULE_NOT_FOUND};
use crate::evaluator::{Evaluation, TransactionCheck};
use crate::rule::{Condition, Rule, RuleAction, RulePatch, RuleStatus};
use crate::state::{AlertStore, InMemoryAlertStore, InMemoryRuleStore, RuleStore};
use crate::window::ActivityWindow;
use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct FraudEngine {
    rules: Box<dyn RuleStore>,
    alerts: Box<dyn AlertStore>,
    notifiers: HashMap<String, Arc<dyn Notifier>>,
    activity: HashMap<String, ActivityWindow>,
    activity_retention: Duration,
}

impl FraudEngine {
    pub fn new(rules: Box<dyn RuleStore>, alerts: Box<dyn AlertStore>) -> Self {
        Self {
            rules,
            alerts,
            notifiers: HashMap::new(),
            activity: HashMap::new(),
            activity_retention: Duration::from_secs(3600),
        }
    }

    pub async fn from_config(config: FraudWatchConfig) -> Result<Self> {
        let rules: Vec<Rule> = config
            .rules
            .iter()
            .map(|r_cfg| Rule {
                id: r_cfg.id.clone(),
                name: r_cfg.name.clone(),
                description: r_cfg.description.clone(),
                status: r_cfg.status,
                conditions: r_cfg.conditions.clone(),
                action: r_cfg.action,
                created_at: Utc::now(),
                updated_at: None,
            })
            .collect();

        let mut engine = Self::new(
            Box::new(InMemoryRuleStore::with_rules(rules)),
            Box::new(InMemoryAlertStore::new()),
        );
        engine.activity_retention =
            Duration::from_secs(config.engine.activity_retention_seconds);

        for n_cfg in config.notifiers {
            match n_cfg.r#type.as_str() {
                "log" => {
                    engine.add_notifier(n_cfg.name, Arc::new(LogNotifier));
                }
                "webhook" => {
                    if let Some(url) = n_cfg.url {
                        engine.add_notifier(n_cfg.name, Arc::new(WebhookNotifier::new(url)));
                    } else {
                        warn!(notifier = %n_cfg.name, "Webhook notifier has no url, skipping");
                    }
                }
                other => warn!("Unknown notifier type '{}'", other),
            }
        }

        Ok(engine)
    }

    /// Replace the rule set and notifiers from a freshly loaded config.
    /// The alert log and per-customer activity survive the reload.
    pub async fn reload_from_config(&mut self, config: FraudWatchConfig) -> Result<()> {
        info!("Reloading engine configuration...");

        let mut new_notifiers: HashMap<String, Arc<dyn Notifier>> = HashMap::new();
        for n_cfg in config.notifiers {
            match n_cfg.r#type.as_str() {
                "log" => {
                    new_notifiers.insert(n_cfg.name, Arc::new(LogNotifier));
                }
                "webhook" => {
                    if let Some(url) = n_cfg.url {
                        new_notifiers.insert(n_cfg.name, Arc::new(WebhookNotifier::new(url)));
                    }
                }
                other => warn!("Unknown notifier type '{}' during reload", other),
            }
        }
        self.notifiers = new_notifiers;

        let rules: Vec<Rule> = config
            .rules
            .iter()
            .map(|r_cfg| Rule {
                id: r_cfg.id.clone(),
                name: r_cfg.name.clone(),
                description: r_cfg.description.clone(),
                status: r_cfg.status,
                conditions: r_cfg.conditions.clone(),
                action: r_cfg.action,
                created_at: Utc::now(),
                updated_at: None,
            })
            .collect();
        let rule_count = rules.len();
        self.rules = Box::new(InMemoryRuleStore::with_rules(rules));
        self.activity_retention =
            Duration::from_secs(config.engine.activity_retention_seconds);

        info!(
            "Engine reloaded: {} rules, {} notifiers",
            rule_count,
            self.notifiers.len()
        );
        Ok(())
    }

    pub fn add_notifier(&mut self, name: String, notifier: Arc<dyn Notifier>) {
        self.notifiers.insert(name, notifier);
    }

    pub async fn list_rules(&self) -> Vec<Rule> {
        self.rules.list().await
    }

    pub async fn get_rule(&self, id: &str) -> Result<Rule, ServiceError> {
        self.rules
            .get(id)
            .await
            .ok_or(ServiceError::NotFound(RULE_NOT_FOUND))
    }

    pub async fn create_rule(
        &self,
        name: String,
        description: Option<String>,
        conditions: Vec<Condition>,
        action: RuleAction,
    ) -> Rule {
        let rule = Rule::new(name, description, conditions, action);
        info!(rule_id = %rule.id, rule_name = %rule.name, "Fraud rule created");
        self.rules.insert(rule.clone()).await;
        rule
    }

    pub async fn update_rule(&self, id: &str, patch: RulePatch) -> Result<Rule, ServiceError> {
        let updated = self
            .rules
            .update(id, patch)
            .await
            .ok_or(ServiceError::NotFound(RULE_NOT_FOUND))?;
        info!(rule_id = %updated.id, "Fraud rule updated");
        Ok(updated)
    }

    pub async fn list_alerts(&self) -> Vec<Alert> {
        self.alerts.list().await
    }

    pub async fn get_alert(&self, id: &str) -> Result<Alert, ServiceError> {
        self.alerts
            .get(id)
            .await
            .ok_or(ServiceError::NotFound(ALERT_NOT_FOUND))
    }

    /// Evaluate one transaction against the active rule set. Pure except for
    /// two effects: the transaction instant is recorded into its customer's
    /// activity window, and a flagged evaluation appends exactly one alert
    /// (attributed to the first matching rule) and fans out to notifiers.
    pub async fn analyze(&mut self, check: TransactionCheck) -> Evaluation {
        let started = Instant::now();
        let retention = self.activity_retention;
        let window = self
            .activity
            .entry(check.customer_id.clone())
            .or_insert_with(|| ActivityWindow::new(retention));
        window.record(started);

        let rules = self.rules.list().await;
        let flagged = evaluator::run_checks(&rules, &check, &*window, started);

        let risk = evaluator::risk_level(&flagged);
        let action = evaluator::verdict(&flagged);
        let timestamp = Utc::now();

        metrics::METRICS.checks_processed.fetch_add(1, Ordering::Relaxed);
        for rule in &flagged {
            metrics::METRICS.record_rule_match(&rule.id);
        }

        let mut evaluation = Evaluation {
            transaction_id: check.transaction_id.clone(),
            customer_id: check.customer_id.clone(),
            amount: check.amount,
            country: check.country.clone(),
            flagged: !flagged.is_empty(),
            risk,
            action,
            flagged_rules: flagged,
            alert_id: None,
            timestamp,
        };

        let primary = evaluation.flagged_rules.first().cloned();
        if let Some(primary) = primary {
            let alert =
                Alert::from_check(&check, &primary.id, &primary.name, primary.action, timestamp);
            info!(
                alert_id = %alert.id,
                transaction_id = %check.transaction_id,
                rule_id = %primary.id,
                risk = ?risk,
                action = ?action,
                "Transaction flagged"
            );
            metrics::METRICS.checks_flagged.fetch_add(1, Ordering::Relaxed);
            metrics::METRICS.alerts_created.fetch_add(1, Ordering::Relaxed);

            self.alerts.save(alert.clone()).await;
            evaluation.alert_id = Some(alert.id.clone());

            let event = AlertEvent {
                alert,
                risk,
                verdict: action,
            };
            for (name, notifier) in &self.notifiers {
                match notifier.notify(&event).await {
                    Ok(()) => {
                        debug!(notifier = %name, alert_id = %event.alert.id, "Notifier dispatched");
                    }
                    Err(e) => {
                        error!(notifier = %name, error = %e, "Notifier dispatch failed");
                        metrics::METRICS.notifier_failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        } else {
            debug!(
                transaction_id = %check.transaction_id,
                amount = check.amount,
                "Transaction clean"
            );
        }

        metrics::METRICS.record_evaluation_duration(started.elapsed().as_secs_f64());
        evaluation
    }

    /// Move a pending alert to its terminal state. Resolving an alert twice
    /// is a conflict.
    pub async fn resolve_alert(
        &self,
        id: &str,
        resolution: Resolution,
        notes: Option<String>,
    ) -> Result<Alert, ServiceError> {
        let mut alert = self
            .alerts
            .get(id)
            .await
            .ok_or(ServiceError::NotFound(ALERT_NOT_FOUND))?;

        if alert.status.is_terminal() {
            return Err(ServiceError::Conflict(
                "Fraud alert already resolved".to_string(),
            ));
        }

        alert.status = resolution.terminal_status();
        alert.notes = notes;
        alert.resolved_at = Some(Utc::now());
        self.alerts.save(alert.clone()).await;

        metrics::METRICS.alerts_resolved.fetch_add(1, Ordering::Relaxed);
        info!(alert_id = %alert.id, status = ?alert.status, "Fraud alert resolved");
        Ok(alert)
    }

    /// Active rule count, for the health endpoint.
    pub async fn rule_counts(&self) -> (usize, usize) {
        let rules = self.rules.list().await;
        let active = rules
            .iter()
            .filter(|r| r.status == RuleStatus::Active)
            .count();
        (rules.len(), active)
    }
}
