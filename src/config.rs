use crate::rule::{CompareOp, Condition, RuleAction, RuleStatus};
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct FraudWatchConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub notifiers: Vec<NotifierConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// How long per-customer activity is retained for frequency checks.
    #[serde(default = "default_activity_retention")]
    pub activity_retention_seconds: u64,
    /// Requests per second allowed on /api/analyze; unset means unlimited.
    #[serde(default)]
    pub analyze_rate_limit: Option<u32>,
}

fn default_activity_retention() -> u64 {
    3600
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            activity_retention_seconds: default_activity_retention(),
            analyze_rate_limit: None,
        }
    }
}

/// Seed rule as it appears in the config file. Unlike rules created over the
/// API these carry fixed ids, so operators can reference them in tooling.
#[derive(Debug, Deserialize, Clone)]
pub struct RuleConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RuleStatus,
    pub conditions: Vec<Condition>,
    pub action: RuleAction,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    pub name: String,
    pub r#type: String, // "log", "webhook"
    #[serde(default)]
    pub url: Option<String>,
}

impl FraudWatchConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        let config: FraudWatchConfig = settings.try_deserialize()?;
        Ok(config)
    }

    /// The stock rule set: high-amount review, burst-frequency review, and
    /// the country allow-list block.
    pub fn default_rules() -> Vec<RuleConfig> {
        vec![
            RuleConfig {
                id: "rule-001".to_string(),
                name: "High Amount Transactions".to_string(),
                description: Some("Flag transactions over $1,000".to_string()),
                status: RuleStatus::Active,
                conditions: vec![Condition::AmountThreshold {
                    op: CompareOp::Gt,
                    value: 1000.0,
                }],
                action: RuleAction::Review,
            },
            RuleConfig {
                id: "rule-002".to_string(),
                name: "Multiple Transactions".to_string(),
                description: Some(
                    "Flag multiple transactions from the same customer in a short time"
                        .to_string(),
                ),
                status: RuleStatus::Active,
                conditions: vec![Condition::FrequencyWindow {
                    op: CompareOp::Gt,
                    count: 3,
                    window_seconds: 300,
                }],
                action: RuleAction::Review,
            },
            RuleConfig {
                id: "rule-003".to_string(),
                name: "Unusual Location".to_string(),
                description: Some("Flag transactions from unexpected countries".to_string()),
                status: RuleStatus::Active,
                conditions: vec![Condition::LocationAllowlist {
                    countries: vec![
                        "US".to_string(),
                        "CA".to_string(),
                        "UK".to_string(),
                        "EU".to_string(),
                    ],
                }],
                action: RuleAction::Block,
            },
        ]
    }
}

impl Default for FraudWatchConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            rules: Self::default_rules(),
            notifiers: vec![NotifierConfig {
                name: "log".to_string(),
                r#type: "log".to_string(),
                url: None,
            }],
        }
    }
}
