use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// Latency histogram with the standard Prometheus buckets.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<(f64, AtomicU64)>, // (upper_bound, count)
}

impl Histogram {
    fn new() -> Self {
        let bounds = vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
        Self {
            buckets: bounds.into_iter().map(|b| (b, AtomicU64::new(0))).collect(),
        }
    }

    fn record(&self, value: f64) {
        for (bound, count) in &self.buckets {
            if value <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        if let Some((_, count)) = self.buckets.last() {
            count.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .map(|(bound, count)| (*bound, count.load(Ordering::Relaxed)))
            .collect()
    }

    fn to_prometheus(&self, name: &str) -> String {
        let snapshot = self.snapshot();
        let total: u64 = snapshot.iter().map(|(_, c)| c).sum();
        let mut output = format!("# HELP {}_seconds Duration histogram.\n", name);
        output.push_str(&format!("# TYPE {}_seconds histogram\n", name));
        for (bound, count) in snapshot {
            output.push_str(&format!("{}{{le=\"{}\"}} {}\n", name, bound, count));
        }
        output.push_str(&format!("{}{{le=\"+Inf\"}} {}\n", name, total));
        output
    }
}

pub struct SystemMetrics {
    pub checks_processed: AtomicU64,
    pub checks_flagged: AtomicU64,
    pub alerts_created: AtomicU64,
    pub alerts_resolved: AtomicU64,
    pub notifier_failures: AtomicU64,
    pub rule_matches: Mutex<HashMap<String, AtomicU64>>,
    pub evaluation_duration: Histogram,
}

impl SystemMetrics {
    pub fn new() -> Self {
        Self {
            checks_processed: AtomicU64::new(0),
            checks_flagged: AtomicU64::new(0),
            alerts_created: AtomicU64::new(0),
            alerts_resolved: AtomicU64::new(0),
            notifier_failures: AtomicU64::new(0),
            rule_matches: Mutex::new(HashMap::new()),
            evaluation_duration: Histogram::new(),
        }
    }

    pub fn record_evaluation_duration(&self, duration_secs: f64) {
        self.evaluation_duration.record(duration_secs);
    }

    pub fn record_rule_match(&self, rule_id: &str) {
        let mut map = self.rule_matches.lock().unwrap();
        map.entry(rule_id.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let rule_matches: HashMap<String, u64> = self
            .rule_matches
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            checks_processed: self.checks_processed.load(Ordering::Relaxed),
            checks_flagged: self.checks_flagged.load(Ordering::Relaxed),
            alerts_created: self.alerts_created.load(Ordering::Relaxed),
            alerts_resolved: self.alerts_resolved.load(Ordering::Relaxed),
            notifier_failures: self.notifier_failures.load(Ordering::Relaxed),
            rule_matches,
        }
    }

    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = format!(
            "# HELP fraudwatch_checks_processed_total Total transactions analyzed.\n\
             # TYPE fraudwatch_checks_processed_total counter\n\
             fraudwatch_checks_processed_total {}\n\
             # HELP fraudwatch_checks_flagged_total Total analyzed transactions that matched a rule.\n\
             # TYPE fraudwatch_checks_flagged_total counter\n\
             fraudwatch_checks_flagged_total {}\n\
             # HELP fraudwatch_alerts_created_total Total fraud alerts created.\n\
             # TYPE fraudwatch_alerts_created_total counter\n\
             fraudwatch_alerts_created_total {}\n\
             # HELP fraudwatch_alerts_resolved_total Total fraud alerts resolved.\n\
             # TYPE fraudwatch_alerts_resolved_total counter\n\
             fraudwatch_alerts_resolved_total {}\n\
             # HELP fraudwatch_notifier_failures_total Total failed notifier dispatches.\n\
             # TYPE fraudwatch_notifier_failures_total counter\n\
             fraudwatch_notifier_failures_total {}\n",
            snapshot.checks_processed,
            snapshot.checks_flagged,
            snapshot.alerts_created,
            snapshot.alerts_resolved,
            snapshot.notifier_failures
        );

        output.push_str("# HELP fraudwatch_rule_matches_total Total matches per rule.\n");
        output.push_str("# TYPE fraudwatch_rule_matches_total counter\n");
        for (rule_id, count) in &snapshot.rule_matches {
            output.push_str(&format!(
                "fraudwatch_rule_matches_total{{rule_id=\"{}\"}} {}\n",
                rule_id, count
            ));
        }

        output.push_str(
            &self
                .evaluation_duration
                .to_prometheus("fraudwatch_evaluation_duration"),
        );

        output
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct MetricsSnapshot {
    pub checks_processed: u64,
    pub checks_flagged: u64,
    pub alerts_created: u64,
    pub alerts_resolved: u64,
    pub notifier_failures: u64,
    pub rule_matches: HashMap<String, u64>,
}

lazy_static::lazy_static! {
    pub static ref METRICS: SystemMetrics = SystemMetrics::new();
}
