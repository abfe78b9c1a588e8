pub mod notifier;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::metrics::RuntimeSnapshot;

pub use notifier::{AlertNotifier, DeliveryOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    /// Attachment colour used by the webhook payload.
    pub fn color(self) -> &'static str {
        match self {
            Self::Critical => "#D92D20",
            Self::Warning => "#F79009",
        }
    }
}

/// Limits the alert check compares a snapshot against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min_success_rate_percent: f64,
    pub max_p95_latency_ms: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_success_rate_percent: 99.0,
            max_p95_latency_ms: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    pub severity: Severity,
    pub title: String,
    pub details: Map<String, Value>,
}

impl Incident {
    fn new(severity: Severity, title: &str, details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            severity,
            title: title.to_owned(),
            details,
        }
    }
}

/// Compare a snapshot against `thresholds`. Breaches are strict: a success
/// rate equal to the minimum, or a p95 equal to the maximum, is healthy.
pub fn evaluate(snapshot: &RuntimeSnapshot, thresholds: &Thresholds) -> Vec<Incident> {
    let mut incidents = Vec::new();

    if snapshot.success_rate_percent < thresholds.min_success_rate_percent {
        incidents.push(Incident::new(
            Severity::Critical,
            "API Success Rate Breach",
            json!({
                "threshold_percent": thresholds.min_success_rate_percent,
                "actual_percent": snapshot.success_rate_percent,
            }),
        ));
    }

    if snapshot.p95_latency_ms_1m > thresholds.max_p95_latency_ms {
        incidents.push(Incident::new(
            Severity::Warning,
            "API Latency Breach",
            json!({
                "threshold_ms": thresholds.max_p95_latency_ms,
                "actual_p95_ms": snapshot.p95_latency_ms_1m,
            }),
        ));
    }

    incidents
}
