pub mod collector;
pub mod percentiles;
pub mod stream;

pub use collector::{RuntimeMetrics, RuntimeSnapshot, DEFAULT_MAX_SAMPLES};

/// A single completed-request observation.
/// This is the "write" side — the timing middleware builds one per request.
#[derive(Debug, Clone)]
pub struct Sample {
    /// HTTP verb, e.g. "GET"
    pub method: String,
    /// Literal request path, e.g. "/api/orders"
    pub path: String,
    /// Response status. Only the >= 500 / >= 400 thresholds matter.
    pub status: i32,
    /// Response latency; clamped to >= 0 and rounded when recorded
    pub duration_ms: f64,
}

impl Sample {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status: i32,
        duration_ms: f64,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status,
            duration_ms,
        }
    }
}
