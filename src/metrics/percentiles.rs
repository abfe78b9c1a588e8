use serde::Serialize;

/// Nearest-rank quantile over an ascending slice.
///
/// Picks `sorted[ceil(len * q) - 1]`, clamped into bounds. Never
/// interpolates between neighbours, so the result is always an observed
/// value. Returns 0 for an empty slice.
pub fn nearest_rank(sorted: &[u64], q: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }

    // Negative ranks saturate to 0 on the cast
    let rank = (sorted.len() as f64 * q).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

/// Latency breakdown for the trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencyPercentiles {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

impl LatencyPercentiles {
    /// `sorted` must already be ascending. All zero when empty.
    pub fn from_sorted(sorted: &[u64]) -> Self {
        Self {
            p50: nearest_rank(sorted, 0.50),
            p95: nearest_rank(sorted, 0.95),
            p99: nearest_rank(sorted, 0.99),
        }
    }
}
