use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::percentiles::LatencyPercentiles;
use super::Sample;

// ─── Configuration ───────────────────────────────────────────────

/// Ring-buffer capacity used when nothing else is configured
pub const DEFAULT_MAX_SAMPLES: usize = 1000;

/// Trailing window for rate / latency / top-endpoint statistics
const WINDOW_MS: i64 = 60_000;

/// How many routes `top_endpoints_1m` reports
const TOP_ENDPOINTS: usize = 5;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe runtime metrics aggregator.
/// The timing middleware calls `record()`, the system endpoints call `snapshot()`.
pub struct RuntimeMetrics {
    max_samples: usize,
    inner: Mutex<Inner>,
}

/// One buffered request observation.
#[derive(Debug, Clone, Serialize)]
pub struct SampleRecord {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub duration_ms: u64,
}

/// Request count for one `"METHOD /path"` label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointCount {
    pub route: String,
    pub count: u64,
}

/// Point-in-time view served by the metrics endpoint and the alert check.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeSnapshot {
    // Lifetime counters
    pub requests_total: u64,
    pub requests_2xx: u64,
    pub requests_4xx: u64,
    pub requests_5xx: u64,
    pub success_rate_percent: f64,

    // Trailing one-minute window
    pub rpm_1m: u64,
    pub p50_latency_ms_1m: u64,
    pub p95_latency_ms_1m: u64,
    pub p99_latency_ms_1m: u64,
    pub top_endpoints_1m: Vec<EndpointCount>,
}

// ─── Internal state ──────────────────────────────────────────────

/// Lifetime totals. `total` always equals the sum of the three buckets.
#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    total: u64,
    success_2xx: u64,
    client_4xx: u64,
    server_5xx: u64,
}

impl Counters {
    fn bump(&mut self, status: i32) {
        self.total += 1;
        if status >= 500 {
            self.server_5xx += 1;
        } else if status >= 400 {
            self.client_4xx += 1;
        } else {
            self.success_2xx += 1;
        }
    }

    /// 100 when nothing has been recorded, else rounded to 2 decimals.
    fn success_rate_percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        let pct = self.success_2xx as f64 / self.total as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }
}

#[derive(Default)]
struct Inner {
    counters: Counters,
    samples: VecDeque<SampleRecord>,
}

// ─── RuntimeMetrics impl ─────────────────────────────────────────

impl RuntimeMetrics {
    /// `max_samples` bounds the ring buffer; values below 1 are raised to 1.
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            max_samples,
            inner: Mutex::new(Inner {
                counters: Counters::default(),
                samples: VecDeque::with_capacity(max_samples + 1),
            }),
        }
    }

    /// Record one completed request, stamped with the current time.
    pub fn record(&self, sample: Sample) {
        self.record_at(sample, Utc::now());
    }

    /// Record one completed request with an explicit timestamp.
    pub fn record_at(&self, sample: Sample, at: DateTime<Utc>) {
        let record = SampleRecord {
            timestamp: at,
            duration_ms: normalize_duration(sample.duration_ms),
            status: sample.status,
            method: sample.method,
            path: sample.path,
        };

        let mut inner = self.inner.lock();
        inner.counters.bump(record.status);
        inner.samples.push_back(record);
        if inner.samples.len() > self.max_samples {
            inner.samples.pop_front();
        }
    }

    /// Zero the counters and drop every buffered sample. Test isolation only.
    #[cfg(test)]
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.counters = Counters::default();
        inner.samples.clear();
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        self.snapshot_at(Utc::now())
    }

    /// Build a snapshot as seen from `now`.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> RuntimeSnapshot {
        let cutoff = now - TimeDelta::milliseconds(WINDOW_MS);

        // Copy what the window needs, then compute without holding the lock
        let (counters, mut durations, per_route) = {
            let inner = self.inner.lock();
            let mut durations = Vec::with_capacity(inner.samples.len());
            let mut per_route: BTreeMap<String, u64> = BTreeMap::new();

            for sample in inner.samples.iter().filter(|s| s.timestamp >= cutoff) {
                durations.push(sample.duration_ms);
                *per_route
                    .entry(format!("{} {}", sample.method, sample.path))
                    .or_insert(0) += 1;
            }

            (inner.counters, durations, per_route)
        };

        durations.sort_unstable();
        let latency = LatencyPercentiles::from_sorted(&durations);

        RuntimeSnapshot {
            requests_total: counters.total,
            requests_2xx: counters.success_2xx,
            requests_4xx: counters.client_4xx,
            requests_5xx: counters.server_5xx,
            success_rate_percent: counters.success_rate_percent(),

            rpm_1m: durations.len() as u64,
            p50_latency_ms_1m: latency.p50,
            p95_latency_ms_1m: latency.p95,
            p99_latency_ms_1m: latency.p99,
            top_endpoints_1m: top_endpoints(per_route),
        }
    }
}

impl Default for RuntimeMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES)
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

/// Negative and NaN durations become 0; everything else rounds to the
/// nearest millisecond.
fn normalize_duration(duration_ms: f64) -> u64 {
    duration_ms.max(0.0).round() as u64
}

/// Descending by count. `per_route` iterates in label order and the sort is
/// stable, so equal counts stay lexicographic.
fn top_endpoints(per_route: BTreeMap<String, u64>) -> Vec<EndpointCount> {
    let mut ranked: Vec<EndpointCount> = per_route
        .into_iter()
        .map(|(route, count)| EndpointCount { route, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_ENDPOINTS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(method: &str, path: &str, status: i32, duration_ms: f64) -> Sample {
        Sample::new(method, path, status, duration_ms)
    }

    fn assert_partition(snap: &RuntimeSnapshot) {
        assert_eq!(
            snap.requests_total,
            snap.requests_2xx + snap.requests_4xx + snap.requests_5xx
        );
    }

    #[test]
    fn tracks_totals_and_status_buckets() {
        let metrics = RuntimeMetrics::default();
        metrics.record(sample("GET", "/api/test", 200, 12.0));
        metrics.record(sample("POST", "/api/test", 404, 5.0));
        metrics.record(sample("POST", "/api/test", 500, 20.0));

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_total, 3);
        assert_eq!(snap.requests_2xx, 1);
        assert_eq!(snap.requests_4xx, 1);
        assert_eq!(snap.requests_5xx, 1);
        assert!((snap.success_rate_percent - 33.33).abs() < 0.005);
    }

    #[test]
    fn status_classification_boundaries() {
        let metrics = RuntimeMetrics::default();
        let cases = [
            (200, (1, 0, 0)),
            (399, (2, 0, 0)),
            (400, (2, 1, 0)),
            (404, (2, 2, 0)),
            (499, (2, 3, 0)),
            (500, (2, 3, 1)),
            (599, (2, 3, 2)),
            (1000, (2, 3, 3)),
            (-1, (3, 3, 3)),
        ];

        for (status, (ok, client, server)) in cases {
            metrics.record(sample("GET", "/api/orders", status, 1.0));
            let snap = metrics.snapshot();
            assert_eq!(
                (snap.requests_2xx, snap.requests_4xx, snap.requests_5xx),
                (ok, client, server),
                "after recording status {status}"
            );
            assert_partition(&snap);
        }
    }

    #[test]
    fn empty_state_defaults() {
        let metrics = RuntimeMetrics::default();
        metrics.record(sample("GET", "/api/orders", 500, 30.0));
        metrics.reset();

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_total, 0);
        assert_eq!(snap.success_rate_percent, 100.0);
        assert_eq!(snap.rpm_1m, 0);
        assert_eq!(snap.p50_latency_ms_1m, 0);
        assert_eq!(snap.p95_latency_ms_1m, 0);
        assert_eq!(snap.p99_latency_ms_1m, 0);
        assert!(snap.top_endpoints_1m.is_empty());
    }

    #[test]
    fn reports_top_endpoints_and_latency_percentiles() {
        let metrics = RuntimeMetrics::default();
        metrics.record(sample("GET", "/api/a", 200, 10.0));
        metrics.record(sample("GET", "/api/a", 200, 50.0));
        metrics.record(sample("GET", "/api/b", 200, 100.0));

        let snap = metrics.snapshot();
        assert_eq!(snap.rpm_1m, 3);
        assert_eq!(snap.p50_latency_ms_1m, 50);
        assert_eq!(snap.p95_latency_ms_1m, 100);
        assert_eq!(
            snap.top_endpoints_1m[0],
            EndpointCount {
                route: "GET /api/a".into(),
                count: 2
            }
        );
    }

    #[test]
    fn top_endpoints_cap_and_lexicographic_ties() {
        let metrics = RuntimeMetrics::default();
        for path in ["/f", "/e", "/d", "/c", "/b", "/a"] {
            metrics.record(sample("GET", path, 200, 1.0));
        }
        metrics.record(sample("POST", "/z", 200, 1.0));
        metrics.record(sample("POST", "/z", 200, 1.0));

        let routes: Vec<String> = metrics
            .snapshot()
            .top_endpoints_1m
            .into_iter()
            .map(|e| e.route)
            .collect();
        assert_eq!(
            routes,
            ["POST /z", "GET /a", "GET /b", "GET /c", "GET /d"]
        );
    }

    #[test]
    fn durations_are_clamped_and_rounded() {
        let metrics = RuntimeMetrics::default();
        metrics.record(sample("GET", "/x", 200, -25.0));
        metrics.record(sample("GET", "/x", 200, f64::NAN));
        metrics.record(sample("GET", "/x", 200, 7.5));

        let inner = metrics.inner.lock();
        let durations: Vec<u64> = inner.samples.iter().map(|s| s.duration_ms).collect();
        assert_eq!(durations, [0, 0, 8]);
    }

    #[test]
    fn samples_outside_window_only_count_toward_lifetime() {
        let metrics = RuntimeMetrics::default();
        let now = Utc::now();

        metrics.record_at(
            sample("GET", "/api/old", 200, 900.0),
            now - TimeDelta::milliseconds(60_001),
        );
        metrics.record_at(
            sample("GET", "/api/edge", 200, 20.0),
            now - TimeDelta::milliseconds(60_000),
        );
        metrics.record_at(sample("GET", "/api/new", 200, 10.0), now);

        let snap = metrics.snapshot_at(now);
        assert_eq!(snap.requests_total, 3);
        assert_eq!(snap.rpm_1m, 2);
        assert_eq!(snap.p99_latency_ms_1m, 20);
        assert!(snap
            .top_endpoints_1m
            .iter()
            .all(|e| e.route != "GET /api/old"));
    }

    #[test]
    fn ring_buffer_evicts_oldest_first() {
        let metrics = RuntimeMetrics::new(3);
        for i in 0..5 {
            metrics.record(sample("GET", &format!("/p{i}"), 200, 1.0));
        }

        let inner = metrics.inner.lock();
        let paths: Vec<&str> = inner.samples.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, ["/p2", "/p3", "/p4"]);
        assert_eq!(inner.counters.total, 5);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let metrics = RuntimeMetrics::new(0);
        metrics.record(sample("GET", "/a", 200, 1.0));
        metrics.record(sample("GET", "/b", 200, 1.0));
        assert_eq!(metrics.snapshot().rpm_1m, 1);
    }

    #[test]
    fn concurrent_records_keep_counters_consistent() {
        let metrics = std::sync::Arc::new(RuntimeMetrics::new(100));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let status = [200, 404, 503][(t + i) % 3];
                        metrics.record(sample("GET", "/api/orders", status, 3.0));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_total, 2000);
        assert_partition(&snap);
        assert_eq!(metrics.inner.lock().samples.len(), 100);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let metrics = RuntimeMetrics::default();
        metrics.record(sample("GET", "/api/menu/items", 200, 4.0));

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        for key in [
            "requests_total",
            "requests_2xx",
            "requests_4xx",
            "requests_5xx",
            "success_rate_percent",
            "rpm_1m",
            "p50_latency_ms_1m",
            "p95_latency_ms_1m",
            "p99_latency_ms_1m",
            "top_endpoints_1m",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["top_endpoints_1m"][0]["route"], "GET /api/menu/items");
        assert_eq!(json["top_endpoints_1m"][0]["count"], 1);
    }
}
