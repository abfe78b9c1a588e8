use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};

use super::collector::RuntimeSnapshot;
use crate::handlers::ApiResponse;
use crate::middleware::timing::RequestId;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub runtime: RuntimeSnapshot,
    pub uptime_seconds: u64,
    pub generated_at: DateTime<Utc>,
}

// ─── GET /api/system/metrics ─────────────────────────────────────
/// Returns a single JSON snapshot for operators and the monitor page.

pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> Json<ApiResponse<SystemMetrics>> {
    ApiResponse::ok(
        &request_id,
        SystemMetrics {
            runtime: state.metrics.snapshot(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
            generated_at: Utc::now(),
        },
    )
}

// ─── GET /api/system/metrics/stream ──────────────────────────────
/// Live feed for the monitor page: one `metrics` event carrying a bare
/// `RuntimeSnapshot` per configured tick. Ticks missed under load are
/// skipped rather than burst.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut ticker = tokio::time::interval(state.config.stream_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let events = IntervalStream::new(ticker)
        .map(move |_| snapshot_event(&state.metrics.snapshot()));

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn snapshot_event(snapshot: &RuntimeSnapshot) -> Result<Event, axum::Error> {
    Event::default().event("metrics").json_data(snapshot)
}
