use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::middleware::timing::RequestId;
use crate::AppState;

use super::ApiResponse;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub app_version: &'static str,
    pub timestamp: DateTime<Utc>,
}

// ─── GET /api/system/health ──────────────────────────────────────

pub async fn health(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> Json<ApiResponse<Health>> {
    ApiResponse::ok(
        &request_id,
        Health {
            status: "ok",
            uptime_seconds: state.started_at.elapsed().as_secs(),
            app_version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
        },
    )
}
