use axum::{extract::State, http::HeaderMap, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::alerts::{self, DeliveryOutcome, Incident};
use crate::middleware::timing::RequestId;
use crate::AppState;

use super::{ApiError, ApiResponse, AppError};

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Debug, Serialize)]
pub struct Notification {
    #[serde(flatten)]
    pub incident: Incident,
    pub alert: DeliveryOutcome,
}

#[derive(Debug, Serialize)]
pub struct AlertCheck {
    pub checked_at: DateTime<Utc>,
    pub incidents: Vec<Incident>,
    pub notifications: Vec<Notification>,
}

// ─── POST /api/system/alerts ─────────────────────────────────────
/// Called by an external scheduler. Compares the current snapshot
/// against the configured thresholds and notifies on every breach.

pub async fn check_alerts(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<AlertCheck>>, ApiError> {
    authorize(&state, &headers).map_err(|e| e.for_request(&request_id))?;

    let runtime = state.metrics.snapshot();
    let incidents = alerts::evaluate(&runtime, &state.config.thresholds);

    let mut notifications = Vec::with_capacity(incidents.len());
    for incident in &incidents {
        let mut enriched = incident.clone();
        enriched.details.extend([
            ("request_id".to_owned(), json!(request_id.as_str())),
            ("generated_at".to_owned(), json!(Utc::now())),
            ("rpm_1m".to_owned(), json!(runtime.rpm_1m)),
            ("requests_5xx".to_owned(), json!(runtime.requests_5xx)),
        ]);

        let alert = state.notifier.send(&enriched).await;
        notifications.push(Notification {
            incident: incident.clone(),
            alert,
        });
    }

    info!(
        request_id = %request_id.as_str(),
        incidents = incidents.len(),
        sent = notifications.iter().filter(|n| n.alert.sent).count(),
        success_rate_percent = runtime.success_rate_percent,
        p95_latency_ms_1m = runtime.p95_latency_ms_1m,
        "ops_alert_check"
    );

    Ok(ApiResponse::ok(
        &request_id,
        AlertCheck {
            checked_at: Utc::now(),
            incidents,
            notifications,
        },
    ))
}

/// The scheduler proves itself with the shared `x-cron-secret` header.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let secret = state
        .config
        .cron_secret
        .as_deref()
        .ok_or(AppError::NotConfigured("CRON_ALERT_SECRET"))?;

    let provided = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if provided != Some(secret) {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
