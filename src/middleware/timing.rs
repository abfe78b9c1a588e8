use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics::Sample;
use crate::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id for one request, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Response-finalization middleware. For every request, including 404s
/// and error responses:
///
///   - records exactly one sample into the runtime metrics
///   - echoes / assigns `x-request-id`
///   - adds `X-Response-Time-Ms` and `Server-Timing` headers
///   - emits one `api_response` log event
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let start = Instant::now();
    let mut response = next.run(req).await;
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    let status = response.status().as_u16();
    state.metrics.record(Sample::new(
        method.as_str(),
        path.as_str(),
        i32::from(status),
        duration_ms,
    ));

    // ── Inject response headers ─────────────────────────────────
    let headers = response.headers_mut();
    if let Ok(val) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, val);
    }
    if let Ok(val) = HeaderValue::from_str(&format!("{duration_ms:.3}")) {
        headers.insert("x-response-time-ms", val);
    }
    if let Ok(val) = HeaderValue::from_str(&format!("total;dur={duration_ms:.3}")) {
        headers.insert("server-timing", val);
    }

    // ── Structured log ──────────────────────────────────────────
    let duration_ms = duration_ms.round() as u64;
    match status {
        500.. => error!(
            request_id = %request_id, method = %method, path = %path, status, duration_ms,
            "api_response"
        ),
        400..=499 => warn!(
            request_id = %request_id, method = %method, path = %path, status, duration_ms,
            "api_response"
        ),
        _ => info!(
            request_id = %request_id, method = %method, path = %path, status, duration_ms,
            "api_response"
        ),
    }

    response
}
