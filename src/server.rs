use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Health / metrics ────────────────────────────────────
        .route("/api/system/health", get(handlers::health::health))
        .route("/api/system/metrics", get(stream::get_metrics))
        .route("/api/system/metrics/stream", get(stream::metrics_stream))
        // ── Alert check (external scheduler) ────────────────────
        .route("/api/system/alerts", post(handlers::alerts::check_alerts))
        // ── Provide shared state to all routes above ────────────
        .with_state(state.clone())
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(CorsLayer::permissive())
        // Outermost, so CORS preflights are timed and recorded too
        .layer(axum_mw::from_fn_with_state(state, timing::timing_middleware))
}
