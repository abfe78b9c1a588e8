use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod alerts;
mod config;
mod handlers;
mod metrics;
mod middleware;
mod server;

use config::{Config, ConfigError};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: Config,

    /// Runtime metrics aggregator. The timing middleware records, system endpoints read.
    pub metrics: Arc<metrics::RuntimeMetrics>,

    /// Delivers alert-check incidents to the ops webhook.
    pub notifier: alerts::AlertNotifier,

    /// Process start, for `uptime_seconds`.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            metrics: Arc::new(metrics::RuntimeMetrics::new(config.max_samples)),
            notifier: alerts::AlertNotifier::new(config.alert_webhook_url.clone())?,
            started_at: Instant::now(),
            config,
        })
    }
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    // ── 1. Configuration ─────────────────────────────────────────
    let config = Config::from_env()?;
    let address = config.bind_address();

    // ── 2. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState::new(config)?);
    info!(
        max_samples = state.config.max_samples,
        alerts_enabled = state.config.cron_secret.is_some(),
        webhook_configured = state.config.alert_webhook_url.is_some(),
        "state initialized"
    );

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
