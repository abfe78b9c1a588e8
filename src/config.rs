use std::{env, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::debug;

use crate::alerts::Thresholds;
use crate::metrics::DEFAULT_MAX_SAMPLES;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_samples: usize,
    pub stream_interval: Duration,
    pub thresholds: Thresholds,
    pub cron_secret: Option<String>,
    pub alert_webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            max_samples: DEFAULT_MAX_SAMPLES,
            stream_interval: Duration::from_millis(1000),
            thresholds: Thresholds::default(),
            cron_secret: None,
            alert_webhook_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_samples = parse_or(&lookup, "METRICS_MAX_SAMPLES", defaults.max_samples)?;
        if max_samples == 0 {
            return Err(ConfigError::Zero("METRICS_MAX_SAMPLES"));
        }

        let stream_ms = parse_or(&lookup, "METRICS_STREAM_INTERVAL_MS", 1000u64)?;
        if stream_ms == 0 {
            return Err(ConfigError::Zero("METRICS_STREAM_INTERVAL_MS"));
        }

        let min_success_rate_percent = parse_or(
            &lookup,
            "ALERT_MIN_SUCCESS_RATE_PERCENT",
            defaults.thresholds.min_success_rate_percent,
        )?;
        if !min_success_rate_percent.is_finite() {
            return Err(ConfigError::Invalid {
                key: "ALERT_MIN_SUCCESS_RATE_PERCENT",
                value: min_success_rate_percent.to_string(),
            });
        }

        Ok(Self {
            host: optional(&lookup, "HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            max_samples,
            stream_interval: Duration::from_millis(stream_ms),
            thresholds: Thresholds {
                min_success_rate_percent,
                max_p95_latency_ms: parse_or(
                    &lookup,
                    "ALERT_MAX_P95_LATENCY_MS",
                    defaults.thresholds.max_p95_latency_ms,
                )?,
            },
            cron_secret: optional(&lookup, "CRON_ALERT_SECRET"),
            alert_webhook_url: optional(&lookup, "SLACK_ALERT_WEBHOOK_URL"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match optional(lookup, key) {
        None => {
            debug!(key, "not set, using default");
            Ok(default)
        }
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
