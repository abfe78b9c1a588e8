use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

use super::Incident;

const ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(200);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook responded with status {0}")]
    Status(u16),
}

/// Result of trying to deliver one incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DeliveryOutcome {
    fn sent() -> Self {
        Self {
            sent: true,
            reason: None,
        }
    }

    fn not_sent(reason: impl Into<String>) -> Self {
        Self {
            sent: false,
            reason: Some(reason.into()),
        }
    }
}

/// Posts incidents to a Slack-compatible incoming webhook.
pub struct AlertNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl AlertNotifier {
    pub fn new(webhook_url: Option<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// Never fails: a missing webhook or a delivery error is reported in
    /// the outcome so one bad incident does not abort the rest.
    pub async fn send(&self, incident: &Incident) -> DeliveryOutcome {
        let Some(url) = self.webhook_url.as_deref() else {
            return DeliveryOutcome::not_sent("SLACK_ALERT_WEBHOOK_URL not configured");
        };

        let payload = webhook_payload(incident);
        match self.post_with_retry(url, &payload).await {
            Ok(()) => DeliveryOutcome::sent(),
            Err(e) => {
                error!(title = %incident.title, error = %e, "ops alert delivery failed");
                DeliveryOutcome::not_sent(e.to_string())
            }
        }
    }

    /// Up to `ATTEMPTS` tries, sleeping `BASE_DELAY * attempt` in between.
    async fn post_with_retry(&self, url: &str, payload: &Value) -> Result<(), NotifyError> {
        let mut attempt = 1;
        loop {
            match self.post(url, payload).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= ATTEMPTS => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "ops alert webhook failed, retrying");
                    tokio::time::sleep(BASE_DELAY * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// `{ attachments: [{ color, title, text }] }` with one `*key*: value`
/// line per detail.
pub fn webhook_payload(incident: &Incident) -> Value {
    let text = incident
        .details
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("*{key}*: {s}"),
            other => format!("*{key}*: {other}"),
        })
        .collect::<Vec<_>>()
        .join("\n");

    json!({
        "attachments": [{
            "color": incident.severity.color(),
            "title": incident.title,
            "text":  text,
        }]
    })
}
