use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Cradle-Signature";

// ── Data types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub event: String,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub detail: serde_json::Value,
}

// ── Notifier ─────────────────────────────────────────────────────────────────

/// Posts submission events to the operator's hook (typically an email relay).
/// Delivery is fire-and-forget: failures are logged, never surfaced to the
/// submitter.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    url: String,
    /// HMAC key for `X-Cradle-Signature` (from CRADLE_WEBHOOK_SECRET).
    signing_key: Option<String>,
}

impl Notifier {
    pub fn new(url: String, signing_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("build notification http client")?;

        Ok(Self {
            client,
            url,
            signing_key,
        })
    }

    /// Queue delivery of `event_type` for record `id` on a background task.
    pub fn fire(&self, event_type: &str, id: &str, detail: serde_json::Value) {
        let event = NotificationEvent {
            event: event_type.to_owned(),
            id: id.to_owned(),
            timestamp: Utc::now(),
            detail,
        };

        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.deliver(&event).await;
        });
    }

    async fn deliver(&self, event: &NotificationEvent) {
        let body = match serde_json::to_string(event) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "failed to serialize notification");
                return;
            }
        };

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.signing_key {
            let signature = compute_signature(key, &body);
            request = request.header(SIGNATURE_HEADER, format!("sha256={signature}"));
        }

        match request.body(body).send().await {
            Ok(resp) => {
                debug!(url = %self.url, event = %event.event, status = %resp.status(), "notification delivered");
            }
            Err(e) => {
                warn!(url = %self.url, event = %event.event, error = %e, "notification delivery failed");
            }
        }
    }
}

/// Compute HMAC-SHA256 hex digest.
pub fn compute_signature(secret: &str, body: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
