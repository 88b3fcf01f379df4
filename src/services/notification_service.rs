use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::services::side_effects::{NotificationChannel, ProgressNotification};
use crate::utils::sanitize::sanitize;

/// Posts match progress to an external webhook. Responses are not interpreted
/// beyond logging; delivery is at most once.
#[derive(Clone)]
pub struct NotificationService {
    client: Client,
    webhook_url: Option<String>,
    webhook_secret: Option<String>,
}

impl NotificationService {
    pub fn new(webhook_url: Option<String>, webhook_secret: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        let webhook_url = webhook_url.filter(|url| !url.trim().is_empty());

        if let Some(ref url) = webhook_url {
            info!("Progress notifications enabled, webhook URL: {}", url);
        } else {
            info!("Progress notifications disabled (NOTIFICATION_WEBHOOK_URL not set or empty)");
        }

        Ok(Self {
            client,
            webhook_url,
            webhook_secret,
        })
    }
}

#[async_trait]
impl NotificationChannel for NotificationService {
    async fn post(&self, payload: &ProgressNotification) -> anyhow::Result<()> {
        let Some(webhook_url) = &self.webhook_url else {
            debug!(match_id = %payload.match_id, "notification skipped, no webhook configured");
            return Ok(());
        };

        let body = sanitize(serde_json::to_value(payload)?);

        let mut request = self.client.post(webhook_url).json(&body);
        if let Some(secret) = &self.webhook_secret {
            request = request.header("X-Webhook-Secret", secret);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("notification request for match {} failed", payload.match_id))?;

        let status = response.status();
        if status.is_success() {
            info!(match_id = %payload.match_id, status = %payload.status, "progress notification sent");
        } else {
            warn!(
                match_id = %payload.match_id,
                http_status = status.as_u16(),
                "progress notification endpoint returned an error status"
            );
        }
        Ok(())
    }
}
