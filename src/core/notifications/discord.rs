use super::{NotificationChannel, RunEvent};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

pub const DISPLAY_NAME: &str = "Backup System";
pub const AVATAR_URL: &str = "https://raw.githubusercontent.com/google/material-design-icons/refs/heads/master/png/action/backup/materialicons/48dp/2x/baseline_backup_black_48dp.png";

#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub content: String,
    pub username: String,
    pub avatar_url: String,
}

pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: String, client: reqwest::Client) -> Self {
        Self {
            webhook_url,
            client,
        }
    }

    fn format_message(&self, event: &RunEvent) -> WebhookPayload {
        WebhookPayload {
            content: event.message(),
            username: DISPLAY_NAME.to_string(),
            avatar_url: AVATAR_URL.to_string(),
        }
    }
}

#[async_trait]
impl NotificationChannel for DiscordNotifier {
    async fn notify(&self, event: RunEvent) -> Result<()> {
        let payload = self.format_message(&event);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;
        debug!(status = %response.status(), "Webhook delivered");
        Ok(())
    }
}
