mod discord;

pub use discord::{AVATAR_URL, DISPLAY_NAME, DiscordNotifier, WebhookPayload};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::config::AppConfig;

/// Events that trigger notifications
#[derive(Debug, Clone)]
pub enum RunEvent {
    BackupCompleted {
        main_archive: String,
        secondary_archive: String,
    },
    Failed {
        error: String,
    },
}

impl RunEvent {
    pub fn message(&self) -> String {
        match self {
            RunEvent::BackupCompleted {
                main_archive,
                secondary_archive,
            } => format!(
                "✅ **Full backup cycle complete!**\nFiles:\n`{}`\n`{}`",
                main_archive, secondary_archive
            ),
            RunEvent::Failed { error } => format!("❌ **Critical error:** {}", error),
        }
    }
}

/// Trait for notification channel implementations
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn notify(&self, event: RunEvent) -> Result<()>;
}

/// Returns `None` when no webhook is configured, so callers never attempt a
/// delivery in that case. `http` is the shared client, timeout included.
pub fn create_notifier(
    config: &AppConfig,
    http: &reqwest::Client,
) -> Option<Arc<dyn NotificationChannel>> {
    let webhook = config.webhook()?;
    Some(Arc::new(DiscordNotifier::new(webhook.to_string(), http.clone())))
}

/// Deliver `event` if a channel is present. Failures are logged and dropped.
pub async fn notify_best_effort(channel: Option<&Arc<dyn NotificationChannel>>, event: RunEvent) {
    let Some(channel) = channel else {
        return;
    };
    if let Err(e) = channel.notify(event).await {
        warn!(error = %e, "Failed to send notification");
    }
}
