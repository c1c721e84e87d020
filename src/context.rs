use crate::config::AppConfig;
use crate::core::DiskClient;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// HTTP client shared by the storage API and the webhook.
pub fn http_client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
    pub storage: Arc<DiskClient>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = http_client(config.http_timeout_secs).context("Failed to build HTTP client")?;
        let storage = DiskClient::new(
            http.clone(),
            config.api_base_url.clone(),
            config.token.clone(),
        );
        Ok(Self {
            config: Arc::new(config),
            http,
            storage: Arc::new(storage),
        })
    }
}
