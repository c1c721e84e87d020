use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://cloud-api.yandex.net/v1/disk/resources";
pub const DEFAULT_REMOTE_BACKUP_DIR: &str = "/backup/";
pub const DEFAULT_AUX_RULES_PATH: &str = "/etc/ufw/user.rules";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

const ENV_PREFIX: &str = "YDBK_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OAuth token for the storage API
    #[serde(default)]
    pub token: String,
    /// Archive password, only needed for backup runs
    #[serde(default)]
    pub password: String,
    /// Webhook endpoint. Empty or absent disables notifications.
    #[serde(default)]
    pub webhook_url: Option<String>,

    pub api_base_url: String,
    pub http_timeout_secs: u64,

    pub local_backup_dir: PathBuf,
    pub docker_dir: PathBuf,
    pub secondary_dir: PathBuf,
    pub aux_rules_path: PathBuf,
    pub remote_backup_dir: String,
    pub scratch_dir: PathBuf,
    pub archiver_binary: PathBuf,

    pub simulation: bool,
    pub verbose: bool,
    pub json_logs: bool,
}

impl AppConfig {
    /// Defaults laid out under the given home directory.
    pub fn defaults_for_home(home: &Path) -> Self {
        let docker_dir = home.join("docker");
        Self {
            token: String::new(),
            password: String::new(),
            webhook_url: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            local_backup_dir: home.join("backups"),
            secondary_dir: docker_dir.join("sillytavern"),
            docker_dir,
            aux_rules_path: PathBuf::from(DEFAULT_AUX_RULES_PATH),
            remote_backup_dir: DEFAULT_REMOTE_BACKUP_DIR.to_string(),
            scratch_dir: std::env::temp_dir().join("backup_work"),
            archiver_binary: PathBuf::from("7z"),
            simulation: false,
            verbose: false,
            json_logs: false,
        }
    }

    /// Build the configuration: home defaults, then the TOML file, then
    /// `YDBK_*` environment variables, then CLI overrides.
    pub fn new<T: Serialize>(config_file: Option<&Path>, overrides: Option<&T>) -> Result<Self> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;

        let config_file = match config_file {
            Some(path) => Some(path.to_path_buf()),
            None => dirs::config_dir().map(|dir| dir.join("ydbk").join("config.toml")),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::defaults_for_home(&home)));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));
        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: AppConfig = figment
            .extract()
            .context("Failed to load configuration")?;

        Ok(config)
    }

    /// The webhook URL, if notifications are enabled.
    pub fn webhook(&self) -> Option<&str> {
        self.webhook_url.as_deref().filter(|url| !url.is_empty())
    }

    /// Exclusion pattern for the secondary tree, relative to the parent of
    /// the main tree (`docker/sillytavern` for the default layout).
    pub fn secondary_exclude(&self) -> String {
        let base = self.docker_dir.parent().unwrap_or(&self.docker_dir);
        match self.secondary_dir.strip_prefix(base) {
            Ok(relative) => relative.to_string_lossy().into_owned(),
            Err(_) => self.secondary_dir.to_string_lossy().into_owned(),
        }
    }
}
