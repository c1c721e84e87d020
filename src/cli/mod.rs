//! Command line surface.
//!
//! Flags follow clap's `--flag` style. The single-dash spellings used by
//! existing cron entries (`-mode=backup`, `-token X`) are rewritten to the
//! double-dash form before parsing.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::core::{Invocation, Mode};

const LONG_FLAGS: &[&str] = &[
    "mode",
    "token",
    "password",
    "file",
    "prefix",
    "remote",
    "webhook",
    "config",
    "verbose",
    "json-logs",
    "simulation",
];

#[derive(Parser, Debug)]
#[command(name = "ydbk")]
#[command(about = "Encrypted 7z backups to Yandex.Disk", long_about = None)]
pub struct Cli {
    /// Workflow to run: upload, download or backup
    #[arg(long)]
    pub mode: Option<String>,

    /// Local file to upload (upload mode)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// File name prefix to search for (download mode)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Remote folder, defaults to `/`
    #[arg(long)]
    pub remote: Option<String>,

    /// Config file, defaults to `<config dir>/ydbk/config.toml`
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigArgs,
}

/// Flags that override values from the config file and environment.
#[derive(clap::Args, Serialize, Debug, Default)]
pub struct ConfigArgs {
    /// OAuth token for the storage API
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    pub token: Option<String>,

    /// Archive password (backup mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    pub password: Option<String>,

    /// Webhook URL for status messages; unset disables notifications
    #[serde(skip_serializing_if = "Option::is_none", rename = "webhook_url")]
    #[arg(long)]
    pub webhook: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    pub verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    pub json_logs: Option<bool>,

    /// Use the simulated archiver instead of 7z
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    pub simulation: Option<bool>,
}

impl Cli {
    /// Parse from an argument list, accepting single-dash long flags.
    pub fn parse_normalized<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::parse_from(normalize_args(args))
    }

    /// Validated per-run selectors. The mode is checked here rather than by
    /// clap so a bad value goes through the normal failure path (webhook,
    /// exit status 1) instead of clap's usage exit.
    pub fn invocation(&self) -> Result<Invocation> {
        let raw = self
            .mode
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| anyhow!("No mode given. Use --mode=backup, --mode=upload or --mode=download"))?;
        let mode = Mode::from_str(raw, false).map_err(|_| {
            anyhow!(
                "Invalid mode '{}'. Use --mode=backup, --mode=upload or --mode=download",
                raw
            )
        })?;

        Ok(Invocation {
            mode,
            file: self.file.clone(),
            prefix: self.prefix.clone(),
            remote: self.remote.clone(),
        })
    }
}

/// Rewrite `-name` / `-name=value` to `--name` / `--name=value` for known
/// long flags. Everything else passes through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(rest) = text.strip_prefix('-') else {
                return arg;
            };
            if rest.starts_with('-') {
                return arg;
            }
            let name = rest.split('=').next().unwrap_or(rest);
            if LONG_FLAGS.contains(&name) {
                OsString::from(format!("-{}", text))
            } else {
                arg
            }
        })
        .collect()
}
