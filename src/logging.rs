//! Logging setup for ydbk.
//!
//! Human-readable console output by default, JSON lines when the run is
//! driven by cron or a log collector. Everything goes to stderr.

use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Configuration for the logging system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogConfig {
    /// Emit JSON lines instead of pretty output
    pub json: bool,
    /// Default level DEBUG instead of INFO
    pub verbose: bool,
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "ydbk=debug" } else { "ydbk=info" }
}

/// Install the global subscriber. Call once from main() after the config is
/// loaded; `RUST_LOG` takes precedence over the verbose flag.
pub fn init(config: LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json {
        builder.json().flatten_event(true).with_target(true).init();
    } else {
        builder.with_target(false).compact().init();
    }
}

/// Rate limiter for progress lines emitted while streaming a download.
pub struct LogThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True on the first call and whenever `interval` has passed since the
    /// last `true`.
    pub fn should_log(&mut self) -> bool {
        let now = Instant::now();
        let due = self
            .last
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }

    /// Log a progress line for `bytes` received so far, at most once per interval.
    pub fn progress(&mut self, file: &str, bytes: u64) {
        if self.should_log() {
            tracing::debug!(file = %file, bytes_received = bytes, "Download progress");
        }
    }
}
