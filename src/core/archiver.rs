mod sevenzip;
mod simulated;

pub use sevenzip::SevenZipArchiver;
pub use simulated::SimulatedArchiver;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;

/// Input for a single encrypted archive.
#[derive(Clone)]
pub struct ArchiveRequest {
    pub output: PathBuf,
    pub inputs: Vec<PathBuf>,
    /// Recursive exclusion patterns, relative to the archived trees.
    pub excludes: Vec<String>,
    pub password: String,
}

impl std::fmt::Debug for ArchiveRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveRequest")
            .field("output", &self.output)
            .field("inputs", &self.inputs)
            .field("excludes", &self.excludes)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to start archiver for {archive}: {source}")]
    Spawn {
        archive: PathBuf,
        source: std::io::Error,
    },

    #[error("archiver exited with {status} while building {archive}")]
    Failed { archive: PathBuf, status: String },

    #[error("failed to write {archive}: {source}")]
    Io {
        archive: PathBuf,
        source: std::io::Error,
    },
}

pub trait Archiver: Send + Sync {
    /// Build the archive described by `req`. All or nothing: any failure
    /// means the archive must not be used.
    fn produce(
        &self,
        req: &ArchiveRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), ArchiveError>> + Send>>;
}

pub fn create_archiver(config: &AppConfig) -> Arc<dyn Archiver> {
    if config.simulation {
        Arc::new(SimulatedArchiver::default())
    } else {
        Arc::new(SevenZipArchiver::new(config.archiver_binary.clone()))
    }
}
