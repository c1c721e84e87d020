use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Scratch directory that is removed when the guard is dropped.
///
/// The guard exists before the directory is created, so every exit path
/// after construction cleans up, including a failed `create_dir_all`.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub async fn create(path: &Path) -> Result<Self> {
        let guard = Self {
            path: path.to_path_buf(),
        };
        tokio::fs::create_dir_all(&guard.path)
            .await
            .with_context(|| format!("Failed to create scratch folder {}", path.display()))?;
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed scratch folder"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove scratch folder"),
        }
    }
}

/// Copy `source` into `scratch` under its own file name. If the copy fails,
/// an empty placeholder takes its place and the run continues.
pub async fn stage_aux_file(source: &Path, scratch: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "aux".into());
    let staged = scratch.join(name);

    if let Err(e) = tokio::fs::copy(source, &staged).await {
        warn!(source = %source.display(), error = %e, "Could not copy auxiliary file, using an empty placeholder");
        tokio::fs::write(&staged, b"")
            .await
            .with_context(|| format!("Failed to create placeholder {}", staged.display()))?;
    }

    Ok(staged)
}
