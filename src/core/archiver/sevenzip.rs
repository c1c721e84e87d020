use crate::core::archiver::{ArchiveError, ArchiveRequest, Archiver};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs the `7z` executable: LZMA2 at level 9 with encrypted headers.
pub struct SevenZipArchiver {
    binary: PathBuf,
}

impl SevenZipArchiver {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

/// Command line for `7z a`. Contains the password, never log it.
pub(crate) fn build_args(req: &ArchiveRequest) -> Vec<String> {
    let mut args = vec![
        "a".to_string(),
        "-m0=lzma2".to_string(),
        "-mx=9".to_string(),
        format!("-p{}", req.password),
        "-mhe=on".to_string(),
    ];
    args.extend(req.excludes.iter().map(|pattern| format!("-xr!{}", pattern)));
    args.push(req.output.to_string_lossy().into_owned());
    args.extend(req.inputs.iter().map(|p| p.to_string_lossy().into_owned()));
    args
}

impl Archiver for SevenZipArchiver {
    fn produce(
        &self,
        req: &ArchiveRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), ArchiveError>> + Send>> {
        let req = req.clone();
        let binary = self.binary.clone();

        Box::pin(async move {
            info!(archive = %req.output.display(), inputs = req.inputs.len(), "(7z) Building archive");

            let output = Command::new(&binary)
                .args(build_args(&req))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .output()
                .await
                .map_err(|source| ArchiveError::Spawn {
                    archive: req.output.clone(),
                    source,
                })?;

            if output.status.success() {
                Ok(())
            } else {
                debug!(
                    archive = %req.output.display(),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "7z reported an error"
                );
                Err(ArchiveError::Failed {
                    archive: req.output,
                    status: output.status.to_string(),
                })
            }
        })
    }
}
