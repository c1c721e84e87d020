use crate::core::archiver::{ArchiveError, ArchiveRequest, Archiver};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Stand-in archiver for dry runs and tests. Writes a plain-text manifest of
/// the requested inputs instead of a real archive.
#[derive(Default)]
pub struct SimulatedArchiver {
    /// Fail the Nth call (1-based) instead of producing output.
    pub fail_on_call: Option<usize>,
    calls: Arc<AtomicUsize>,
}

impl SimulatedArchiver {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn manifest(req: &ArchiveRequest) -> String {
    let mut out = String::from("simulated archive\n");
    for input in &req.inputs {
        out.push_str(&format!("input {}\n", input.display()));
    }
    for pattern in &req.excludes {
        out.push_str(&format!("exclude {}\n", pattern));
    }
    out
}

impl Archiver for SimulatedArchiver {
    fn produce(
        &self,
        req: &ArchiveRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), ArchiveError>> + Send>> {
        let req = req.clone();
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail = self.fail_on_call == Some(call);

        Box::pin(async move {
            info!(archive = %req.output.display(), "(Simulated) Building archive");

            if fail {
                return Err(ArchiveError::Failed {
                    archive: req.output,
                    status: "simulated failure".to_string(),
                });
            }

            tokio::fs::write(&req.output, manifest(&req))
                .await
                .map_err(|source| ArchiveError::Io {
                    archive: req.output.clone(),
                    source,
                })
        })
    }
}
