pub mod archiver;
pub mod models;
pub mod notifications;
pub mod orchestrator;
pub mod scratch;
pub mod storage;

pub use archiver::{ArchiveError, ArchiveRequest, Archiver, create_archiver};
pub use models::{ArchiveKind, BackupArchive, BackupPlan, BackupStage, Invocation, Mode};
pub use notifications::{NotificationChannel, RunEvent, create_notifier};
pub use orchestrator::Orchestrator;
pub use storage::{DiskClient, StorageError};
