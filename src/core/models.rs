use chrono::{DateTime, Local};
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which workflow a single invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Upload,
    Download,
    Backup,
}

/// Per-run selectors taken from the command line.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub mode: Mode,
    pub file: Option<PathBuf>,
    pub prefix: Option<String>,
    pub remote: Option<String>,
}

impl Invocation {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            file: None,
            prefix: None,
            remote: None,
        }
    }

    /// Remote directory, `/` when none was given.
    pub fn remote_dir(&self) -> &str {
        match self.remote.as_deref() {
            Some(dir) if !dir.is_empty() => dir,
            _ => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Main,
    Secondary,
}

impl ArchiveKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArchiveKind::Main => "main",
            ArchiveKind::Secondary => "silly",
        }
    }
}

/// Timestamp format embedded in archive names.
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One archive produced by a backup run: `backup_<kind>-<YYYYMMDD_HHMMSS>.7z`
/// under the local backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArchive {
    pub file_name: String,
    pub local_path: PathBuf,
}

impl BackupArchive {
    pub fn new(kind: ArchiveKind, stamp: &str, backup_dir: &Path) -> Self {
        let file_name = format!("backup_{}-{}.7z", kind.label(), stamp);
        Self {
            local_path: backup_dir.join(&file_name),
            file_name,
        }
    }
}

/// Both archives of one backup run, sharing a single timestamp.
#[derive(Debug, Clone)]
pub struct BackupPlan {
    pub stamp: String,
    pub main: BackupArchive,
    pub secondary: BackupArchive,
    pub remote_dir: String,
}

impl BackupPlan {
    pub fn new(now: DateTime<Local>, backup_dir: &Path, remote_dir: &str) -> Self {
        let stamp = now.format(STAMP_FORMAT).to_string();
        Self {
            main: BackupArchive::new(ArchiveKind::Main, &stamp, backup_dir),
            secondary: BackupArchive::new(ArchiveKind::Secondary, &stamp, backup_dir),
            remote_dir: remote_dir.to_string(),
            stamp,
        }
    }
}

/// Progress of a backup run. A failure at any stage ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStage {
    Init,
    DirsEnsured,
    AuxStaged,
    MainArchived,
    SecondaryArchived,
    MainUploaded,
    SecondaryUploaded,
    Notified,
}

impl fmt::Display for BackupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupStage::Init => "init",
            BackupStage::DirsEnsured => "dirs_ensured",
            BackupStage::AuxStaged => "aux_staged",
            BackupStage::MainArchived => "main_archived",
            BackupStage::SecondaryArchived => "secondary_archived",
            BackupStage::MainUploaded => "main_uploaded",
            BackupStage::SecondaryUploaded => "secondary_uploaded",
            BackupStage::Notified => "notified",
        };
        f.write_str(name)
    }
}
