use anyhow::{Context, Result, bail};
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::context::AppContext;
use crate::core::archiver::{ArchiveRequest, Archiver};
use crate::core::models::{BackupPlan, BackupStage, Invocation, Mode};
use crate::core::notifications::{NotificationChannel, RunEvent, notify_best_effort};
use crate::core::scratch::{ScratchDir, stage_aux_file};

pub struct Orchestrator {
    ctx: AppContext,
    archiver: Arc<dyn Archiver>,
    notifier: Option<Arc<dyn NotificationChannel>>,
}

impl Orchestrator {
    /// `notifier` is the hook fired on backup success and on any fatal
    /// error. `None` disables notifications entirely.
    pub fn new(
        ctx: AppContext,
        archiver: Arc<dyn Archiver>,
        notifier: Option<Arc<dyn NotificationChannel>>,
    ) -> Self {
        Self {
            ctx,
            archiver,
            notifier,
        }
    }

    /// Run one invocation. On error the failure notification has already
    /// been attempted when this returns.
    pub async fn run(&self, invocation: &Invocation) -> Result<()> {
        match self.dispatch(invocation).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Fatal-error hook: log `err`, attempt the failure notification, and
    /// hand the error back for the caller to exit with.
    pub async fn fail(&self, err: anyhow::Error) -> anyhow::Error {
        let message = format!("{:#}", err);
        error!(error = %message, "Run failed");
        notify_best_effort(self.notifier.as_ref(), RunEvent::Failed { error: message }).await;
        err
    }

    async fn dispatch(&self, invocation: &Invocation) -> Result<()> {
        if self.ctx.config.token.is_empty() {
            bail!("No storage token given (--token)");
        }

        match invocation.mode {
            Mode::Upload => {
                let Some(file) = invocation.file.as_deref() else {
                    bail!("No file given (--file)");
                };
                self.upload(file, invocation.remote_dir()).await
            }
            Mode::Download => {
                let Some(prefix) = invocation.prefix.as_deref().filter(|p| !p.is_empty()) else {
                    bail!("No prefix given (--prefix)");
                };
                let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
                self.download(prefix, invocation.remote_dir(), &cwd).await
            }
            Mode::Backup => {
                if self.ctx.config.password.is_empty() {
                    bail!("No archive password given (--password)");
                }
                self.backup().await.map(|_| ())
            }
        }
    }

    pub async fn upload(&self, file: &Path, remote_dir: &str) -> Result<()> {
        self.ctx
            .storage
            .upload(file, remote_dir)
            .await
            .with_context(|| format!("Upload of {} failed", file.display()))?;
        Ok(())
    }

    pub async fn download(&self, prefix: &str, remote_dir: &str, output_dir: &Path) -> Result<()> {
        let receipt = self
            .ctx
            .storage
            .download_newest(prefix, remote_dir, output_dir)
            .await
            .with_context(|| format!("Download of '{}' failed", prefix))?;
        info!(path = %receipt.local_path.display(), "Saved");
        Ok(())
    }

    /// Full cycle: archive both trees, upload both archives, notify.
    pub async fn backup(&self) -> Result<BackupPlan> {
        let config = &self.ctx.config;
        let plan = BackupPlan::new(
            Local::now(),
            &config.local_backup_dir,
            &config.remote_backup_dir,
        );

        info!(stamp = %plan.stamp, "Starting backup run");

        let mut stage = BackupStage::Init;
        self.backup_stages(&plan, &mut stage)
            .await
            .with_context(|| format!("Backup aborted after stage '{}'", stage))?;

        notify_best_effort(
            self.notifier.as_ref(),
            RunEvent::BackupCompleted {
                main_archive: plan.main.file_name.clone(),
                secondary_archive: plan.secondary.file_name.clone(),
            },
        )
        .await;
        advance(&mut stage, BackupStage::Notified);

        Ok(plan)
    }

    async fn backup_stages(&self, plan: &BackupPlan, stage: &mut BackupStage) -> Result<()> {
        let config = &self.ctx.config;

        tokio::fs::create_dir_all(&config.local_backup_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create backup folder {}",
                    config.local_backup_dir.display()
                )
            })?;
        // Dropped on every return path below.
        let scratch = ScratchDir::create(&config.scratch_dir).await?;
        advance(stage, BackupStage::DirsEnsured);

        let rules = stage_aux_file(&config.aux_rules_path, scratch.path()).await?;
        advance(stage, BackupStage::AuxStaged);

        let main = ArchiveRequest {
            output: plan.main.local_path.clone(),
            inputs: vec![config.docker_dir.clone(), rules],
            excludes: vec![config.secondary_exclude()],
            password: config.password.clone(),
        };
        self.archiver
            .produce(&main)
            .await
            .with_context(|| format!("Failed to build main archive {}", plan.main.file_name))?;
        advance(stage, BackupStage::MainArchived);

        let secondary = ArchiveRequest {
            output: plan.secondary.local_path.clone(),
            inputs: vec![config.secondary_dir.clone()],
            excludes: Vec::new(),
            password: config.password.clone(),
        };
        self.archiver.produce(&secondary).await.with_context(|| {
            format!(
                "Failed to build secondary archive {}",
                plan.secondary.file_name
            )
        })?;
        advance(stage, BackupStage::SecondaryArchived);

        self.upload(&plan.main.local_path, &plan.remote_dir).await?;
        advance(stage, BackupStage::MainUploaded);

        self.upload(&plan.secondary.local_path, &plan.remote_dir)
            .await?;
        advance(stage, BackupStage::SecondaryUploaded);

        Ok(())
    }
}

fn advance(stage: &mut BackupStage, next: BackupStage) {
    info!(from = %stage, to = %next, "Backup stage");
    *stage = next;
}
