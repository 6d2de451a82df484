//! One backup run from integrity gate to notification.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use coffer_archive::{create_archive, verify_source, Hasher, Sha256Hasher};
use coffer_core::{ArchiveArtifact, BackupConfig, Error, Result, RunRecord};
use coffer_remote::{Notifier, RunEvent, Uploader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::audit::AuditLog;

/// Orchestrates the backup stage sequence and owns the audit trail.
///
/// All runs, manual or scheduled, are serialized through an internal lock
/// so two invocations can never interleave archive creation or audit
/// appends against the same pipeline.
pub struct BackupPipeline {
    audit: AuditLog,
    uploader: Arc<dyn Uploader>,
    notifier: Arc<dyn Notifier>,
    hasher: Arc<dyn Hasher>,
    run_lock: Mutex<()>,
}

/// A stage failure plus whatever artifact state the run reached first
struct RunFailure {
    error: Error,
    artifact: Option<ArchiveArtifact>,
}

impl From<Error> for RunFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            artifact: None,
        }
    }
}

impl RunFailure {
    /// Failure after the archive landed on disk; the audit row keeps the
    /// path and any size already read
    fn after_archive(error: Error, path: PathBuf, byte_size: u64) -> Self {
        Self {
            error,
            artifact: Some(ArchiveArtifact {
                path,
                byte_size,
                content_digest: String::new(),
            }),
        }
    }
}

impl BackupPipeline {
    pub fn new(
        audit: AuditLog,
        uploader: Arc<dyn Uploader>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_hasher(audit, uploader, notifier, Arc::new(Sha256Hasher))
    }

    /// Pipeline with an explicit digest strategy
    pub fn with_hasher(
        audit: AuditLog,
        uploader: Arc<dyn Uploader>,
        notifier: Arc<dyn Notifier>,
        hasher: Arc<dyn Hasher>,
    ) -> Self {
        Self {
            audit,
            uploader,
            notifier,
            hasher,
            run_lock: Mutex::new(()),
        }
    }

    /// The ledger this pipeline appends run records to
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Execute one full backup run against a configuration snapshot.
    ///
    /// Exactly one run record is appended per invocation, success or
    /// failure. Stage failures are persisted as an ERROR record and then
    /// propagated to the caller; notifier failures are swallowed inside
    /// the notifier and never affect the outcome.
    pub async fn run_once(&self, config: &BackupConfig) -> Result<RunRecord> {
        let _guard = self.run_lock.lock().await;

        let started_at = Utc::now();
        let source_path = config.source_path.to_string();
        info!("Backup run started for {}", source_path);
        self.notifier
            .publish(&RunEvent::RunStarted {
                timestamp: started_at,
                source_path: source_path.clone(),
            })
            .await;

        match self.execute_stages(config).await {
            Ok((artifact, remote_id)) => {
                let record = RunRecord::success(started_at, &source_path, &artifact, remote_id);
                self.audit.append(&record)?;
                self.notifier
                    .publish(&RunEvent::RunCompleted {
                        record: record.clone(),
                    })
                    .await;
                info!(
                    "Backup run completed: {} ({} bytes)",
                    record.archive_path, record.archive_size
                );
                Ok(record)
            }
            Err(failure) => {
                let message = failure.error.to_string();
                warn!("Backup run failed: {}", message);

                // The ERROR record must land before the failure propagates.
                let record = RunRecord::failure(
                    started_at,
                    &source_path,
                    failure.artifact.as_ref(),
                    message,
                );
                self.audit.append(&record)?;
                self.notifier
                    .publish(&RunEvent::RunFailed { record })
                    .await;
                Err(failure.error)
            }
        }
    }

    /// Stages 1-4: integrity gate, archive, digest, upload
    async fn execute_stages(
        &self,
        config: &BackupConfig,
    ) -> std::result::Result<(ArchiveArtifact, String), RunFailure> {
        let source = config.source_path.clone();

        // Fail-closed gate: a source that classifies as an actively checked
        // database engine must pass its self-check before anything is
        // written. A corrupt database is never archived.
        if let Some(verdict) = verify_source(source.as_std_path()).await {
            if !verdict.is_valid {
                return Err(Error::integrity_failure(format!(
                    "{}: {}",
                    source, verdict.diagnostic_message
                ))
                .into());
            }
            debug!(
                "Integrity check passed for {} ({} schema objects)",
                source, verdict.object_count
            );
        }

        let dest = config.local_dest.clone();
        let archive_source = source.clone();
        let archive_path = tokio::task::spawn_blocking(move || {
            create_archive(archive_source.as_std_path(), dest.as_std_path())
        })
        .await
        .map_err(join_err)??;

        // Failures past this point keep the archive path so the audit row
        // shows how far the run got.
        let byte_size = match tokio::fs::metadata(&archive_path).await {
            Ok(meta) => meta.len(),
            Err(e) => return Err(RunFailure::after_archive(Error::from(e), archive_path, 0)),
        };

        let hasher = Arc::clone(&self.hasher);
        let digest_input = archive_path.clone();
        let digest_result = tokio::task::spawn_blocking(move || hasher.digest(&digest_input))
            .await
            .map_err(join_err);
        let content_digest = match digest_result {
            Ok(Ok(digest)) => digest,
            Ok(Err(e)) | Err(e) => {
                return Err(RunFailure::after_archive(e, archive_path, byte_size))
            }
        };

        let artifact = ArchiveArtifact {
            path: archive_path,
            byte_size,
            content_digest,
        };

        let remote_id = self
            .uploader
            .upload(&artifact.path)
            .await
            .map_err(|e| RunFailure {
                error: e,
                artifact: Some(artifact.clone()),
            })?;

        Ok((artifact, remote_id))
    }
}

/// Fold a blocking-task join failure into the run's error domain
fn join_err(e: tokio::task::JoinError) -> Error {
    Error::from(io::Error::other(e))
}
