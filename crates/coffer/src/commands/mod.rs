//! CLI command implementations

pub mod config;
pub mod history;
pub mod run;
pub mod verify;
pub mod watch;

use std::sync::Arc;

use coffer_core::{BackupConfig, Result};
use coffer_engine::{AuditLog, BackupPipeline};
use coffer_remote::{NoOpUploader, Notifier, NullNotifier, S3Uploader, Uploader, WebhookNotifier};

/// Assemble a pipeline from a configuration snapshot.
///
/// An empty `s3_bucket` disables the upload stage and an empty `webhook_url`
/// disables notification; runs then record an empty remote id and publish
/// nothing.
pub(crate) async fn build_pipeline(config: &BackupConfig) -> Result<BackupPipeline> {
    let uploader: Arc<dyn Uploader> = if config.upload_enabled() {
        Arc::new(S3Uploader::from_config(config).await?)
    } else {
        Arc::new(NoOpUploader)
    };

    let notifier: Arc<dyn Notifier> = if config.notify_enabled() {
        Arc::new(WebhookNotifier::new(config.webhook_url.clone())?)
    } else {
        Arc::new(NullNotifier)
    };

    let audit = AuditLog::open_default()?;
    Ok(BackupPipeline::new(audit, uploader, notifier))
}
