//! # coffer-remote
//!
//! The pipeline's external collaborators behind capability traits:
//! - **Uploader**: hands a finished archive to a remote object store and
//!   returns its remote identifier
//! - **Notifier**: best-effort run event publisher whose failures never
//!   reach the pipeline

pub mod notify;
pub mod upload;

pub use notify::{Notifier, NullNotifier, RunEvent, WebhookNotifier};
pub use upload::{NoOpUploader, S3Uploader, Uploader};
