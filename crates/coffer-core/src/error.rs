//! Error types for coffer-core

use thiserror::Error;

/// Result type alias using coffer-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level error taxonomy for Coffer
///
/// Every variant except `Io` and `JsonParse` corresponds to one pipeline
/// stage failure category. Notifier failures are deliberately absent:
/// notification is best-effort and its errors never surface here.
#[derive(Error, Debug)]
pub enum Error {
    /// Source path missing at archive time
    #[error("Source path not found: {path}")]
    SourceNotFound { path: String },

    /// Database self-check reported corruption; the run is aborted
    /// before any archive is produced
    #[error("Integrity check failed: {message}")]
    IntegrityFailure { message: String },

    /// The upload collaborator raised an unrecoverable failure
    #[error("Upload failed: {message}")]
    UploadFailure { message: String },

    /// Invalid configuration content or value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unknown configuration key passed to `config set`
    #[error("Unknown configuration key: {key}. Valid keys: source_path, local_dest, remote_prefix, s3_bucket, s3_region, s3_endpoint, webhook_url, interval_minutes")]
    UnknownConfigKey { key: String },

    /// Audit log line that does not parse back into a run record
    #[error("Malformed audit record: {message}")]
    MalformedRecord { message: String },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a source not found error
    pub fn source_not_found(path: impl Into<String>) -> Self {
        Self::SourceNotFound { path: path.into() }
    }

    /// Create an integrity failure error
    pub fn integrity_failure(message: impl Into<String>) -> Self {
        Self::IntegrityFailure {
            message: message.into(),
        }
    }

    /// Create an upload failure error
    pub fn upload_failure(message: impl Into<String>) -> Self {
        Self::UploadFailure {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unknown config key error
    pub fn unknown_config_key(key: impl Into<String>) -> Self {
        Self::UnknownConfigKey { key: key.into() }
    }

    /// Create a malformed audit record error
    pub fn malformed_record(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }
}
