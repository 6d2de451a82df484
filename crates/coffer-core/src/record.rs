//! Run records, integrity verdicts, and source classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Outcome status of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Ok,
    Error,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Ok => write!(f, "OK"),
            RunStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(RunStatus::Ok),
            "ERROR" => Ok(RunStatus::Error),
            other => Err(crate::error::Error::malformed_record(format!(
                "unknown status '{}'",
                other
            ))),
        }
    }
}

/// Source classification by file extension
///
/// Closed set: only `Sqlite` is actively verified. The other recognized
/// engines classify without probing, and `Other` skips verification
/// entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// SQLite database file (`.sqlite`, `.db`)
    Sqlite,
    /// DuckDB database file (`.duckdb`); recognized, not probed
    DuckDb,
    /// SQL Server LocalDB data file (`.mdf`); recognized, not probed
    SqlServer,
    /// Anything else, including directories
    Other,
}

impl SourceKind {
    /// Classify a path by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("sqlite") | Some("db") => SourceKind::Sqlite,
            Some("duckdb") => SourceKind::DuckDb,
            Some("mdf") => SourceKind::SqlServer,
            _ => SourceKind::Other,
        }
    }

    /// Whether this kind is a recognized database engine marker
    pub fn is_recognized_database(&self) -> bool {
        !matches!(self, SourceKind::Other)
    }

    /// Whether an active consistency check exists for this kind
    pub fn actively_checked(&self) -> bool {
        matches!(self, SourceKind::Sqlite)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Sqlite => "sqlite",
            SourceKind::DuckDb => "duckdb",
            SourceKind::SqlServer => "sqlserver",
            SourceKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Result of a database self-check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityVerdict {
    /// Whether the engine reported a consistent database
    pub is_valid: bool,

    /// Engine diagnostic ("ok" for a clean check)
    pub diagnostic_message: String,

    /// Number of catalog objects found
    pub object_count: i64,
}

impl IntegrityVerdict {
    /// A clean verdict
    pub fn valid(object_count: i64) -> Self {
        Self {
            is_valid: true,
            diagnostic_message: "ok".to_string(),
            object_count,
        }
    }

    /// A failed verdict carrying the engine or connection diagnostic
    pub fn invalid(diagnostic: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            diagnostic_message: diagnostic.into(),
            object_count: 0,
        }
    }
}

/// A finished archive and its fingerprint, produced once per run
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveArtifact {
    /// Location of the archive on disk
    pub path: PathBuf,

    /// Archive size in bytes
    pub byte_size: u64,

    /// Lowercase hex SHA-256 of the archive contents
    pub content_digest: String,
}

/// The audit unit: one persisted entry per pipeline run
///
/// Finalized exactly once at run end and never mutated after persistence.
/// Failed runs keep whatever fields the run reached; the rest stay empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run start time
    pub timestamp: DateTime<Utc>,

    /// Configured source path
    pub source_path: String,

    /// Archive location, empty if the run failed before archiving
    pub archive_path: String,

    /// Archive size in bytes, 0 if never produced
    pub archive_size: u64,

    /// SHA-256 digest of the archive, empty if never produced
    pub content_digest: String,

    /// Identifier returned by the upload collaborator, empty if not reached
    /// or uploads are disabled
    pub remote_id: String,

    /// Run outcome
    pub status: RunStatus,

    /// Failure text for ERROR records, empty for OK
    pub message: String,
}

impl RunRecord {
    /// Build the record for a completed run
    pub fn success(
        started_at: DateTime<Utc>,
        source_path: &str,
        artifact: &ArchiveArtifact,
        remote_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: started_at,
            source_path: source_path.to_string(),
            archive_path: artifact.path.display().to_string(),
            archive_size: artifact.byte_size,
            content_digest: artifact.content_digest.clone(),
            remote_id: remote_id.into(),
            status: RunStatus::Ok,
            message: String::new(),
        }
    }

    /// Build the record for a failed run, keeping any fields the run
    /// reached before failing
    pub fn failure(
        started_at: DateTime<Utc>,
        source_path: &str,
        artifact: Option<&ArchiveArtifact>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: started_at,
            source_path: source_path.to_string(),
            archive_path: artifact
                .map(|a| a.path.display().to_string())
                .unwrap_or_default(),
            archive_size: artifact.map(|a| a.byte_size).unwrap_or(0),
            content_digest: artifact
                .map(|a| a.content_digest.clone())
                .unwrap_or_default(),
            remote_id: String::new(),
            status: RunStatus::Error,
            message: message.into(),
        }
    }

    /// Whether the run completed successfully
    pub fn is_ok(&self) -> bool {
        self.status == RunStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artifact() -> ArchiveArtifact {
        ArchiveArtifact {
            path: PathBuf::from("/backups/backup-app-20260115-093001.zip"),
            byte_size: 2048,
            content_digest: "a".repeat(64),
        }
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(
            SourceKind::from_path(Path::new("/data/app.sqlite")),
            SourceKind::Sqlite
        );
        assert_eq!(
            SourceKind::from_path(Path::new("/data/app.DB")),
            SourceKind::Sqlite
        );
        assert_eq!(
            SourceKind::from_path(Path::new("analytics.duckdb")),
            SourceKind::DuckDb
        );
        assert_eq!(
            SourceKind::from_path(Path::new("store.mdf")),
            SourceKind::SqlServer
        );
        assert_eq!(
            SourceKind::from_path(Path::new("notes.txt")),
            SourceKind::Other
        );
        assert_eq!(
            SourceKind::from_path(Path::new("/var/lib/photos")),
            SourceKind::Other
        );
    }

    #[test]
    fn test_only_sqlite_is_actively_checked() {
        assert!(SourceKind::Sqlite.actively_checked());
        assert!(!SourceKind::DuckDb.actively_checked());
        assert!(!SourceKind::SqlServer.actively_checked());
        assert!(!SourceKind::Other.actively_checked());

        assert!(SourceKind::DuckDb.is_recognized_database());
        assert!(!SourceKind::Other.is_recognized_database());
    }

    #[test]
    fn test_status_display_and_parse() {
        assert_eq!(RunStatus::Ok.to_string(), "OK");
        assert_eq!(RunStatus::Error.to_string(), "ERROR");
        assert_eq!("OK".parse::<RunStatus>().unwrap(), RunStatus::Ok);
        assert_eq!("ERROR".parse::<RunStatus>().unwrap(), RunStatus::Error);
        assert!("ok".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_success_record_populates_all_fields() {
        let artifact = sample_artifact();
        let record = RunRecord::success(Utc::now(), "/data/app.sqlite", &artifact, "s3://b/k");

        assert!(record.is_ok());
        assert_eq!(record.archive_size, 2048);
        assert_eq!(record.content_digest.len(), 64);
        assert_eq!(record.remote_id, "s3://b/k");
        assert!(record.message.is_empty());
    }

    #[test]
    fn test_failure_record_before_archive_stage() {
        let record = RunRecord::failure(Utc::now(), "/data/app.sqlite", None, "disk full");

        assert_eq!(record.status, RunStatus::Error);
        assert!(record.archive_path.is_empty());
        assert_eq!(record.archive_size, 0);
        assert!(record.content_digest.is_empty());
        assert!(record.remote_id.is_empty());
        assert_eq!(record.message, "disk full");
    }

    #[test]
    fn test_failure_record_keeps_fields_reached() {
        let artifact = sample_artifact();
        let record = RunRecord::failure(
            Utc::now(),
            "/data/app.sqlite",
            Some(&artifact),
            "upload refused",
        );

        assert_eq!(record.status, RunStatus::Error);
        assert_eq!(record.archive_path, artifact.path.display().to_string());
        assert_eq!(record.archive_size, 2048);
        assert!(record.remote_id.is_empty());
    }

    #[test]
    fn test_verdict_constructors() {
        let ok = IntegrityVerdict::valid(12);
        assert!(ok.is_valid);
        assert_eq!(ok.diagnostic_message, "ok");
        assert_eq!(ok.object_count, 12);

        let bad = IntegrityVerdict::invalid("database disk image is malformed");
        assert!(!bad.is_valid);
        assert_eq!(bad.object_count, 0);
    }
}
