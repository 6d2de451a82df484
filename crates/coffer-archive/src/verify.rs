//! Database integrity verification behind source classification.

use coffer_core::{IntegrityVerdict, SourceKind};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::path::Path;

/// Runs the engine self-check when one exists for the path's kind.
///
/// Only SQLite sources are actively probed. Other recognized engines and
/// unrecognized paths return `None` rather than a fabricated pass. A check
/// that fails for any reason (corrupt file, locked file, unreadable path)
/// comes back as an invalid verdict, never an error.
pub async fn verify_source(path: &Path) -> Option<IntegrityVerdict> {
    match SourceKind::from_path(path) {
        SourceKind::Sqlite => Some(check_sqlite(path).await),
        kind if kind.is_recognized_database() => {
            tracing::debug!("No active check for {} source {}", kind, path.display());
            None
        }
        _ => None,
    }
}

async fn check_sqlite(path: &Path) -> IntegrityVerdict {
    match sqlite_self_check(path).await {
        Ok(verdict) => verdict,
        Err(e) => IntegrityVerdict::invalid(e.to_string()),
    }
}

/// Opens the database read-only, runs the engine's built-in consistency
/// check, and counts catalog objects
async fn sqlite_self_check(path: &Path) -> sqlx::Result<IntegrityVerdict> {
    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    let mut conn = options.connect().await?;

    let findings: Vec<(String,)> = sqlx::query_as("PRAGMA integrity_check")
        .fetch_all(&mut conn)
        .await?;
    let (object_count,): (i64,) = sqlx::query_as("SELECT count(*) FROM sqlite_master")
        .fetch_one(&mut conn)
        .await?;

    conn.close().await?;

    let diagnostic = findings
        .into_iter()
        .map(|(line,)| line)
        .collect::<Vec<_>>()
        .join("; ");

    if diagnostic == "ok" {
        Ok(IntegrityVerdict::valid(object_count))
    } else if diagnostic.is_empty() {
        Ok(IntegrityVerdict::invalid("integrity check returned no result"))
    } else {
        Ok(IntegrityVerdict {
            is_valid: false,
            diagnostic_message: diagnostic,
            object_count,
        })
    }
}
