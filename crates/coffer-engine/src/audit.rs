//! Append-only audit trail of backup runs.
//!
//! One delimited line per run, a header written lazily on first use.
//! Appends hold an exclusive file lock and fsync before returning, so a
//! manual run and a scheduled run landing together can never interleave
//! lines, and a crash between runs never loses a persisted record.

use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use fs4::fs_std::FileExt;

use coffer_core::config::coffer_home;
use coffer_core::{Error, Result, RunRecord, RunStatus};

/// Column order for audit rows, written once when the file is created
const HEADER: &str = "timestamp,source,archive_path,archive_size,checksum,remote_id,status,message";

/// Header written by pre-1.0 releases; still accepted on read
const LEGACY_HEADER_PREFIX: &str = "date_time,";

/// Timestamp format used in audit rows
const ROW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp shape written by pre-1.0 releases (ISO 8601 `T` separator)
const LEGACY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// File name of the audit log under the coffer home directory
pub const AUDIT_FILE_NAME: &str = "backup_log.csv";

/// The run ledger: every pipeline invocation appends exactly one row here
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    /// Audit log at the default location (`~/.coffer/backup_log.csv`)
    pub fn open_default() -> Result<Self> {
        let log_path = coffer_home()?.join(AUDIT_FILE_NAME).into_std_path_buf();
        Ok(Self { log_path })
    }

    /// Audit log at a custom path
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Append one run record (atomic, file-locked, flushed to disk)
    pub fn append(&self, record: &RunRecord) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        // Exclusive lock (released on drop) serializes appends across
        // processes as well as tasks.
        file.lock_exclusive()?;

        // Lazy header: written exactly once, while the file is still empty.
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", HEADER)?;
        }

        writeln!(file, "{}", format_row(record))?;
        file.sync_all()?; // Ensure durability

        Ok(())
    }

    /// All records in append order. A missing file reads as empty history.
    pub fn read_all(&self) -> Result<Vec<RunRecord>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let mut content = String::new();
        fs::File::open(&self.log_path)?.read_to_string(&mut content)?;

        let mut records = Vec::new();
        for (index, row) in split_rows(&content).into_iter().enumerate() {
            if index == 0 && is_header(&row) {
                continue;
            }
            records.push(parse_row(&row)?);
        }

        Ok(records)
    }

    /// The most recent `limit` records, oldest first
    pub fn tail(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut records = self.read_all()?;
        if records.len() > limit {
            records = records.split_off(records.len() - limit);
        }
        Ok(records)
    }
}

fn is_header(row: &str) -> bool {
    row == HEADER || row.starts_with(LEGACY_HEADER_PREFIX)
}

fn format_row(record: &RunRecord) -> String {
    [
        record.timestamp.format(ROW_TIME_FORMAT).to_string(),
        escape_field(&record.source_path),
        escape_field(&record.archive_path),
        record.archive_size.to_string(),
        escape_field(&record.content_digest),
        escape_field(&record.remote_id),
        record.status.to_string(),
        escape_field(&record.message),
    ]
    .join(",")
}

/// Quote a field when it contains the delimiter, a quote, or a line break.
/// Inner quotes are doubled. Everything else passes through unchanged, so
/// files written without quoting still parse.
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Split file content into logical rows. Quoted fields may span line
/// breaks, so rows cannot be cut on raw newlines alone.
fn split_rows(content: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in content.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '\n' if !in_quotes => {
                let mut row = std::mem::take(&mut current);
                if row.ends_with('\r') {
                    row.pop();
                }
                if !row.trim().is_empty() {
                    rows.push(row);
                }
            }
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() {
        rows.push(current);
    }

    rows
}

/// Split one row into unescaped fields
fn split_fields(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = row.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' if current.is_empty() => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }
    fields.push(current);

    fields
}

fn parse_row(row: &str) -> Result<RunRecord> {
    let fields = split_fields(row);
    if fields.len() != 8 {
        return Err(Error::malformed_record(format!(
            "expected 8 fields, found {}",
            fields.len()
        )));
    }

    let timestamp = NaiveDateTime::parse_from_str(&fields[0], ROW_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(&fields[0], LEGACY_TIME_FORMAT))
        .map_err(|e| Error::malformed_record(format!("bad timestamp '{}': {}", fields[0], e)))?
        .and_utc();

    // Error rows from pre-1.0 releases leave the size blank
    let archive_size = if fields[3].is_empty() {
        0
    } else {
        fields[3]
            .parse::<u64>()
            .map_err(|e| Error::malformed_record(format!("bad size '{}': {}", fields[3], e)))?
    };

    let status: RunStatus = fields[6].parse()?;

    Ok(RunRecord {
        timestamp,
        source_path: fields[1].clone(),
        archive_path: fields[2].clone(),
        archive_size,
        content_digest: fields[4].clone(),
        remote_id: fields[5].clone(),
        status,
        message: fields[7].clone(),
    })
}
