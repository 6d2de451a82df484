//! Zip archive creation with sanitized, time-stamped naming.
//!
//! A single-file source is stored at its base name; a directory source is
//! walked in full, every file stored at its path relative to the source
//! root. Name collisions within the same wall-clock second get a numeric
//! suffix instead of overwriting.

use chrono::Local;
use coffer_core::{Error, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Timestamp section of archive names
const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Reduces a base name to alphanumerics, hyphen, underscore, dot, and
/// space, then trims surrounding whitespace
pub fn sanitize_base_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Creates the archive for one run and returns its path.
///
/// The destination directory is created if absent. The archive is named
/// `backup-<base>-<YYYYMMDD-HHMMSS>.zip` where `<base>` is the sanitized
/// file stem (single file) or directory name (tree).
pub fn create_archive(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    if !source.exists() {
        return Err(Error::source_not_found(source.display().to_string()));
    }
    fs::create_dir_all(dest_dir)?;

    let raw_base = if source.is_file() {
        source.file_stem().and_then(|s| s.to_str()).unwrap_or("")
    } else {
        source.file_name().and_then(|s| s.to_str()).unwrap_or("")
    };
    let base = sanitize_base_name(raw_base);
    let stamp = Local::now().format(NAME_TIMESTAMP_FORMAT).to_string();

    let (file, archive_path) = create_unique(dest_dir, &base, &stamp)?;
    tracing::debug!("Writing archive {}", archive_path.display());

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    if source.is_file() {
        let file_name = source.file_name().unwrap_or(source.as_os_str());
        zip.start_file(entry_name(Path::new(file_name))?, options)
            .map_err(io::Error::other)?;
        let mut reader = File::open(source)?;
        io::copy(&mut reader, &mut zip)?;
    } else {
        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(source).map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Path escapes source root: {}", entry.path().display()),
                )
            })?;
            zip.start_file(entry_name(rel)?, options)
                .map_err(io::Error::other)?;
            let mut reader = File::open(entry.path())?;
            io::copy(&mut reader, &mut zip)?;
        }
    }

    zip.finish().map_err(io::Error::other)?;
    Ok(archive_path)
}

/// Opens the first free archive path for this base/stamp pair.
///
/// `create_new` makes the existence check and the create one atomic step,
/// so two runs landing on the same second cannot share a file.
fn create_unique(dest_dir: &Path, base: &str, stamp: &str) -> Result<(File, PathBuf)> {
    let mut attempt: u32 = 0;
    loop {
        let name = if attempt == 0 {
            format!("backup-{}-{}.zip", base, stamp)
        } else {
            format!("backup-{}-{}-{}.zip", base, stamp, attempt)
        };
        let path = dest_dir.join(name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

/// Converts a relative path into a forward-slash zip entry name
fn entry_name(rel: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Non-UTF-8 file name: {}", rel.display()),
            ))
        })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}
