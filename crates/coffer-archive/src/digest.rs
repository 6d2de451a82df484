//! Content digests for archive fingerprinting.

use coffer_core::Result;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Calculates the SHA-256 digest of a file.
///
/// Streams through a fixed-size copy buffer so peak memory stays bounded
/// regardless of file size. Returns the 64-character lowercase hex encoding.
pub fn digest_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;

    let hash = hasher.finalize();
    Ok(format!("{:x}", hash))
}

/// Content-digest strategy applied to finished archives.
///
/// The pipeline runs whichever implementation it is constructed with under
/// a blocking task; tests substitute failing implementations to exercise
/// failure containment at the digest stage.
pub trait Hasher: Send + Sync {
    /// Hex digest of the file at `path`
    fn digest(&self, path: &Path) -> Result<String>;
}

/// Streaming SHA-256, the production hasher
#[derive(Debug, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn digest(&self, path: &Path) -> Result<String> {
        digest_file(path)
    }
}
