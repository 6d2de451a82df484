//! # coffer-archive
//!
//! Leaf stages of the backup pipeline:
//! - **Archiver**: deterministic, time-stamped zip archives from a file or
//!   directory tree
//! - **Content Hasher**: streaming SHA-256 fingerprints
//! - **Integrity Verifier**: SQLite self-checks behind a closed source
//!   classification

pub mod archive;
pub mod digest;
pub mod verify;

pub use archive::{create_archive, sanitize_base_name};
pub use digest::{digest_file, Hasher, Sha256Hasher};
pub use verify::verify_source;
