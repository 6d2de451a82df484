//! # coffer-core
//!
//! Core library for the Coffer backup CLI providing:
//! - Flat JSON configuration loading and atomic persistence
//! - The run-level error taxonomy shared by all pipeline stages
//! - Run records, integrity verdicts, and source classification types

pub mod config;
pub mod error;
pub mod record;

pub use config::{BackupConfig, ConfigFile};
pub use error::{Error, Result};
pub use record::{ArchiveArtifact, IntegrityVerdict, RunRecord, RunStatus, SourceKind};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
