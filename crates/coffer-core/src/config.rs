//! Flat JSON configuration loading and atomic persistence

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Default recurrence interval in minutes
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;

/// Configuration file name under the coffer home directory
const CONFIG_FILE_NAME: &str = "config.json";

/// Persisted backup configuration (flat key-value document)
///
/// Every field has a default so partial documents load. Empty strings mean
/// "unset" for the remote-store and webhook keys, matching the on-disk shape
/// of documents written by earlier versions. `drive_folder_id` is accepted
/// as a legacy alias for `remote_prefix`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// File or directory to back up
    pub source_path: Utf8PathBuf,

    /// Directory receiving archives; created on demand
    pub local_dest: Utf8PathBuf,

    /// Key prefix (folder) inside the remote store
    #[serde(alias = "drive_folder_id")]
    pub remote_prefix: String,

    /// Remote store bucket; empty disables the upload stage
    pub s3_bucket: String,

    /// Remote store region
    pub s3_region: String,

    /// Custom endpoint for S3-compatible stores
    pub s3_endpoint: String,

    /// Webhook receiving run events; empty disables notification
    pub webhook_url: String,

    /// Recurrence interval in minutes (coerced to a minimum of 1 at
    /// schedule time)
    pub interval_minutes: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            source_path: Utf8PathBuf::new(),
            local_dest: default_local_dest(),
            remote_prefix: String::new(),
            s3_bucket: String::new(),
            s3_region: String::new(),
            s3_endpoint: String::new(),
            webhook_url: String::new(),
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
        }
    }
}

impl BackupConfig {
    /// Effective recurrence interval, never below one minute
    pub fn effective_interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1).saturating_mul(60))
    }

    /// Whether the upload stage is enabled
    pub fn upload_enabled(&self) -> bool {
        !self.s3_bucket.is_empty()
    }

    /// Whether run events should be published to a webhook
    pub fn notify_enabled(&self) -> bool {
        !self.webhook_url.is_empty()
    }
}

/// Default archive destination: `backups/` under the working directory
fn default_local_dest() -> Utf8PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .map(|p| p.join("backups"))
        .unwrap_or_else(|| Utf8PathBuf::from("backups"))
}

/// Resolve the coffer home directory (~/.coffer)
///
/// Prefers the HOME environment variable over dirs::home_dir() so container
/// setups that remap the home directory keep working.
pub fn coffer_home() -> Result<Utf8PathBuf> {
    let home = match std::env::var("HOME") {
        Ok(home) => std::path::PathBuf::from(home),
        Err(_) => dirs::home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?,
    };
    let home = Utf8PathBuf::from_path_buf(home)
        .map_err(|_| Error::invalid_config("Home directory path is not valid UTF-8"))?;
    Ok(home.join(".coffer"))
}

/// A configuration document bound to its on-disk location
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// The parsed configuration
    pub config: BackupConfig,

    /// Path to the configuration file
    pub path: Utf8PathBuf,
}

impl ConfigFile {
    /// Default configuration location (~/.coffer/config.json)
    pub fn default_path() -> Result<Utf8PathBuf> {
        Ok(coffer_home()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the specified path or the default location.
    ///
    /// A missing file is not an error: built-in defaults are returned and
    /// the resolved path is kept for a later `save`.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_owned(),
            None => Self::default_path()?,
        };

        let config = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BackupConfig::default(),
            Err(e) => return Err(Error::Io(e)),
        };

        Ok(Self { config, path })
    }

    /// Whether the backing file exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Persist the configuration atomically (temp file + rename)
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.config)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content + "\n")?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Update a single key from its textual value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "source_path" => self.config.source_path = Utf8PathBuf::from(value),
            "local_dest" => self.config.local_dest = Utf8PathBuf::from(value),
            "remote_prefix" | "drive_folder_id" => self.config.remote_prefix = value.to_string(),
            "s3_bucket" => self.config.s3_bucket = value.to_string(),
            "s3_region" => self.config.s3_region = value.to_string(),
            "s3_endpoint" => self.config.s3_endpoint = value.to_string(),
            "webhook_url" => self.config.webhook_url = value.to_string(),
            "interval_minutes" => {
                self.config.interval_minutes = value.parse().map_err(|_| {
                    Error::invalid_config(format!(
                        "interval_minutes must be a non-negative integer, got '{}'",
                        value
                    ))
                })?;
            }
            _ => return Err(Error::unknown_config_key(key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_coffer_home_prefers_home_env() {
        let original = env::var("HOME").ok();
        env::set_var("HOME", "/srv/backup-operator");

        let home = coffer_home().unwrap();
        assert_eq!(home, Utf8PathBuf::from("/srv/backup-operator/.coffer"));

        match original {
            Some(value) => env::set_var("HOME", value),
            None => env::remove_var("HOME"),
        }
    }

    #[test]
    #[serial]
    fn test_default_config_path_under_coffer_home() {
        let original = env::var("HOME").ok();
        env::set_var("HOME", "/srv/backup-operator");

        let path = ConfigFile::default_path().unwrap();
        assert_eq!(
            path,
            Utf8PathBuf::from("/srv/backup-operator/.coffer/config.json")
        );

        match original {
            Some(value) => env::set_var("HOME", value),
            None => env::remove_var("HOME"),
        }
    }

    #[test]
    fn test_defaults_when_file_absent() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("config.json")).unwrap();

        let file = ConfigFile::load(Some(path.as_path())).unwrap();
        assert!(!file.exists());
        assert_eq!(file.config.interval_minutes, DEFAULT_INTERVAL_MINUTES);
        assert_eq!(file.config.source_path, Utf8PathBuf::new());
        assert!(file.config.s3_bucket.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("config.json")).unwrap();

        let mut file = ConfigFile::load(Some(path.as_path())).unwrap();
        file.config.source_path = Utf8PathBuf::from("/data/app.sqlite");
        file.config.s3_bucket = "backups".to_string();
        file.config.interval_minutes = 30;
        file.save().unwrap();

        let reloaded = ConfigFile::load(Some(path.as_path())).unwrap();
        assert_eq!(reloaded.config, file.config);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path =
            Utf8PathBuf::from_path_buf(temp_dir.path().join("nested/dir/config.json")).unwrap();

        let file = ConfigFile::load(Some(path.as_path())).unwrap();
        file.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("config.json")).unwrap();
        std::fs::write(&path, r#"{"source_path": "/srv/db.sqlite"}"#).unwrap();

        let file = ConfigFile::load(Some(path.as_path())).unwrap();
        assert_eq!(file.config.source_path, Utf8PathBuf::from("/srv/db.sqlite"));
        assert_eq!(file.config.interval_minutes, DEFAULT_INTERVAL_MINUTES);
    }

    #[test]
    fn test_legacy_drive_folder_id_alias() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("config.json")).unwrap();
        std::fs::write(&path, r#"{"drive_folder_id": "archive-folder"}"#).unwrap();

        let file = ConfigFile::load(Some(path.as_path())).unwrap();
        assert_eq!(file.config.remote_prefix, "archive-folder");
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("config.json")).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let result = ConfigFile::load(Some(path.as_path()));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            matches!(err, Error::JsonParse(_)),
            "Expected JsonParse, got: {:?}",
            err
        );
    }

    #[test]
    fn test_set_known_keys() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("config.json")).unwrap();

        let mut file = ConfigFile::load(Some(path.as_path())).unwrap();
        file.set("source_path", "/data/app.sqlite").unwrap();
        file.set("drive_folder_id", "legacy-prefix").unwrap();
        file.set("interval_minutes", "45").unwrap();

        assert_eq!(file.config.source_path, Utf8PathBuf::from("/data/app.sqlite"));
        assert_eq!(file.config.remote_prefix, "legacy-prefix");
        assert_eq!(file.config.interval_minutes, 45);
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("config.json")).unwrap();

        let mut file = ConfigFile::load(Some(path.as_path())).unwrap();
        let err = file.set("no_such_key", "x").unwrap_err();
        assert!(
            matches!(err, Error::UnknownConfigKey { .. }),
            "Expected UnknownConfigKey, got: {:?}",
            err
        );
    }

    #[test]
    fn test_set_rejects_non_numeric_interval() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("config.json")).unwrap();

        let mut file = ConfigFile::load(Some(path.as_path())).unwrap();
        let err = file.set("interval_minutes", "soon").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_effective_interval_coerces_zero_to_one_minute() {
        let config = BackupConfig {
            interval_minutes: 0,
            ..BackupConfig::default()
        };
        assert_eq!(config.effective_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_effective_interval_regular_value() {
        let config = BackupConfig {
            interval_minutes: 30,
            ..BackupConfig::default()
        };
        assert_eq!(config.effective_interval(), Duration::from_secs(1800));
    }

    #[test]
    fn test_effective_interval_saturates_instead_of_overflowing() {
        let config = BackupConfig {
            interval_minutes: u64::MAX,
            ..BackupConfig::default()
        };
        assert_eq!(config.effective_interval(), Duration::from_secs(u64::MAX));
    }
}
