//! Archive upload to a remote object store.
//!
//! Supports AWS S3 and S3-compatible storage (MinIO, Wasabi, DigitalOcean
//! Spaces). Credential discovery and refresh follow the SDK's default
//! provider chain, so an expired session is retried transparently.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use coffer_core::{BackupConfig, Error, Result};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Capability interface for the upload stage
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Uploads the archive and returns its remote identifier
    async fn upload(&self, archive: &Path) -> Result<String>;
}

/// Uploader backed by an S3 bucket
pub struct S3Uploader {
    /// S3 client
    client: Client,
    /// Bucket name
    bucket: String,
    /// Key prefix for archives
    prefix: String,
}

impl S3Uploader {
    /// Create an uploader with explicit parameters
    pub async fn new(
        bucket: impl Into<String>,
        region: Option<&str>,
        endpoint: Option<&str>,
        prefix: impl Into<String>,
    ) -> Result<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(Error::invalid_config("s3_bucket is not configured"));
        }

        let client = create_client(region, endpoint).await;
        Ok(Self {
            client,
            bucket,
            prefix: prefix.into(),
        })
    }

    /// Create an uploader from the persisted configuration
    pub async fn from_config(config: &BackupConfig) -> Result<Self> {
        let region = match config.s3_region.as_str() {
            "" => None,
            region => Some(region),
        };
        let endpoint = match config.s3_endpoint.as_str() {
            "" => None,
            endpoint => Some(endpoint),
        };
        Self::new(
            config.s3_bucket.clone(),
            region,
            endpoint,
            config.remote_prefix.clone(),
        )
        .await
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Create an S3 client with an optional region and endpoint
async fn create_client(region: Option<&str>, endpoint: Option<&str>) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    let sdk_config = loader.load().await;

    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

    // Configure custom endpoint for S3-compatible storage
    if let Some(endpoint_url) = endpoint {
        debug!("Using custom S3 endpoint: {}", endpoint_url);
        s3_config_builder = s3_config_builder
            .endpoint_url(endpoint_url)
            .force_path_style(true); // Required for MinIO and many S3-compatible services
    }

    Client::from_conf(s3_config_builder.build())
}

/// Build the object key for an archive file name under a prefix
fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, archive: &Path) -> Result<String> {
        let file_name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::upload_failure(format!(
                    "Archive path has no usable file name: {}",
                    archive.display()
                ))
            })?;
        let key = object_key(&self.prefix, file_name);

        let body = ByteStream::from_path(archive).await.map_err(|e| {
            Error::upload_failure(format!("Failed to read {}: {}", archive.display(), e))
        })?;

        debug!("Uploading archive to s3://{}/{}", self.bucket, key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .content_type("application/zip")
            .send()
            .await
            .map_err(|e| {
                Error::upload_failure(format!(
                    "put_object s3://{}/{}: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        let remote_id = format!("s3://{}/{}", self.bucket, key);
        info!("Uploaded archive to {}", remote_id);
        Ok(remote_id)
    }
}

impl fmt::Debug for S3Uploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Uploader")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Uploader used when no bucket is configured; runs keep an empty remote id
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpUploader;

#[async_trait]
impl Uploader for NoOpUploader {
    async fn upload(&self, archive: &Path) -> Result<String> {
        debug!(
            "Uploads disabled, keeping {} local only",
            archive.display()
        );
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_without_prefix() {
        assert_eq!(object_key("", "backup-a.zip"), "backup-a.zip");
    }

    #[test]
    fn test_object_key_with_prefix() {
        assert_eq!(
            object_key("nightly", "backup-a.zip"),
            "nightly/backup-a.zip"
        );
    }

    #[test]
    fn test_object_key_trims_prefix_slashes() {
        assert_eq!(
            object_key("/archives/app/", "backup-a.zip"),
            "archives/app/backup-a.zip"
        );
    }

    #[tokio::test]
    async fn test_empty_bucket_is_rejected() {
        let config = BackupConfig::default();
        let result = S3Uploader::from_config(&config).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidConfig { .. }
        ));
    }

    #[tokio::test]
    async fn test_noop_uploader_returns_empty_id() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let archive = temp_dir.path().join("backup-x.zip");
        std::fs::write(&archive, b"zip").unwrap();

        let remote_id = NoOpUploader.upload(&archive).await.unwrap();
        assert!(remote_id.is_empty());
    }
}
