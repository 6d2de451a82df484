//! Run command

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use coffer_core::ConfigFile;
use tracing::debug;

use crate::commands::build_pipeline;
use crate::output;

pub async fn run(config_path: Option<&Utf8Path>) -> Result<()> {
    output::header("Backup");

    let file = ConfigFile::load(config_path)?;
    debug!("Configuration loaded from {}", file.path);
    let config = file.config;

    if config.source_path.as_str().is_empty() {
        return Err(anyhow!(
            "No backup source configured. Run `coffer config set source_path <path>` first."
        ));
    }

    output::kv("Source", config.source_path.as_str());
    output::kv("Destination", config.local_dest.as_str());
    if config.upload_enabled() {
        output::kv("Bucket", &config.s3_bucket);
    } else {
        output::kv("Bucket", "(upload disabled)");
    }
    println!();

    let pipeline = build_pipeline(&config).await?;

    let spinner = output::spinner("Running backup...");
    let outcome = pipeline.run_once(&config).await;
    spinner.finish_and_clear();

    let record = outcome?;

    output::success(&format!("Backed up {}", record.source_path));
    output::kv("Archive", &record.archive_path);
    output::kv("Size", &output::format_bytes(record.archive_size));
    output::kv("SHA-256", &record.content_digest);
    if !record.remote_id.is_empty() {
        output::kv("Remote ID", &record.remote_id);
    }

    Ok(())
}
