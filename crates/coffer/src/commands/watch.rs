//! Watch command

use std::sync::Arc;

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use coffer_core::ConfigFile;
use coffer_engine::Scheduler;

use crate::commands::build_pipeline;
use crate::output;

pub async fn run(config_path: Option<&Utf8Path>) -> Result<()> {
    let file = ConfigFile::load(config_path)?;
    let config = file.config;

    if config.source_path.as_str().is_empty() {
        return Err(anyhow!(
            "No backup source configured. Run `coffer config set source_path <path>` first."
        ));
    }

    output::header("Watch");
    output::kv("Source", config.source_path.as_str());
    output::kv(
        "Interval",
        &format!("{} minute(s)", config.interval_minutes.max(1)),
    );
    if !config.upload_enabled() {
        output::warning("Upload disabled (s3_bucket is unset); archives stay local");
    }
    println!();
    output::info("First backup starts immediately. Press Ctrl-C to stop.");

    let pipeline = Arc::new(build_pipeline(&config).await?);
    let mut scheduler = Scheduler::new(pipeline);
    scheduler.start(config).await;

    tokio::signal::ctrl_c().await?;
    println!();

    let spinner = output::spinner("Waiting for the current run to finish...");
    scheduler.stop().await;
    spinner.finish_and_clear();
    output::success("Schedule stopped");

    Ok(())
}
