//! Config command

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use coffer_core::{BackupConfig, ConfigFile};

use crate::cli::{ConfigCommands, ConfigInitArgs, ConfigSetArgs, ConfigShowArgs};
use crate::output;

pub async fn run(cmd: ConfigCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Init(args) => init(args, config_path),
        ConfigCommands::Show(args) => show(args, config_path),
        ConfigCommands::Set(args) => set(args, config_path),
        ConfigCommands::Path => path(config_path),
    }
}

fn init(args: ConfigInitArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let path = resolve_path(config_path)?;

    // Checked before load so --force also replaces an unparseable file
    if path.exists() && !args.force {
        return Err(anyhow!(
            "File {} already exists. Use --force to overwrite.",
            path
        ));
    }

    let file = ConfigFile {
        config: BackupConfig::default(),
        path,
    };
    file.save()?;

    output::success(&format!("Created {}", file.path));
    output::info("Set the backup source with `coffer config set source_path <path>`");
    Ok(())
}

fn show(args: ConfigShowArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let file = ConfigFile::load(config_path)?;

    if args.json {
        let json = serde_json::to_string_pretty(&file.config)?;
        println!("{}", json);
        return Ok(());
    }

    output::header("Configuration");
    output::kv("source_path", display(file.config.source_path.as_str()));
    output::kv("local_dest", display(file.config.local_dest.as_str()));
    output::kv("remote_prefix", display(&file.config.remote_prefix));
    output::kv("s3_bucket", display(&file.config.s3_bucket));
    output::kv("s3_region", display(&file.config.s3_region));
    output::kv("s3_endpoint", display(&file.config.s3_endpoint));
    output::kv("webhook_url", display(&file.config.webhook_url));
    output::kv(
        "interval_minutes",
        &file.config.interval_minutes.to_string(),
    );

    if !file.exists() {
        println!();
        output::info("No file on disk yet; showing built-in defaults");
    }
    Ok(())
}

fn set(args: ConfigSetArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let mut file = ConfigFile::load(config_path)?;
    file.set(&args.key, &args.value)?;
    file.save()?;

    output::success(&format!("Set {} = {}", args.key, args.value));
    Ok(())
}

fn path(config_path: Option<&Utf8Path>) -> Result<()> {
    println!("{}", resolve_path(config_path)?);
    Ok(())
}

fn resolve_path(config_path: Option<&Utf8Path>) -> Result<camino::Utf8PathBuf> {
    Ok(match config_path {
        Some(p) => p.to_owned(),
        None => ConfigFile::default_path()?,
    })
}

fn display(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}
