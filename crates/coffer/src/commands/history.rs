//! History command

use anyhow::Result;
use coffer_engine::AuditLog;
use console::style;

use crate::cli::HistoryArgs;
use crate::output;

pub async fn run(args: HistoryArgs) -> Result<()> {
    let log = AuditLog::open_default()?;
    let records = log.tail(args.limit)?;

    if args.json {
        let json = serde_json::to_string_pretty(&records)?;
        println!("{}", json);
        return Ok(());
    }

    if records.is_empty() {
        output::info("No runs recorded yet");
        return Ok(());
    }

    output::header("Recent Runs");
    for record in &records {
        let glyph = if record.is_ok() {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        };
        let timestamp = record.timestamp.format("%Y-%m-%d %H:%M:%S");

        if record.is_ok() {
            let mut detail = output::format_bytes(record.archive_size);
            if !record.remote_id.is_empty() {
                detail = format!("{}  {}", detail, style(&record.remote_id).dim());
            }
            println!("{} {}  {}  {}", glyph, timestamp, record.source_path, detail);
        } else {
            println!(
                "{} {}  {}  {}",
                glyph,
                timestamp,
                record.source_path,
                style(&record.message).red()
            );
        }
    }

    println!();
    output::kv("Audit log", &log.path().display().to_string());
    Ok(())
}
