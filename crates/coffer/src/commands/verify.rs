//! Verify command

use anyhow::{anyhow, Result};
use coffer_archive::verify_source;

use crate::cli::VerifyArgs;
use crate::output;

pub async fn run(args: VerifyArgs) -> Result<()> {
    if !args.path.exists() {
        return Err(anyhow!("Source not found: {}", args.path));
    }

    let spinner = output::spinner("Checking integrity...");
    let verdict = verify_source(args.path.as_std_path()).await;
    spinner.finish_and_clear();

    match verdict {
        Some(v) if v.is_valid => {
            output::success(&format!("{} passed its integrity check", args.path));
            output::kv("Objects", &v.object_count.to_string());
            Ok(())
        }
        Some(v) => {
            output::error(&format!("{} failed its integrity check", args.path));
            output::kv("Diagnostic", &v.diagnostic_message);
            std::process::exit(1);
        }
        None => {
            output::info(&format!(
                "No integrity check applies to {}; it would be archived as-is",
                args.path
            ));
            Ok(())
        }
    }
}
