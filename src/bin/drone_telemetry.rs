// drone_telemetry - print one telemetry record per survey drone media file

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use drone_telemetry::extract_path;

#[derive(Parser)]
#[command(
    name = "drone_telemetry",
    version,
    about = "Extract flight/camera telemetry from survey drone media files"
)]
struct Args {
    /// Media files to process (.jpg/.jpeg/.mp4/.mov; other extensions yield
    /// identity fields only)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Pretty-print the JSON records
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut failures = 0usize;
    for path in &args.files {
        match extract_path(path) {
            Ok(record) => {
                let json = if args.pretty {
                    serde_json::to_string_pretty(&record)?
                } else {
                    serde_json::to_string(&record)?
                };
                println!("{}", json);
            }
            Err(e) => {
                // One bad file never stops the batch
                error!("skipping {}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        info!("{}/{} files skipped as unreadable", failures, args.files.len());
        if failures == args.files.len() {
            anyhow::bail!("no files could be read ({} attempted)", failures);
        }
    }
    Ok(())
}
