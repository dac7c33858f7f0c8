use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crop_yield::artifacts::inspect_artifacts;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

/// Report which model artifact files are present in a directory.
#[derive(Parser, Debug)]
#[command(name = "artifact_status", version)]
struct Cli {
    /// Directory holding the model artifacts
    model_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let status = inspect_artifacts(&cli.model_path);
    let json = serde_json::to_string(&status).context("serializing artifact status")?;
    println!("{json}");

    if !status.model_available {
        warn!(missing = ?status.missing_files, "model artifacts incomplete");
        std::process::exit(1);
    }
    Ok(())
}
