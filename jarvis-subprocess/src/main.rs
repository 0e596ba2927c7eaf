use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use jarvis_subprocess::run_subprocess;

#[derive(Parser, Debug)]
#[command(name = "jarvis-subprocess")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Jarvis request server speaking JSON lines over stdin/stdout")]
struct Args {
    /// Load settings from a specific file instead of ~/.jarvis/settings.toml
    #[arg(long, value_name = "PATH")]
    settings_path: Option<PathBuf>,

    /// Use an in-memory calendar instead of Google Calendar
    #[arg(long)]
    offline: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup_tracing()?;
    let args = Args::parse();

    if let Err(e) = dotenv::dotenv() {
        warn!("Could not load .env file: {e}");
    }
    info!(
        "Subprocess startup: settings_path={:?}, offline={}",
        args.settings_path, args.offline
    );

    run_subprocess(args.settings_path, args.offline).await
}

/// Logs go to a file; stdout carries replies only.
fn setup_tracing() -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    let trace_dir = jarvis_core::settings::config::jarvis_home()?.join("trace");
    fs::create_dir_all(&trace_dir)?;

    let log_file = trace_dir.join("jarvis-subprocess.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(())
}
