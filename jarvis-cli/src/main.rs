use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod formatter;
mod interactive_app;

use crate::interactive_app::InteractiveApp;

#[derive(Parser, Debug)]
#[command(name = "jarvis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Jarvis - chat assistant with calendar and task integration")]
struct Args {
    /// Load settings from a specific file instead of ~/.jarvis/settings.toml
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Use an in-memory calendar instead of Google Calendar
    #[arg(long)]
    offline: bool,
}

fn main() -> Result<()> {
    setup_tracing()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = dotenv::dotenv() {
        warn!("Could not load .env file: {e}");
    }

    info!(
        "CLI startup: settings={:?}, offline={}",
        args.settings, args.offline
    );

    let mut app = InteractiveApp::new(args.settings, args.offline)?;
    app.run().await
}

fn setup_tracing() -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    let trace_dir = jarvis_core::settings::config::jarvis_home()?.join("trace");
    fs::create_dir_all(&trace_dir)?;

    let log_file = trace_dir.join("jarvis.log");
    let file = std::fs::OpenOptions::new()
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
