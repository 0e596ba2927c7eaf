use anyhow::Context;
use jarvis_core::service::factory::create_service;
use jarvis_core::service::{AssistantService, ServiceRequest, ServiceResponse};
use jarvis_core::settings::manager::SettingsManager;
use std::path::PathBuf;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// Serve requests from stdin until it closes.
pub async fn run_subprocess(settings_path: Option<PathBuf>, offline: bool) -> anyhow::Result<()> {
    let settings_manager = match settings_path {
        Some(path) => SettingsManager::from_path(path)?,
        None => SettingsManager::new()?,
    };
    let mut settings = settings_manager.settings();
    settings.apply_process_env();

    let mut service = create_service(&settings, offline)?;
    info!(offline, "Subprocess ready");

    serve(&mut service, BufReader::new(io::stdin()), io::stdout()).await
}

/// One JSON request per input line, one JSON reply per output line, strictly
/// in order. Lines that are not valid requests get a failure reply.
pub async fn serve<R, W>(
    service: &mut AssistantService,
    reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ServiceRequest>(&line) {
            Ok(request) => service.handle(request).await,
            Err(e) => {
                warn!(?e, "Rejecting malformed request");
                ServiceResponse::failure(format!("Invalid request: {e}"))
            }
        };

        let json = serde_json::to_string(&response)?;
        let json = format!("{json}\n");
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
