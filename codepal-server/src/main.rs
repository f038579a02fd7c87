use codepal_agent::AppConfig;
use codepal_server::{AppState, ServerConfig, build_service, run_server};
use codepal_telemetry::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loads `.env` before the log format is read.
    let config = AppConfig::from_env()?;
    let format = LogFormat::from_env().map_err(|e| anyhow::anyhow!(e))?;
    codepal_telemetry::init_logging("codepal-server", format).map_err(|e| anyhow::anyhow!("{e}"))?;
    tracing::info!(?config, "configuration loaded");

    let service = build_service(&config).await?;
    if let Some(max_idle) = config.session_idle_timeout {
        codepal_session::spawn_idle_sweeper(service.orchestrator().memory(), max_idle);
    }
    run_server(ServerConfig { bind_addr: config.bind_addr.clone() }, AppState::new(service)).await
}
