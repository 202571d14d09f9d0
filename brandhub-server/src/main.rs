use std::sync::Arc;

use anyhow::Result;
use brandhub_core::HubConfig;
use brandhub_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = HubConfig::from_env().snapshot();
    let state = Arc::new(AppState::from_config(&config)?);

    let host = config.get("http.host").unwrap_or("127.0.0.1");
    let port = config.get("http.port").unwrap_or("3030");
    let addr = format!("{host}:{port}");

    tracing::info!(
        brands = state.registry.list().len(),
        header = %state.settings.tenant_header,
        "starting brandhub"
    );

    brandhub_server::build(state).listen(addr).await?;

    Ok(())
}
