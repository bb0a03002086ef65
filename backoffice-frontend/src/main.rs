use backoffice_frontend::config::get_configuration;
use backoffice_frontend::startup::build_router;
use backoffice_frontend::AppState;
use integration_engine::Engine;
use service_core::observability::{init_metrics, init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing("backoffice-frontend", &configuration.telemetry);
    init_metrics().map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;

    let engine = Engine::new(configuration.engine.clone())
        .map_err(|e| anyhow::anyhow!("Failed to build the integration engine: {}", e))?;
    info!(
        api = %configuration.engine.api.base_url,
        access_model = ?configuration.engine.access.model,
        "Integration engine ready"
    );

    let state = AppState::new(engine, configuration.server.session_idle());
    let app = build_router(state, &configuration.server)?;

    let address = configuration.server.address();
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting backoffice-frontend on {}", address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
