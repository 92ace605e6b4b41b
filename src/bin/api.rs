use finance_query_agent::{api::start_server, config::api_port, AgentConfig, Orchestrator};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AgentConfig::from_env()?;
    let port = api_port()?;

    info!("🚀 Financial Query Agent - API Server");
    info!("📍 Port: {}", port);

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(orchestrator, port).await?;

    Ok(())
}
