use crypto_query_bot::{
    agent::Orchestrator, api::start_server, config::Settings, symbols::spawn_refresh_loop,
    telemetry::init_tracing,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();
    let settings = Settings::from_env();
    init_tracing(&settings);
    settings.log_warnings();

    info!("🚀 Crypto Query Bot - API Server");
    info!("📍 Port: {}", settings.api_port);

    let orchestrator = Arc::new(Orchestrator::connect(&settings).await?);

    if !orchestrator.symbols().refresh().await {
        warn!("⚠️  Coin map is empty; POST /api/symbols/refresh once the exchange is reachable");
    }
    if !settings.symbol_refresh_interval.is_zero() {
        spawn_refresh_loop(orchestrator.symbols().clone(), settings.symbol_refresh_interval);
    }

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    // Start API server
    start_server(orchestrator, settings.api_port).await?;

    Ok(())
}
