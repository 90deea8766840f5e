use crypto_query_bot::{
    agent::{reply_or_fallback, Orchestrator},
    config::Settings,
    symbols::spawn_refresh_loop,
    telemetry::init_tracing,
    templates::WELCOME,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();
    let settings = Settings::from_env();
    init_tracing(&settings);
    settings.log_warnings();

    info!("Crypto Query Bot starting");

    let orchestrator = Arc::new(Orchestrator::connect(&settings).await?);

    if !orchestrator.symbols().refresh().await {
        warn!("Initial coin map refresh failed; price queries may fail until the next refresh");
    }
    if !settings.symbol_refresh_interval.is_zero() {
        spawn_refresh_loop(orchestrator.symbols().clone(), settings.symbol_refresh_interval);
        info!(
            every_secs = settings.symbol_refresh_interval.as_secs(),
            "Scheduled coin map refresh"
        );
    }

    println!("{}\n", WELCOME);

    // One task per message; replies print as they complete.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                if text == "/start" {
                    println!("{}\n", WELCOME);
                    continue;
                }

                let request_id = format!("cli_{}", chrono::Local::now().format("%H%M%S%3f"));
                info!("[{}] Processing new query. Content: '{}'", request_id, text);

                let orchestrator = orchestrator.clone();
                in_flight.spawn(async move { orchestrator.generate_reply(&text, &request_id).await });
            }
            Some(joined) = in_flight.join_next() => {
                println!("{}\n", reply_or_fallback(joined));
            }
        }
    }

    info!("Input closed, waiting for {} pending replies", in_flight.len());
    while let Some(joined) = in_flight.join_next().await {
        println!("{}\n", reply_or_fallback(joined));
    }

    Ok(())
}
