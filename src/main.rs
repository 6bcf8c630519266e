// src/main.rs
// Main entry point for the EscalateAI backend

use std::sync::Arc;

use escalate_api::config::ServiceConfig;
use escalate_api::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServiceConfig::from_env();

    if !config.api_key_configured() {
        log::warn!("OPENROUTER_API_KEY not set. API will not work properly.");
    }
    log::info!(
        "Models: primary={} fallback={}",
        config.primary_model,
        config.fallback_model
    );

    let port = config.port;
    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("EscalateAI backend starting on {}", addr);
    println!("EscalateAI backend listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
