// src/lib.rs
// EscalateAI backend - complaint draft generation via OpenRouter
//
// Stateless single-endpoint service: POST /generate turns a structured
// complaint description into several draft messages by prompting an LLM
// provider, with model fallback and tolerant output parsing. GET /health
// reports the configured models and credential status.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod llm_client;
pub mod models;
pub mod prompt;

use config::ServiceConfig;
use llm_client::OpenRouterClient;

/// Maximum request payload size (64KB); the largest valid request is a few KB
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    pub config: ServiceConfig,
    pub llm: OpenRouterClient,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        let llm = OpenRouterClient::new(&config);
        Self { config, llm }
    }
}

/// Build the application router. Tests construct this directly with an
/// injected configuration instead of going through main.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Allow-all CORS, matching the original dev posture.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/generate", post(handlers::generate_handler))
        .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE))
        .layer(cors)
        .with_state(state)
}
