// src/config.rs
// Runtime configuration for the EscalateAI backend
//
// All configuration is resolved once at startup from environment variables
// (optionally loaded from a .env file by main) and carried in an explicit
// struct. Nothing reads the environment after startup, so the core stays
// testable with injected configurations.
//
// Configuration (.env file):
// - OPENROUTER_API_KEY: OpenRouter credential (requests fail with 503 if unset)
// - OPENROUTER_MODEL_PRIMARY: first model to try (default: "openai/gpt-4o-mini")
// - OPENROUTER_MODEL_FALLBACK: tried when the primary is exhausted
//   (default: "meta-llama/llama-3.1-8b-instruct")
// - OPENROUTER_API_URL: chat-completions endpoint override
// - OPENROUTER_MAX_RETRIES: attempts per candidate model (default: 2)
// - ESCALATE_HTTP_REFERER / ESCALATE_APP_TITLE: OpenRouter attribution headers
// - ESCALATE_SERVICE_PORT: HTTP bind port (default: 8000)

use std::env;
use std::str::FromStr;

pub const DEFAULT_PRIMARY_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_FALLBACK_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub api_key: Option<String>,
    pub primary_model: String,
    pub fallback_model: String,
    pub api_url: String,
    pub http_referer: String,
    pub app_title: String,
    pub max_retries: u32,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            http_referer: "http://localhost:3000".to_string(),
            app_title: "EscalateAI".to_string(),
            max_retries: 2,
            port: 8000,
        }
    }
}

impl ServiceConfig {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        // An empty key counts as unconfigured.
        let api_key = env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        Self {
            api_key,
            primary_model: env::var("OPENROUTER_MODEL_PRIMARY")
                .unwrap_or(defaults.primary_model),
            fallback_model: env::var("OPENROUTER_MODEL_FALLBACK")
                .unwrap_or(defaults.fallback_model),
            api_url: env::var("OPENROUTER_API_URL").unwrap_or(defaults.api_url),
            http_referer: env::var("ESCALATE_HTTP_REFERER").unwrap_or(defaults.http_referer),
            app_title: env::var("ESCALATE_APP_TITLE").unwrap_or(defaults.app_title),
            max_retries: get_env_var("OPENROUTER_MAX_RETRIES", defaults.max_retries),
            port: get_env_var("ESCALATE_SERVICE_PORT", defaults.port),
        }
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Candidate models in priority order: primary first, then fallback.
    pub fn model_priority(&self) -> Vec<String> {
        vec![self.primary_model.clone(), self.fallback_model.clone()]
    }
}

// Helper function to read environment variables with default values
fn get_env_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value in {}, using default", name);
            default
        }),
        Err(_) => default,
    }
}
