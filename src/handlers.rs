// src/handlers.rs
// HTTP handlers: GET /health and POST /generate
//
// /generate is the request orchestrator: validate, compute placeholders,
// compile the prompt, gate on the credential, call the model gateway, then
// fill defaults for anything the model left out and assemble the response.
// Every log line carries the per-request id for correlation.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::llm_client::LlmError;
use crate::models::{required_placeholders, GenerateRequest, GenerateResponse};
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};
use crate::AppState;

const DEFAULT_TIPS: [&str; 2] = [
    "Review the message before sending.",
    "Keep proof documents ready (screenshots, receipts, emails).",
];

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub api_key_configured: bool,
}

/// GET /health - configuration snapshot, no side effects
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        primary_model: state.config.primary_model.clone(),
        fallback_model: state.config.fallback_model.clone(),
        api_key_configured: state.config.api_key_configured(),
    })
}

/// POST /generate - produce complaint drafts for a validated request
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    request.validate()?;

    let request_id = Uuid::new_v4().to_string();
    let title_preview: String = request.title.chars().take(60).collect();
    log::info!(
        "[{}] category={} tone={} title={}",
        request_id,
        request.category.as_str(),
        request.tone.as_str(),
        title_preview
    );

    let placeholders = required_placeholders(&request);
    let user_prompt = build_user_prompt(&request);

    if !state.config.api_key_configured() {
        log::warn!("[{}] OPENROUTER_API_KEY not configured, rejecting", request_id);
        return Err(ApiError::NotConfigured);
    }

    let models = state.config.model_priority();
    let parsed = state
        .llm
        .generate(&request_id, SYSTEM_PROMPT, &user_prompt, &models)
        .await
        .map_err(|err| match err {
            LlmError::MissingApiKey => ApiError::NotConfigured,
            err => {
                log::error!("[{}] All models failed. Last error: {}", request_id, err);
                ApiError::Upstream
            }
        })?;

    log::info!("[{}] Generated successfully", request_id);
    Ok(Json(assemble_response(request_id, &request, parsed, placeholders)))
}

/// Build the final response, substituting fixed defaults for any text field
/// the model omitted and coercing `tips` into a list of strings.
pub fn assemble_response(
    request_id: String,
    request: &GenerateRequest,
    parsed: Map<String, Value>,
    required_placeholders: Vec<String>,
) -> GenerateResponse {
    GenerateResponse {
        whatsapp_message: text_field(&parsed, "whatsapp_message", || {
            "No message generated".to_string()
        }),
        email_subject: text_field(&parsed, "email_subject", || {
            format!("Complaint Regarding: {}", request.title)
        }),
        email_body: text_field(&parsed, "email_body", || {
            "No email body generated".to_string()
        }),
        escalation_subject: text_field(&parsed, "escalation_subject", || {
            format!("Escalation: {}", request.title)
        }),
        escalation_body: text_field(&parsed, "escalation_body", || {
            "No escalation body generated".to_string()
        }),
        followup_message: text_field(&parsed, "followup_message", || {
            "No follow-up message generated".to_string()
        }),
        tips: coerce_tips(parsed.get("tips")),
        request_id,
        required_placeholders,
    }
}

fn text_field(parsed: &Map<String, Value>, key: &str, default: impl FnOnce() -> String) -> String {
    match parsed.get(key) {
        Some(Value::String(s)) => s.clone(),
        // The provider contract says string, but the output is untrusted;
        // render anything else in its JSON form rather than failing.
        Some(other) => other.to_string(),
        None => default(),
    }
}

fn coerce_tips(value: Option<&Value>) -> Vec<String> {
    match value {
        None => DEFAULT_TIPS.iter().map(|tip| tip.to_string()).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        // Scalars: empty/falsy values yield no tips, anything else becomes
        // a single-element list of its string form.
        Some(Value::Null) | Some(Value::Bool(false)) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(other) => vec![other.to_string()],
    }
}
