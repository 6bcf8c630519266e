// src/llm_client.rs
// Model gateway: OpenRouter chat-completions client with ordered model
// fallback, per-candidate retry with exponential backoff, and tolerant
// extraction of the JSON object embedded in free-form model output.
//
// Retry policy: each candidate model gets up to `max_retries` attempts with
// delays of 0.8s doubling per attempt, capped at 6s. No sleep follows the
// final attempt of a candidate; the loop moves straight to the next model.
// Only after every candidate is exhausted does the call fail, carrying the
// last underlying cause.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::ServiceConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const INITIAL_BACKOFF: Duration = Duration::from_millis(800);
const MAX_BACKOFF: Duration = Duration::from_secs(6);
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum LlmError {
    /// Configuration error: reported immediately, never retried.
    #[error("OpenRouter API key is not configured")]
    MissingApiKey,

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("failed to parse model output: {0}")]
    Parse(String),

    /// Every (candidate, attempt) pair failed; wraps the last cause.
    #[error("all candidate models exhausted (last error: {0})")]
    Exhausted(#[source] Box<LlmError>),
}

/// Extract the first JSON object embedded in model output.
///
/// Tolerates surrounding prose and ``` / ```json fences: strips a leading
/// fence marker (with optional "json" tag) and a trailing fence, then parses
/// everything between the first `{` and the last `}` inclusive.
pub fn extract_json(text: &str) -> Result<Map<String, Value>, LlmError> {
    let mut t = text.trim();

    if let Some(rest) = t.strip_prefix("```") {
        let mut rest = rest.trim_start();
        if rest
            .get(..4)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
        {
            rest = rest[4..].trim_start();
        }
        t = rest;
    }
    if let Some(rest) = t.trim_end().strip_suffix("```") {
        t = rest.trim_end();
    }

    let (start, end) = match (t.find('{'), t.rfind('}')) {
        (Some(start), Some(end)) if end > start => (start, end),
        _ => {
            return Err(LlmError::Parse(
                "no JSON object found in model output".to_string(),
            ))
        }
    };

    let value: Value = serde_json::from_str(&t[start..=end])
        .map_err(|e| LlmError::Parse(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(LlmError::Parse(
            "model output is not a JSON object".to_string(),
        )),
    }
}

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    http_referer: String,
    app_title: String,
    max_retries: u32,
}

impl OpenRouterClient {
    pub fn new(config: &ServiceConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            http_referer: config.http_referer.clone(),
            app_title: config.app_title.clone(),
            max_retries: config.max_retries.max(1),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run the compiled prompt through the candidate models in priority
    /// order and return the parsed JSON mapping from the first success.
    pub async fn generate(
        &self,
        request_id: &str,
        system_prompt: &str,
        user_prompt: &str,
        models: &[String],
    ) -> Result<Map<String, Value>, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let mut last_err = LlmError::Parse("no candidate models supplied".to_string());
        for model in models {
            log::info!("[{}] Trying model={}", request_id, model);
            match self
                .try_model(api_key, model, system_prompt, user_prompt)
                .await
            {
                Ok(parsed) => {
                    log::info!("[{}] Model succeeded model={}", request_id, model);
                    return Ok(parsed);
                }
                Err(err) => {
                    log::warn!("[{}] Model failed model={}: {}", request_id, model, err);
                    last_err = err;
                }
            }
        }

        Err(LlmError::Exhausted(Box::new(last_err)))
    }

    /// Retry loop for a single candidate model.
    async fn try_model(
        &self,
        api_key: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Map<String, Value>, LlmError> {
        let mut policy = retry_policy();
        let mut last_err = None;

        for attempt in 1..=self.max_retries {
            match self
                .execute_request(api_key, model, system_prompt, user_prompt)
                .await
            {
                Ok(parsed) => return Ok(parsed),
                Err(err) => {
                    log::warn!(
                        "OpenRouter call failed (attempt {}/{}) model={}: {}",
                        attempt,
                        self.max_retries,
                        model,
                        err
                    );
                    last_err = Some(err);

                    // Sleep only when another attempt for this model follows.
                    if attempt < self.max_retries {
                        let delay = policy.next_backoff().unwrap_or(MAX_BACKOFF);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| LlmError::Parse("no attempts made".to_string())))
    }

    // One attempt: HTTP round trip plus tolerant extraction. A parse
    // failure counts as an attempt failure, same as a transport failure.
    async fn execute_request(
        &self,
        api_key: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Map<String, Value>, LlmError> {
        let request_body = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            // Optional attribution headers recommended by OpenRouter
            .header("HTTP-Referer", &self.http_referer)
            .header("X-Title", &self.app_title)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Network(format!("request timed out: {}", err))
                } else if err.is_connect() {
                    LlmError::Network(format!("connection failed: {}", err))
                } else {
                    LlmError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(800).collect();
            log::error!("OpenRouter HTTP {}: {}", status.as_u16(), body);
            return Err(LlmError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| LlmError::Parse(format!("malformed provider response: {}", err)))?;

        let content = data
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| LlmError::Parse("no choices returned in response".to_string()))?;

        extract_json(content)
    }
}

fn retry_policy() -> ExponentialBackoff {
    // The delay sequence is contractual (0.8s, 1.6s, ... capped at 6s),
    // so randomization is disabled.
    ExponentialBackoffBuilder::new()
        .with_initial_interval(INITIAL_BACKOFF)
        .with_max_interval(MAX_BACKOFF)
        .with_multiplier(2.0)
        .with_randomization_factor(0.0)
        .with_max_elapsed_time(None)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_extract_json_fence_agnostic() {
        let expected = serde_json::json!({"a": 1});
        let expected = expected.as_object().unwrap();

        let fenced = "```json\n{\"a\":1}\n```";
        let prosed = "Sure! {\"a\":1}";
        let bare = "{\"a\":1}";
        for input in [fenced, prosed, bare] {
            assert_eq!(&extract_json(input).unwrap(), expected, "input: {input}");
        }
    }

    #[test]
    fn test_extract_json_untagged_fence_and_trailing_prose() {
        let input = "```\n{\"key\": \"value\"}\n```\nHope this helps!";
        // The trailing prose sits after the fence, but the last `}` is still
        // inside the object, so extraction succeeds.
        let map = extract_json(input).unwrap();
        assert_eq!(map.get("key"), Some(&Value::from("value")));
    }

    #[test]
    fn test_extract_json_is_idempotent_on_clean_object() {
        let first = extract_json("{\"a\": {\"b\": 2}}").unwrap();
        let rendered = serde_json::to_string(&first).unwrap();
        let second = extract_json(&rendered).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_json_errors_without_crashing() {
        assert!(matches!(extract_json("no json here"), Err(LlmError::Parse(_))));
        assert!(matches!(extract_json(""), Err(LlmError::Parse(_))));
        assert!(matches!(extract_json("}{"), Err(LlmError::Parse(_))));
        assert!(matches!(extract_json("{\"a\": 1"), Err(LlmError::Parse(_))));
        // A JSON value that is not an object is a parse error too.
        assert!(matches!(extract_json("[{\"a\": 1}]"), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_missing_api_key_is_fatal_not_retried() {
        let config = ServiceConfig::default();
        let client = OpenRouterClient::new(&config);
        assert!(!client.is_configured());

        let result = tokio_test::block_on(client.generate(
            "req-test",
            "system",
            "user",
            &["any/model".to_string()],
        ));
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    // Records the "model" field of each chat-completion request it serves.
    #[derive(Clone, Default)]
    struct ProviderLog(Arc<Mutex<Vec<String>>>);

    async fn fake_provider(
        State(log): State<ProviderLog>,
        Json(body): Json<Value>,
    ) -> axum::response::Response {
        let model = body["model"].as_str().unwrap_or_default().to_string();
        log.0.lock().unwrap().push(model.clone());

        if model.starts_with("broken/") {
            (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
        } else {
            Json(serde_json::json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "Here you go:\n```json\n{\"a\": 1}\n```"
                    }
                }]
            }))
            .into_response()
        }
    }

    async fn spawn_provider() -> (ProviderLog, String) {
        let log = ProviderLog::default();
        let app = Router::new()
            .route("/", post(fake_provider))
            .with_state(log.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (log, url)
    }

    fn client_for(url: &str, max_retries: u32) -> OpenRouterClient {
        OpenRouterClient::new(&ServiceConfig {
            api_key: Some("test-key".to_string()),
            api_url: url.to_string(),
            max_retries,
            ..ServiceConfig::default()
        })
    }

    #[tokio::test]
    async fn test_fallback_after_primary_exhausts_retries() {
        let (log, url) = spawn_provider().await;
        let client = client_for(&url, 2);

        let models = vec!["broken/primary".to_string(), "good/fallback".to_string()];
        let parsed = client
            .generate("req-fallback", "system", "user", &models)
            .await
            .unwrap();
        assert_eq!(parsed.get("a"), Some(&Value::from(1)));

        // Primary attempted exactly max_retries times, fallback once.
        let calls = log.0.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            ["broken/primary", "broken/primary", "good/fallback"]
        );
    }

    #[tokio::test]
    async fn test_all_candidates_exhausted() {
        let (log, url) = spawn_provider().await;
        // max_retries=1 keeps this test free of backoff sleeps.
        let client = client_for(&url, 1);

        let models = vec!["broken/a".to_string(), "broken/b".to_string()];
        let result = client.generate("req-exhaust", "system", "user", &models).await;
        match result {
            Err(LlmError::Exhausted(cause)) => {
                assert!(matches!(*cause, LlmError::UpstreamStatus { status: 500, .. }))
            }
            other => panic!("expected Exhausted, got {:?}", other.map(|_| ())),
        }
        assert_eq!(log.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_success_returns_immediately_without_trying_fallback() {
        let (log, url) = spawn_provider().await;
        let client = client_for(&url, 2);

        let models = vec!["good/primary".to_string(), "good/fallback".to_string()];
        client
            .generate("req-first", "system", "user", &models)
            .await
            .unwrap();
        assert_eq!(log.0.lock().unwrap().as_slice(), ["good/primary"]);
    }
}
