//! Generative-model adapter abstraction and implementations.
//!
//! Defines the [`GenerativeModel`] trait and concrete HTTP adapters:
//! - **[`GeminiModel`]**: Google Generative Language API (`generateContent`).
//! - **[`OpenAiModel`]**: any OpenAI-compatible `chat/completions` endpoint.
//!
//! # Provider Selection
//!
//! Use [`create_model`] to instantiate the adapter named in `[model].provider`.
//! A disabled provider or a missing API key yields
//! [`ModelError::Unavailable`]; the answer service treats that as its
//! "no model" state rather than a hard error.
//!
//! ```rust
//! # use report_analyst::config::ModelConfig;
//! # use report_analyst::error::ModelError;
//! # use report_analyst::model::create_model;
//! let config = ModelConfig::default(); // provider = "disabled"
//! assert!(matches!(create_model(&config), Err(ModelError::Unavailable(_))));
//! ```
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited), 5xx and network errors → retry with backoff
//! - other HTTP 4xx → fail immediately
//! - request timeout → fail immediately (the caller's deadline is already spent)
//! - backoff: 1s, 2s, 4s, ... (capped at 2^5)

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ModelConfig;
use crate::error::ModelError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-pro";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Error bodies are clipped to this many chars before they reach logs.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// A text-in, text-out generative model.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier (e.g. `"gemini-2.5-pro"`).
    fn name(&self) -> &str;

    /// Generate a completion for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Timeout and retry settings shared by the HTTP adapters.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl HttpSettings {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            backoff: Duration::from_secs(1),
        }
    }
}

fn build_client(settings: &HttpSettings) -> Result<reqwest::Client, ModelError> {
    reqwest::Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(|e| ModelError::Unavailable(format!("cannot build HTTP client: {}", e)))
}

// ============ Gemini ============

/// Adapter for the Gemini `generateContent` REST endpoint.
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    settings: HttpSettings,
}

impl GeminiModel {
    pub fn new(
        model: Option<String>,
        endpoint: Option<String>,
        api_key: String,
        settings: HttpSettings,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: build_client(&settings)?,
            base_url: endpoint
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
            api_key,
            settings,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending Gemini request");

        let json = post_with_retry(&self.settings, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;
        parse_gemini_response(&json)
    }
}

/// Concatenates the text parts of the first candidate.
fn parse_gemini_response(json: &Value) -> Result<String, ModelError> {
    let Some(candidate) = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    else {
        if let Some(reason) = json
            .pointer("/promptFeedback/blockReason")
            .and_then(|r| r.as_str())
        {
            return Err(ModelError::Malformed(format!("prompt blocked: {}", reason)));
        }
        return Err(ModelError::Malformed("missing candidates array".to_string()));
    };

    // A candidate with no content (e.g. finishReason = SAFETY) is an empty answer.
    let parts = match candidate.pointer("/content/parts").and_then(|p| p.as_array()) {
        Some(parts) => parts,
        None => return Ok(String::new()),
    };

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}

// ============ OpenAI-compatible ============

/// Adapter for OpenAI-compatible chat completion endpoints.
pub struct OpenAiModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    settings: HttpSettings,
}

impl OpenAiModel {
    pub fn new(
        model: Option<String>,
        endpoint: Option<String>,
        api_key: String,
        settings: HttpSettings,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: build_client(&settings)?,
            base_url: endpoint
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            api_key,
            settings,
        })
    }
}

#[async_trait]
impl GenerativeModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.2,
        });

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending chat completion request");

        let json = post_with_retry(&self.settings, || {
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
        })
        .await?;
        parse_openai_response(&json)
    }
}

fn parse_openai_response(json: &Value) -> Result<String, ModelError> {
    let choice = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| ModelError::Malformed("missing choices array".to_string()))?;
    Ok(choice
        .pointer("/message/content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string())
}

// ============ Transport ============

/// Sends a JSON request with retry/backoff and returns the decoded body.
async fn post_with_retry<F>(settings: &HttpSettings, request: F) -> Result<Value, ModelError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = ModelError::Network("no attempt made".to_string());

    for attempt in 0..=settings.max_retries {
        if attempt > 0 {
            let delay = settings.backoff * (1u32 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let err = match request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json::<Value>()
                        .await
                        .map_err(|e| ModelError::Malformed(e.to_string()));
                }
                let body = clip(&response.text().await.unwrap_or_default());
                if status.as_u16() == 429 {
                    ModelError::RateLimited(body)
                } else {
                    ModelError::Api {
                        status: status.as_u16(),
                        message: body,
                    }
                }
            }
            Err(e) if e.is_timeout() => ModelError::Timeout {
                millis: settings.timeout.as_millis() as u64,
            },
            Err(e) => ModelError::Network(e.to_string()),
        };

        if !err.is_transient() {
            return Err(err);
        }
        tracing::warn!(attempt, error = %err, "model request failed");
        last_err = err;
    }

    Err(last_err)
}

fn clip(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Create the configured [`GenerativeModel`].
///
/// | Config Value | Adapter | Key variable (default) |
/// |--------------|---------|------------------------|
/// | `"disabled"` | none    | n/a |
/// | `"gemini"`   | [`GeminiModel`] | `GEMINI_API_KEY` |
/// | `"openai"`   | [`OpenAiModel`] | `OPENAI_API_KEY` |
///
/// # Errors
///
/// [`ModelError::Unavailable`] when the provider is disabled, unknown, or
/// its API key variable is unset or empty.
pub fn create_model(config: &ModelConfig) -> Result<Arc<dyn GenerativeModel>, ModelError> {
    if !config.is_enabled() {
        return Err(ModelError::Unavailable("model provider is disabled".to_string()));
    }

    let key_env = config.key_env();
    let api_key = std::env::var(key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ModelError::Unavailable(format!("{} is not set", key_env)))?;

    let settings = HttpSettings::from_config(config);
    let model = config.model.clone();
    let endpoint = config.endpoint.clone();

    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiModel::new(model, endpoint, api_key, settings)?)),
        "openai" => Ok(Arc::new(OpenAiModel::new(model, endpoint, api_key, settings)?)),
        other => Err(ModelError::Unavailable(format!(
            "unknown model provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn gemini_parts_are_concatenated() {
        let json = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Orange holds " }, { "text": "23%." }] },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(parse_gemini_response(&json).unwrap(), "Orange holds 23%.");
    }

    #[test]
    fn gemini_candidate_without_content_is_empty() {
        let json = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert_eq!(parse_gemini_response(&json).unwrap(), "");
    }

    #[test]
    fn gemini_blocked_prompt_is_malformed() {
        let json = json!({ "promptFeedback": { "blockReason": "OTHER" } });
        let err = parse_gemini_response(&json).unwrap_err();
        assert_eq!(err, ModelError::Malformed("prompt blocked: OTHER".to_string()));
    }

    #[test]
    fn openai_content_is_extracted() {
        let json = json!({ "choices": [{ "message": { "role": "assistant", "content": "Hi" } }] });
        assert_eq!(parse_openai_response(&json).unwrap(), "Hi");
        assert!(parse_openai_response(&json!({})).is_err());
    }

    #[test]
    fn disabled_provider_is_unavailable() {
        let err = create_model(&ModelConfig::default()).err().unwrap();
        assert!(matches!(err, ModelError::Unavailable(ref m) if m.contains("disabled")));
    }

    #[test]
    fn missing_key_is_unavailable() {
        let config = ModelConfig {
            provider: "gemini".to_string(),
            api_key_env: Some("REPORT_ANALYST_TEST_UNSET_KEY".to_string()),
            ..ModelConfig::default()
        };
        let err = create_model(&config).err().unwrap();
        assert!(
            matches!(err, ModelError::Unavailable(ref m) if m.contains("REPORT_ANALYST_TEST_UNSET_KEY"))
        );
    }

    #[test]
    fn configured_provider_is_created() {
        std::env::set_var("REPORT_ANALYST_TEST_OPENAI_KEY", "sk-test");
        let config = ModelConfig {
            provider: "openai".to_string(),
            model: Some("gpt-test".to_string()),
            api_key_env: Some("REPORT_ANALYST_TEST_OPENAI_KEY".to_string()),
            ..ModelConfig::default()
        };
        let model = create_model(&config).unwrap();
        assert_eq!(model.name(), "gpt-test");
    }

    /// Serves each canned response in turn, recording request paths.
    #[derive(Clone)]
    struct MockState {
        calls: Arc<AtomicUsize>,
        paths: Arc<Mutex<Vec<String>>>,
        responses: Arc<Vec<(StatusCode, Value)>>,
    }

    async fn mock_handler(State(state): State<MockState>, uri: Uri) -> Response {
        state.paths.lock().unwrap().push(uri.path().to_string());
        let n = state.calls.fetch_add(1, Ordering::SeqCst);
        let (status, body) = state.responses[n.min(state.responses.len() - 1)].clone();
        (status, Json(body)).into_response()
    }

    async fn spawn_mock(responses: Vec<(StatusCode, Value)>) -> (String, MockState) {
        let state = MockState {
            calls: Arc::new(AtomicUsize::new(0)),
            paths: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(responses),
        };
        let app = Router::new()
            .fallback(mock_handler)
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }

    fn fast_settings(max_retries: u32) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(5),
            max_retries,
            backoff: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn gemini_retries_rate_limit_then_succeeds() {
        let (base, state) = spawn_mock(vec![
            (StatusCode::TOO_MANY_REQUESTS, json!({ "error": "quota" })),
            (
                StatusCode::OK,
                json!({ "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }] }),
            ),
        ])
        .await;

        let model = GeminiModel::new(
            Some("test-model".to_string()),
            Some(base),
            "key".to_string(),
            fast_settings(2),
        )
        .unwrap();
        assert_eq!(model.generate("prompt").await.unwrap(), "ok");
        assert_eq!(state.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            state.paths.lock().unwrap()[0],
            "/v1beta/models/test-model:generateContent"
        );
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let (base, state) = spawn_mock(vec![(
            StatusCode::BAD_REQUEST,
            json!({ "error": "bad request" }),
        )])
        .await;

        let model =
            OpenAiModel::new(None, Some(base), "key".to_string(), fast_settings(3)).unwrap();
        let err = model.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Api { status: 400, .. }));
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.paths.lock().unwrap()[0], "/v1/chat/completions");
    }

    #[tokio::test]
    async fn server_errors_exhaust_retries() {
        let (base, state) = spawn_mock(vec![(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "error": "overloaded" }),
        )])
        .await;

        let model =
            OpenAiModel::new(None, Some(base), "key".to_string(), fast_settings(2)).unwrap();
        let err = model.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Api { status: 503, .. }));
        assert_eq!(state.calls.load(Ordering::SeqCst), 3);
    }
}
