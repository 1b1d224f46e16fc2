//! Language-model client abstraction.
//!
//! - **[`MistralModel`]** calls a Mistral-compatible
//!   `POST {base_url}/v1/chat/completions` endpoint.
//! - **[`DisabledModel`]** fails every request; used when `llm.provider =
//!   "disabled"` so lookups still work without an API key.
//!
//! Use [`create_model`] to build the configured implementation.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, ... (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LlmConfig;

/// A text-completion service: one prompt in, one answer out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a single user message and return the completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Build the model selected by `[llm].provider`.
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    if !config.is_enabled() {
        return Ok(Arc::new(DisabledModel));
    }

    match config.provider.as_str() {
        "mistral" => Ok(Arc::new(MistralModel::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

// ============ Disabled ============

pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("Language model is disabled (set [llm] provider in config)")
    }

    fn model_name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

// ============ Mistral ============

pub struct MistralModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_retries: u32,
}

impl MistralModel {
    /// # Errors
    ///
    /// Returns an error if `llm.model` is unset or the API key variable
    /// named by `llm.api_key_env` is not in the environment.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for Mistral provider"))?;

        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("{} environment variable not set", config.api_key_env),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_key,
            model,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LanguageModel for MistralModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(attempt, ?delay, "retrying chat completion");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        debug!(model = %self.model, "chat completion received");
                        return parse_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!("LLM API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("LLM API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after retries")))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Extract `choices[0].message.content` from a chat-completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid LLM response: missing choices[0].message.content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Local chat-completions endpoint answering with a scripted status sequence.
    #[derive(Default)]
    struct MockApi {
        statuses: Vec<u16>,
        delay: Option<Duration>,
        hits: AtomicUsize,
        last_request: Mutex<Option<(String, serde_json::Value)>>,
    }

    async fn mock_completions(
        State(api): State<Arc<MockApi>>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let hit = api.hits.fetch_add(1, Ordering::SeqCst);
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        *api.last_request.lock().unwrap() = Some((auth, body));

        if let Some(delay) = api.delay {
            tokio::time::sleep(delay).await;
        }

        let code = api
            .statuses
            .get(hit)
            .or(api.statuses.last())
            .copied()
            .unwrap_or(200);
        let status = StatusCode::from_u16(code).unwrap();
        if status.is_success() {
            let reply = serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "ok" } }]
            });
            (status, Json(reply))
        } else {
            (status, Json(serde_json::json!({ "message": "scripted failure" })))
        }
    }

    async fn spawn_mock(api: Arc<MockApi>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/v1/chat/completions", post(mock_completions))
            .with_state(api);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn mistral_config(base_url: String, key_env: &str) -> LlmConfig {
        std::env::set_var(key_env, "sk-test");
        LlmConfig {
            provider: "mistral".to_string(),
            base_url,
            model: Some("mistral-small-latest".to_string()),
            api_key_env: key_env.to_string(),
            temperature: 0.2,
            timeout_secs: 5,
            max_retries: 2,
        }
    }

    #[tokio::test]
    async fn test_mistral_request_shape() {
        let api = Arc::new(MockApi::default());
        let base = spawn_mock(api.clone()).await;
        let model = MistralModel::new(&mistral_config(base, "EQA_TEST_KEY_SHAPE")).unwrap();

        assert_eq!(model.complete("Où est la pompe ?").await.unwrap(), "ok");

        let (auth, body) = api.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(auth, "Bearer sk-test");
        assert_eq!(body["model"], "mistral-small-latest");
        assert_eq!(body["temperature"], 0.2);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "Où est la pompe ?");
    }

    #[tokio::test]
    async fn test_mistral_retries_server_errors() {
        let api = Arc::new(MockApi {
            statuses: vec![503, 503, 200],
            ..MockApi::default()
        });
        let base = spawn_mock(api.clone()).await;
        let model = MistralModel::new(&mistral_config(base, "EQA_TEST_KEY_RETRY")).unwrap();

        assert_eq!(model.complete("bonjour").await.unwrap(), "ok");
        assert_eq!(api.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_mistral_gives_up_after_max_retries() {
        let api = Arc::new(MockApi {
            statuses: vec![429],
            ..MockApi::default()
        });
        let base = spawn_mock(api.clone()).await;
        let mut config = mistral_config(base, "EQA_TEST_KEY_EXHAUST");
        config.max_retries = 1;
        let model = MistralModel::new(&config).unwrap();

        let err = model.complete("bonjour").await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert_eq!(api.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_mistral_client_error_not_retried() {
        let api = Arc::new(MockApi {
            statuses: vec![400, 200],
            ..MockApi::default()
        });
        let base = spawn_mock(api.clone()).await;
        let model = MistralModel::new(&mistral_config(base, "EQA_TEST_KEY_BADREQ")).unwrap();

        let err = model.complete("bonjour").await.unwrap_err();
        assert!(err.to_string().contains("400"));
        assert_eq!(api.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mistral_request_times_out() {
        let api = Arc::new(MockApi {
            delay: Some(Duration::from_secs(5)),
            ..MockApi::default()
        });
        let base = spawn_mock(api.clone()).await;
        let mut config = mistral_config(base, "EQA_TEST_KEY_TIMEOUT");
        config.timeout_secs = 1;
        config.max_retries = 0;
        let model = MistralModel::new(&config).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(4), model.complete("bonjour"))
            .await
            .expect("request was not bounded by the client timeout");
        assert!(result.is_err());
        assert_eq!(api.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_chat_response() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Bâtiment A, niveau 2" } }
            ]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "Bâtiment A, niveau 2");
    }

    #[test]
    fn test_parse_chat_response_missing_content() {
        let json = serde_json::json!({ "object": "error", "message": "Unauthorized" });
        let err = parse_chat_response(&json).unwrap_err();
        assert!(err.to_string().contains("choices"));
    }

    #[tokio::test]
    async fn test_disabled_model_fails() {
        let model = create_model(&LlmConfig::default()).unwrap();
        assert!(!model.is_enabled());
        assert_eq!(model.model_name(), "disabled");
        assert!(model.complete("bonjour").await.is_err());
    }

    #[test]
    fn test_mistral_requires_api_key() {
        let config = LlmConfig {
            provider: "mistral".to_string(),
            model: Some("mistral-small-latest".to_string()),
            api_key_env: "EQA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = MistralModel::new(&config).err().unwrap();
        assert!(err.to_string().contains("EQA_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
