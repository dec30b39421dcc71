//! Text-generation facility backed by a local Ollama instance.
//!
//! - **[`OllamaModel`]** implements [`LanguageModel`]: parameter discovery via
//!   `POST /api/show` and session creation (no network call).
//! - **`OllamaSession`** implements [`ModelSession`]: each prompt is one
//!   `POST /api/chat` carrying the whole conversation so far.
//!
//! Use [`create_model`] to pick the facility from configuration:
//!
//! ```rust,no_run
//! # use webstash::config::ModelConfig;
//! # use webstash::ollama::create_model;
//! let mut config = ModelConfig::default();
//! config.provider = "disabled".to_string();
//! let model = create_model(&config).unwrap();
//! ```
//!
//! # Errors
//!
//! - Ollama unreachable during discovery, or the model not pulled →
//!   [`ModelError::Unavailable`].
//! - Any failed chat call → [`ModelError::Generation`] with the status and
//!   response body. There is no retry; the session manager discards the
//!   session instead.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use webstash_core::error::ModelError;
use webstash_core::session::{
    DisabledModel, LanguageModel, ModelOutput, ModelParams, ModelSession, SessionOptions,
};

use crate::config::ModelConfig;

/// Ollama's own sampling defaults, used when a model does not override them.
const OLLAMA_DEFAULT_TEMPERATURE: f64 = 0.8;
const OLLAMA_DEFAULT_TOP_K: u32 = 40;

/// Instantiate the configured text-generation facility.
///
/// | `provider` | Facility |
/// |------------|----------|
/// | `"disabled"` | [`DisabledModel`] |
/// | `"ollama"` | [`OllamaModel`] |
pub fn create_model(config: &ModelConfig) -> Result<Box<dyn LanguageModel>> {
    if !config.is_enabled() {
        return Ok(Box::new(DisabledModel));
    }
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaModel::new(config)?)),
        other => Err(anyhow!("Unknown model provider: {}", other)),
    }
}

/// Generation via a local Ollama instance's chat API.
pub struct OllamaModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_top_k: u32,
}

impl OllamaModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("model.model required for Ollama provider"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            model,
            max_top_k: config.max_top_k,
        })
    }
}

#[derive(Serialize)]
struct ShowRequest<'a> {
    model: &'a str,
}

#[derive(Deserialize)]
struct ShowResponse {
    #[serde(default)]
    parameters: Option<String>,
}

/// Chat API message for `/api/chat`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize, Clone, Copy, Debug)]
struct ChatOptions {
    temperature: f64,
    top_k: u32,
}

/// Request payload for the Ollama `/api/chat` endpoint.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

/// Response from the Ollama `/api/chat` endpoint.
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn params(&self) -> Result<ModelParams, ModelError> {
        let response = self
            .client
            .post(format!("{}/api/show", self.base_url))
            .json(&ShowRequest { model: &self.model })
            .send()
            .await
            .map_err(|e| {
                ModelError::Unavailable(format!(
                    "Ollama is not reachable at {}: {}",
                    self.base_url, e
                ))
            })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ModelError::Unavailable(format!(
                "model '{}' is not available in Ollama (try `ollama pull {}`)",
                self.model, self.model
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::generation(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let show: ShowResponse = response
            .json()
            .await
            .map_err(|e| ModelError::generation(format!("Failed to parse response: {}", e)))?;
        let (temperature, top_k) = parse_parameters(show.parameters.as_deref().unwrap_or(""));

        Ok(ModelParams {
            default_temperature: Some(temperature.unwrap_or(OLLAMA_DEFAULT_TEMPERATURE)),
            default_top_k: Some(top_k.unwrap_or(OLLAMA_DEFAULT_TOP_K)),
            max_top_k: Some(self.max_top_k),
        })
    }

    async fn create(&self, options: &SessionOptions) -> Result<Box<dyn ModelSession>, ModelError> {
        let mut history: Vec<ChatMessage> = options
            .initial_prompts
            .iter()
            .map(|m| ChatMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect();
        if !options.output_language.is_empty() {
            history.push(ChatMessage {
                role: "system".to_string(),
                content: format!(
                    "Respond in the language with code '{}'.",
                    options.output_language
                ),
            });
        }

        Ok(Box::new(OllamaSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            history,
            options: ChatOptions {
                temperature: options.temperature,
                top_k: options.top_k,
            },
            destroyed: false,
        }))
    }
}

/// Read `temperature` and `top_k` from the `parameters` block of
/// `/api/show`, which holds one `name value` pair per line.
fn parse_parameters(block: &str) -> (Option<f64>, Option<u32>) {
    let mut temperature = None;
    let mut top_k = None;
    for line in block.lines() {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("temperature"), Some(v)) => temperature = v.parse().ok(),
            (Some("top_k"), Some(v)) => top_k = v.parse().ok(),
            _ => {}
        }
    }
    (temperature, top_k)
}

struct OllamaSession {
    client: reqwest::Client,
    base_url: String,
    model: String,
    history: Vec<ChatMessage>,
    options: ChatOptions,
    destroyed: bool,
}

#[async_trait]
impl ModelSession for OllamaSession {
    async fn prompt(&mut self, text: &str) -> Result<ModelOutput, ModelError> {
        if self.destroyed {
            return Err(ModelError::generation("The model session has been destroyed."));
        }
        let start = Instant::now();

        let mut messages = self.history.clone();
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: text.to_string(),
        });

        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
            options: self.options,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ModelError::generation(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.base_url, e
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::generation(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::generation(format!("Failed to parse response: {}", e)))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = result.message.content.len(),
            duration_ms = elapsed,
            "Generation complete"
        );
        if elapsed > 30000 {
            warn!(duration_ms = elapsed, prompt_len = text.len(), "Slow generation");
        }

        let content = result.message.content.clone();
        messages.push(result.message);
        self.history = messages;
        Ok(ModelOutput::Text(content))
    }

    fn destroy(&mut self) -> Result<(), ModelError> {
        self.history.clear();
        self.destroyed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parameters() {
        let block = "stop                           \"<|eot_id|>\"\ntemperature                    0.6\ntop_k 20\n";
        assert_eq!(parse_parameters(block), (Some(0.6), Some(20)));
        assert_eq!(parse_parameters(""), (None, None));
        assert_eq!(parse_parameters("top_k lots"), (None, None));
    }

    #[test]
    fn test_create_model_disabled() {
        let config = ModelConfig {
            provider: "disabled".to_string(),
            ..ModelConfig::default()
        };
        assert!(create_model(&config).is_ok());
    }

    #[test]
    fn test_create_model_unknown() {
        let config = ModelConfig {
            provider: "mystery".to_string(),
            ..ModelConfig::default()
        };
        assert!(create_model(&config).is_err());
    }

    #[tokio::test]
    async fn test_destroyed_session_refuses_prompts() {
        let model = OllamaModel::new(&ModelConfig::default()).unwrap();
        let options = SessionOptions {
            initial_prompts: vec![],
            temperature: 0.5,
            top_k: 2,
            output_language: "en".to_string(),
        };
        let mut session = model.create(&options).await.unwrap();
        session.destroy().unwrap();
        assert!(session.prompt("hi").await.is_err());
    }
}
