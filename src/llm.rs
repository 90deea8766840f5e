//! LLM runtime client
//!
//! Talks to an Ollama-compatible `/api/generate` endpoint.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::BotError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// One text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Ask the runtime to constrain output to a JSON object.
    pub json_format: bool,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            json_format: false,
            temperature: None,
        }
    }

    /// Structured JSON output at temperature 0.
    pub fn deterministic_json(mut self) -> Self {
        self.json_format = true;
        self.temperature = Some(0.0);
        self
    }
}

/// Text generation capability (classification and synthesis both use it).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> crate::Result<String>;
}

/// Reusable Ollama client (connection-pooled)
pub struct OllamaClient {
    client: Client,
    host: String,
}

impl OllamaClient {
    pub fn new(host: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
        })
    }

    /// Check that the runtime is reachable by listing its local models.
    pub async fn ping(&self) -> crate::Result<()> {
        let url = format!("{}/api/tags", self.host);
        let response = self
            .client
            .get(&url)
            .timeout(PING_TIMEOUT)
            .send()
            .await
            .map_err(|e| BotError::Transport(format!("LLM runtime unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(BotError::Transport(format!(
                "LLM runtime returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: GenerationRequest) -> crate::Result<String> {
        let url = format!("{}/api/generate", self.host);
        let body = OllamaRequest::from(&request);

        info!(model = %request.model, "Calling LLM runtime");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("LLM request failed: {}", e);
                BotError::Transport(format!("LLM runtime error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("LLM error response ({}): {}", status, error_text);
            return Err(BotError::Llm(format!("LLM runtime returned {}: {}", status, error_text)));
        }

        let parsed: OllamaResponse = response.json().await.map_err(|e| {
            error!("Failed to parse LLM response: {}", e);
            BotError::Parse(format!("LLM response parse error: {}", e))
        })?;

        Ok(parsed.response)
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
}

#[derive(Debug, Serialize)]
struct GenerationOptions {
    temperature: f32,
}

impl<'a> From<&'a GenerationRequest> for OllamaRequest<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            format: request.json_format.then_some("json"),
            options: request
                .temperature
                .map(|temperature| GenerationOptions { temperature }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}
