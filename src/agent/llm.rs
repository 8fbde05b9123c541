//! Generative backend over an OpenAI-compatible chat completions API
//!
//! Gemini's OpenAI-compatible endpoint is the default provider; any other
//! compatible base URL works the same way.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::GenerationError;

/// A text-completion capability: prompt in, raw text out
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Whether credentials are present. Checked before any call.
    fn is_configured(&self) -> bool;

    /// Send a single prompt and return the completion text
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Provider connection settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL for the API (e.g., Gemini's `/v1beta/openai`)
    pub base_url: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<serde_json::Value>,
}

/// HTTP client for the generation backend
#[derive(Clone)]
pub struct LlmClient {
    client: Arc<Client>,
    provider: ProviderConfig,
}

impl LlmClient {
    pub fn new(provider: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(provider.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            provider,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(ProviderConfig::from_config(config))
    }

    /// Get the provider configuration
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }
}

/// Pull the completion text out of a chat completions body.
/// Content may be a plain string or an array of `{type: "text"}` parts.
fn extract_content(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::MalformedResponse(format!("unreadable completion body: {e}"))
    })?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenerationError::MalformedResponse("completion has no content".into()))?;

    match content {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Array(parts) => Ok(parts
            .iter()
            .filter(|p| p.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("")),
        other => Ok(other.to_string()),
    }
}

#[async_trait]
impl GenerationBackend for LlmClient {
    fn is_configured(&self) -> bool {
        self.provider.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .provider
            .api_key
            .as_deref()
            .ok_or(GenerationError::BackendUnavailable)?;

        let request = ChatRequest {
            model: &self.provider.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::backend(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::backend(Some(status.as_u16()), body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::backend(None, format!("failed to read body: {e}")))?;
        debug!(bytes = body.len(), model = %self.provider.model, "completion received");

        extract_content(&body)
    }
}
