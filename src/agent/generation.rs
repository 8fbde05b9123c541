//! Structured generation with retry
//!
//! One logical call: send the caller's prompt, strip any code fence from the
//! completion, parse it as a JSON object and pull out one string field.
//! Failures are retried per [`RetryPolicy`]; exhaustion is reported as the
//! last error so each call site can pick its own fallback.

use std::sync::Arc;
use tracing::{debug, warn};

use super::llm::GenerationBackend;
use super::retry::{classify, RetryClass, RetryPolicy, Sleeper, TokioSleeper};
use crate::error::GenerationError;

/// Returned in place of a reply when the backend stays busy
pub const BUSY_SENTINEL: &str = "AI busy (Rate Limit). Please wait 1 min.";

/// Returned in place of a manually updated prompt when the backend stays busy
pub const ERROR_BUSY_SENTINEL: &str = "Error: AI busy (Rate Limit). Please wait 1 min.";

/// Returned when no API key is configured
pub const MISSING_KEY_SENTINEL: &str = "Error: generation API key not configured. Set GEMINI_API_KEY.";

/// Prefix marking a sentinel that must never be persisted as a prompt
pub const ERROR_PREFIX: &str = "Error:";

/// Whether a generated value is a failure sentinel rather than real output
pub fn is_error_sentinel(text: &str) -> bool {
    text.starts_with(ERROR_PREFIX)
}

/// Remove a surrounding ```` ```json ```` / ```` ``` ```` fence, if any
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse a (possibly fenced) completion and extract a string field
pub fn extract_field(raw: &str, field: &str) -> Result<String, GenerationError> {
    let payload = strip_code_fence(raw);
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| GenerationError::MalformedResponse(format!("not JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| GenerationError::MalformedResponse("not a JSON object".into()))?;

    object
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| GenerationError::MalformedResponse(format!("missing string field '{field}'")))
}

/// Retry-wrapped structured generation
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }

    /// Generate and extract `field`, retrying until the attempt cap
    pub async fn generate(&self, prompt: &str, field: &str) -> Result<String, GenerationError> {
        if !self.backend.is_configured() {
            return Err(GenerationError::BackendUnavailable);
        }

        let mut last_error = GenerationError::backend(None, "no attempt made");

        for attempt in 0..self.policy.max_attempts {
            let result = match self.backend.complete(prompt).await {
                Ok(raw) => {
                    debug!(attempt, "raw completion: {}", raw);
                    extract_field(&raw, field)
                }
                Err(e) => Err(e),
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            let class = classify(&error);
            if class == RetryClass::Fatal {
                return Err(error);
            }

            if self.policy.has_next(attempt) {
                if class == RetryClass::RateLimit {
                    let delay = self.policy.backoff(attempt);
                    warn!("Rate limit hit. Retrying in {}s...", delay.as_secs());
                    self.sleeper.sleep(delay).await;
                } else {
                    warn!(attempt = attempt + 1, "Generation error: {}", error);
                }
            } else {
                warn!("Generation failed after {} attempts: {}", attempt + 1, error);
            }

            last_error = error;
        }

        Err(last_error)
    }

    /// Like [`generate`](Self::generate) but degrades to `fallback`.
    /// Missing credentials degrade to [`MISSING_KEY_SENTINEL`] instead.
    pub async fn generate_or(&self, prompt: &str, field: &str, fallback: &str) -> String {
        match self.generate(prompt, field).await {
            Ok(value) => value,
            Err(GenerationError::BackendUnavailable) => MISSING_KEY_SENTINEL.to_string(),
            Err(_) => fallback.to_string(),
        }
    }
}
