//! Retry policy for the generation backend
//!
//! Rate-limit errors back off exponentially; every other error consumes an
//! attempt and retries immediately.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::GenerationError;

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Back off before the next attempt
    RateLimit,
    /// Retry immediately
    Immediate,
    /// Do not retry at all
    Fatal,
}

/// Classify a backend error message
pub fn classify_message(error_str: &str) -> RetryClass {
    let lower = error_str.to_lowercase();

    if lower.contains("429")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
        || lower.contains("resource_exhausted")
    {
        RetryClass::RateLimit
    } else {
        RetryClass::Immediate
    }
}

/// Classify a generation error
pub fn classify(error: &GenerationError) -> RetryClass {
    match error {
        GenerationError::BackendUnavailable => RetryClass::Fatal,
        GenerationError::RateLimited(_) => RetryClass::RateLimit,
        GenerationError::Backend { status: Some(429), .. } => RetryClass::RateLimit,
        GenerationError::Backend { message, .. } => classify_message(message),
        GenerationError::MalformedResponse(_) => RetryClass::Immediate,
    }
}

/// Attempt cap and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
        }
    }

    /// Delay after a rate-limited attempt (0-based): `base * 2^attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Whether another attempt follows `attempt` (0-based)
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

/// Suspends the caller between attempts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_message() {
        assert_eq!(classify_message("429 Too Many Requests"), RetryClass::RateLimit);
        assert_eq!(classify_message("RESOURCE_EXHAUSTED: quota"), RetryClass::RateLimit);
        assert_eq!(classify_message("Rate limit reached"), RetryClass::RateLimit);
        assert_eq!(classify_message("503 Service Unavailable"), RetryClass::Immediate);
    }

    #[test]
    fn test_classify_error_kinds() {
        assert_eq!(classify(&GenerationError::BackendUnavailable), RetryClass::Fatal);
        assert_eq!(classify(&GenerationError::RateLimited("slow down".into())), RetryClass::RateLimit);
        assert_eq!(classify(&GenerationError::backend(Some(429), "quota")), RetryClass::RateLimit);
        assert_eq!(classify(&GenerationError::backend(Some(500), "boom")), RetryClass::Immediate);
        assert_eq!(
            classify(&GenerationError::MalformedResponse("not json".into())),
            RetryClass::Immediate
        );
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..4).map(|a| policy.backoff(a).as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40]);
        assert_eq!(policy.backoff(4).as_secs(), 80);
    }

    #[test]
    fn test_attempt_cap() {
        let policy = RetryPolicy::default();
        assert!(policy.has_next(3));
        assert!(!policy.has_next(4));

        let single = RetryPolicy::from_config(&RetryConfig { max_attempts: 0, base_delay_secs: 1 });
        assert_eq!(single.max_attempts, 1);
        assert!(!single.has_next(0));
    }
}
