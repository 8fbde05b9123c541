//! Error taxonomy
//!
//! Each component returns a classified error so retry and fallthrough
//! decisions branch on the kind rather than on a broad catch.

use axum::http::StatusCode;
use axum::Json;

/// Failures talking to the generative backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation backend not configured (no API key)")]
    BackendUnavailable,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("backend error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Backend { status: Option<u16>, message: String },
}

impl GenerationError {
    pub fn backend(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Backend { status, message: message.into() }
    }
}

/// Failures of a single storage tier
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{tier} unreachable: {reason}")]
    Unreachable { tier: &'static str, reason: String },

    #[error("{tier} record unreadable: {reason}")]
    Corrupt { tier: &'static str, reason: String },

    #[error("local record not persisted: {0}")]
    NotPersisted(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal outcomes of the improvement engine surfaced to callers
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Generation exhausted its retries; carries the user-visible sentinel
    #[error("{0}")]
    GenerationFailed(String),

    #[error("prompt text must not be empty")]
    EmptyPrompt,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors returned from the HTTP surface
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    UserInputInvalid(String),

    #[error("{0}")]
    GenerationFailed(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UserInputInvalid(_) => StatusCode::BAD_REQUEST,
            Self::GenerationFailed(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::GenerationFailed(msg) => ApiError::GenerationFailed(msg),
            EngineError::EmptyPrompt => ApiError::UserInputInvalid(e.to_string()),
            EngineError::Store(inner) => ApiError::Storage(inner.to_string()),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let e = GenerationError::backend(Some(503), "overloaded");
        assert_eq!(e.to_string(), "backend error (503): overloaded");
        let e = GenerationError::backend(None, "connection reset");
        assert_eq!(e.to_string(), "backend error: connection reset");
    }

    #[test]
    fn test_api_status_codes() {
        assert_eq!(ApiError::UserInputInvalid("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::GenerationFailed("Error: busy".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        let from_engine: ApiError = EngineError::EmptyPrompt.into();
        assert_eq!(from_engine.status_code(), StatusCode::BAD_REQUEST);
    }
}
