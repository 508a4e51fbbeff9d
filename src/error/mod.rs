//! Error types for the SUSTAIN service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for SUSTAIN operations
pub type Result<T> = std::result::Result<T, SustainError>;

/// Main error type surfaced by the optimization pipeline
#[derive(Error, Debug)]
pub enum SustainError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] crate::middleware::ValidationError),

    #[error("API quota exceeded")]
    QuotaExceeded,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Completion provider error: {0}")]
    Provider(CompletionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors produced at the completion provider boundary
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Provider quota exhausted")]
    QuotaExceeded,

    #[error("Provider rate limit reached")]
    RateLimited,

    #[error("Provider returned an error: {0}")]
    Provider(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("No provider API key configured")]
    MissingCredentials,
}

/// Errors raised while recognising or evaluating arithmetic
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("empty expression")]
    Empty,

    #[error("Invalid math expression")]
    InvalidExpression,

    #[error("Unsafe math expression")]
    UnsafeExpression,

    #[error("Unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("Result is not a finite number")]
    NonFinite,
}

impl From<CompletionError> for SustainError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::QuotaExceeded => SustainError::QuotaExceeded,
            CompletionError::RateLimited => SustainError::RateLimited,
            other => SustainError::Provider(other),
        }
    }
}

impl From<config::ConfigError> for SustainError {
    fn from(err: config::ConfigError) -> Self {
        SustainError::Config(err.to_string())
    }
}

impl SustainError {
    /// HTTP status this error maps to at the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            SustainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SustainError::QuotaExceeded | SustainError::RateLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to API callers. Provider and internal details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            SustainError::InvalidInput(_) => {
                "Invalid input: userInput is required and must be a string"
            }
            SustainError::QuotaExceeded => "API quota exceeded",
            SustainError::RateLimited => "Rate limit exceeded",
            _ => "Error processing request",
        }
    }
}

impl IntoResponse for SustainError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(json!({
                "error": self.public_message(),
                "percentageSaved": 0,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::ValidationError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            SustainError::InvalidInput(ValidationError::EmptyInput).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(SustainError::QuotaExceeded.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(SustainError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            SustainError::Provider(CompletionError::Timeout(30)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            SustainError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_completion_error_is_classified_once() {
        assert!(matches!(
            SustainError::from(CompletionError::QuotaExceeded),
            SustainError::QuotaExceeded
        ));
        assert!(matches!(
            SustainError::from(CompletionError::RateLimited),
            SustainError::RateLimited
        ));
        assert!(matches!(
            SustainError::from(CompletionError::MalformedResponse("no choices".into())),
            SustainError::Provider(CompletionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_public_message_hides_provider_detail() {
        let err = SustainError::from(CompletionError::Provider("secret upstream trace".into()));
        assert_eq!(err.public_message(), "Error processing request");
    }
}
