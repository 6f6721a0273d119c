//! Error types for SMS Search

use thiserror::Error;

/// Error raised by a query handler collaborator
#[derive(Debug, Error)]
#[error("{handler} failed for query '{query}': {reason}")]
pub struct HandlerFailure {
    pub handler: String,
    pub query: String,
    pub reason: String,
}

/// Error raised when the configuration is structurally valid but unusable
#[derive(Debug, Error)]
#[error("Invalid vertical '{keyword}': {reason}")]
pub struct InvalidVerticalError {
    pub keyword: String,
    pub reason: String,
}

/// General business error type
///
/// Every failure in the query path surfaces as one of these, unchanged
/// from where it was raised.
#[derive(Debug, Error)]
pub enum BusinessError {
    #[error("Vertical error: {0}")]
    Vertical(HandlerFailure),

    #[error("Online query error: {0}")]
    OnlineQuery(HandlerFailure),

    #[error(transparent)]
    InvalidVertical(#[from] InvalidVerticalError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl BusinessError {
    /// Failure inside a vertical handler
    pub fn vertical(handler: &str, query: &str, reason: impl Into<String>) -> Self {
        BusinessError::Vertical(HandlerFailure {
            handler: handler.to_string(),
            query: query.to_string(),
            reason: reason.into(),
        })
    }

    /// Failure inside the online query fallback
    pub fn online_query(handler: &str, query: &str, reason: impl Into<String>) -> Self {
        BusinessError::OnlineQuery(HandlerFailure {
            handler: handler.to_string(),
            query: query.to_string(),
            reason: reason.into(),
        })
    }
}

pub type Result<T> = std::result::Result<T, BusinessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_failure_message() {
        let err = BusinessError::vertical("weather", "weather paris", "upstream timeout");
        assert_eq!(
            err.to_string(),
            "Vertical error: weather failed for query 'weather paris': upstream timeout"
        );
    }

    #[test]
    fn test_handler_failure_reported_once_in_chain() {
        let err = BusinessError::online_query("search", "cricket", "unreachable");
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(
            err.to_string(),
            "Online query error: search failed for query 'cricket': unreachable"
        );
    }

    #[test]
    fn test_invalid_vertical_is_transparent() {
        let err: BusinessError = InvalidVerticalError {
            keyword: "two words".to_string(),
            reason: "keyword must be a single word".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Invalid vertical 'two words': keyword must be a single word"
        );
    }
}
