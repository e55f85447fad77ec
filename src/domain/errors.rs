//! Error types for the gateway and the store.

use thiserror::Error;

use super::ids::ConversationId;

/// Errors raised while talking to the chat backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {reason}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Canonical reason or body excerpt.
        reason: String,
    },

    /// Response body was not the expected JSON.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Base URL or endpoint could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Envelope reported `success: false`.
    #[error("backend rejected the request: {0}")]
    Rejected(String),

    /// Envelope reported success without the expected `data`.
    #[error("backend response is missing data for {0}")]
    MissingData(&'static str),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GatewayError {
    /// Check if this error is worth retrying by the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::HttpRequest(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors returned by store operations that propagate failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Remote call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// No conversation with this id is known locally.
    #[error("unknown conversation: {0}")]
    UnknownConversation(ConversationId),

    /// Message content was empty after trimming.
    #[error("message content is empty")]
    EmptyMessage,

    /// A local business rule refused the action before any remote call.
    #[error("refused: {0}")]
    Refused(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let server = GatewayError::Status {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        let client = GatewayError::Status {
            status: 404,
            reason: "Not Found".to_string(),
        };

        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!GatewayError::Rejected("nope".to_string()).is_retryable());
    }

    #[test]
    fn test_store_error_wraps_gateway_message() {
        let err = StoreError::from(GatewayError::Rejected("quota".to_string()));
        assert_eq!(err.to_string(), "backend rejected the request: quota");
    }
}
