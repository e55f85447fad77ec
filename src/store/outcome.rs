//! Structured result of directory writes.

use crate::domain::{GatewayError, StoreError, StoreResult};

/// Outcome of a create or delete.
///
/// Unlike message operations these never surface as `Err`: the caller gets
/// the refusal reason, the server's rejection text, or the transport error
/// as data.
#[must_use]
#[derive(Debug)]
pub enum Outcome<T> {
    /// The operation went through.
    Completed(T),
    /// Refused locally; no request was sent.
    Refused(String),
    /// The backend answered with `success: false`.
    Rejected(String),
    /// Transport, status or decode failure.
    Failed(GatewayError),
}

impl<T> Outcome<T> {
    /// Classify a gateway result; rejected envelopes become [`Outcome::Rejected`].
    pub fn from_gateway(result: Result<T, GatewayError>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(GatewayError::Rejected(reason)) => Self::Rejected(reason),
            Err(err) => Self::Failed(err),
        }
    }

    /// Whether the operation went through.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Payload of a completed operation.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Take the payload of a completed operation.
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Human-readable reason for an unsuccessful outcome.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Completed(_) => None,
            Self::Refused(reason) | Self::Rejected(reason) => Some(reason.clone()),
            Self::Failed(err) => Some(err.to_string()),
        }
    }

    /// Underlying transport error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&GatewayError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Transform the payload of a completed operation.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Refused(reason) => Outcome::Refused(reason),
            Self::Rejected(reason) => Outcome::Rejected(reason),
            Self::Failed(err) => Outcome::Failed(err),
        }
    }

    /// Convert to a `Result` for `?`-style callers.
    ///
    /// # Errors
    /// Returns the refusal, rejection or failure as a [`StoreError`].
    pub fn into_result(self) -> StoreResult<T> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Refused(reason) => Err(StoreError::Refused(reason)),
            Self::Rejected(reason) => Err(GatewayError::Rejected(reason).into()),
            Self::Failed(err) => Err(err.into()),
        }
    }
}
