//! Error types for the client library.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;
use tollgate_common::{ErrorKind, StructuredError};
use url::Url;

/// Errors surfaced by the public and private clients.
///
/// Failures produced by the interceptor pipeline arrive as
/// [`ApiError::Structured`]; everything the transport or a user hook
/// produced is passed through without translation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Contract violation detected by the pipeline (VALIDATION or UNAUTHENTICATED).
    #[error("{}: {}", .0.kind(), .0.message())]
    Structured(#[from] StructuredError),

    /// Network or HTTP request failure.
    ///
    /// Indicates issues like DNS resolution, connection failures, or socket errors.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    ///
    /// For private requests this is the response that was left after the
    /// refresh protocol declined (or already spent) its single retry.
    #[error("Request to {url} failed with status {status}")]
    HttpStatus {
        /// The response status.
        status: StatusCode,
        /// The final request URL.
        url: Url,
        /// The response headers.
        headers: HeaderMap,
        /// The response body, lossily decoded as UTF-8.
        body: String,
    },

    /// A user hook (`request`, `response` or `refresh_token`) failed.
    ///
    /// The hook's own error is kept unchanged.
    #[error("Hook error: {0}")]
    HookError(anyhow::Error),

    /// JSON serialization or deserialization error.
    ///
    /// Occurs when request/response JSON cannot be properly encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Client configuration issue.
    ///
    /// Invalid base URL, relative URL without a base, bad header names or values.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<reqwest_middleware::Error> for ApiError {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Reqwest(error) => Self::NetworkError(error),
            reqwest_middleware::Error::Middleware(error) => {
                match error.downcast::<StructuredError>() {
                    Ok(structured) => Self::Structured(structured),
                    Err(other) => Self::HookError(other),
                }
            }
        }
    }
}

impl ApiError {
    /// The HTTP status associated with this error, if any.
    ///
    /// Structured errors report their own status; transport errors report the
    /// response status when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Structured(error) => Some(error.status()),
            Self::HttpStatus { status, .. } => Some(status.as_u16()),
            Self::NetworkError(error) => error.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a pipeline VALIDATION error (422).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Structured(e) if e.kind() == ErrorKind::Validation)
    }

    /// Check if this is a pipeline UNAUTHENTICATED error (401).
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Structured(e) if e.kind() == ErrorKind::Unauthenticated)
    }

    /// The structured error, if the pipeline produced this failure.
    pub const fn as_structured(&self) -> Option<&StructuredError> {
        match self {
            Self::Structured(error) => Some(error),
            _ => None,
        }
    }
}
