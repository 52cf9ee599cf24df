//! Structured errors raised by the interceptor pipeline.
//!
//! The status text comes from a fixed lookup table covering the handful of
//! codes the pipeline ever produces. Anything outside that table gets no
//! status text at all.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Status codes with a canonical text, paired with that text.
const STATUS_TEXT: [(u16, &str); 7] = [
    (200, "OK"),
    (201, "Created"),
    (401, "Unauthorized"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (422, "Unprocessable Content"),
    (500, "Internal Server Error"),
];

/// Status used for contract violations (bad hook results, malformed headers).
pub const VALIDATION_STATUS: u16 = 422;

/// Status used when a private request carries no credentials.
pub const UNAUTHENTICATED_STATUS: u16 = 401;

/// Looks up the canonical text for one of the known status codes.
///
/// Returns `None` for codes outside the table.
///
/// # Examples
///
/// ```
/// use tollgate_common::status_text;
///
/// assert_eq!(status_text(404), Some("Not Found"));
/// assert_eq!(status_text(418), None);
/// ```
pub fn status_text(status: u16) -> Option<&'static str> {
    STATUS_TEXT
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, text)| *text)
}

/// Coarse classification of a [`StructuredError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A hook returned nothing, or a header had the wrong shape (422).
    Validation,
    /// A private request had no `Authorization` header (401).
    Unauthenticated,
    /// Any other status.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::Unauthenticated => write!(f, "UNAUTHENTICATED"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// Error value carrying a status code, a message and the status text.
///
/// Built through [`create_error`] or the `validation` / `unauthenticated`
/// shorthands. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct StructuredError {
    message: String,
    status: u16,
    status_message: Option<&'static str>,
}

impl StructuredError {
    /// A 422 error for a contract violation.
    pub fn validation(message: impl Into<String>) -> Self {
        create_error(VALIDATION_STATUS, message)
    }

    /// A 401 error for a private request without credentials.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        create_error(UNAUTHENTICATED_STATUS, message)
    }

    /// The human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The status code.
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// The canonical status text, if the status is one of the known codes.
    pub const fn status_message(&self) -> Option<&'static str> {
        self.status_message
    }

    /// Classifies the error by status.
    pub const fn kind(&self) -> ErrorKind {
        match self.status {
            VALIDATION_STATUS => ErrorKind::Validation,
            UNAUTHENTICATED_STATUS => ErrorKind::Unauthenticated,
            _ => ErrorKind::Other,
        }
    }
}

/// Builds a [`StructuredError`] from a status and a message.
///
/// Only the codes 200, 201, 401, 403, 404, 422 and 500 have a status text;
/// any other code leaves `status_message` empty.
pub fn create_error(status: u16, message: impl Into<String>) -> StructuredError {
    StructuredError {
        message: message.into(),
        status,
        status_message: status_text(status),
    }
}
