//! Typed transport errors

use serde::Serialize;
use thiserror::Error;

/// Transport failure with classification.
///
/// `user_message()` and `is_retryable()` are derived from `kind` alone, so two
/// errors of the same kind always present the same way to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {technical_message}")]
pub struct TypedError {
    pub kind: ErrorKind,
    /// HTTP status of the last attempt, 0 when no response was received
    pub status_code: u16,
    /// Diagnostic detail, never shown as the primary message
    pub technical_message: String,
    /// Number of attempts made before this error surfaced
    pub attempts: u32,
}

impl TypedError {
    pub fn new(kind: ErrorKind, status_code: u16, technical_message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code,
            technical_message: technical_message.into(),
            attempts: 1,
        }
    }

    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn unknown(status_code: u16, technical_message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, status_code, technical_message)
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Closed error taxonomy used for retry decisions and user messaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Backend could not be reached at all - configuration or deployment problem
    BackendUnreachable,
    /// Connection actively refused
    ConnectionRefused,
    /// Request timed out
    Timeout,
    /// 5xx from the service
    ServerError,
    /// Any other failure before a response arrived
    NetworkError,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::BackendUnreachable,
        ErrorKind::ConnectionRefused,
        ErrorKind::Timeout,
        ErrorKind::ServerError,
        ErrorKind::NetworkError,
        ErrorKind::Unknown,
    ];

    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::BackendUnreachable)
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::BackendUnreachable => {
                "Cannot reach the assessment service. Check that the backend is running \
                 and that SYMPTOM_API_URL points at it."
            }
            Self::ConnectionRefused => {
                "The assessment service refused the connection. Please try again in a moment."
            }
            Self::Timeout => "The assessment service took too long to respond. Please try again.",
            Self::ServerError => "The assessment service ran into a problem. Please try again.",
            Self::NetworkError => "A network error occurred. Check your connection and try again.",
            Self::Unknown => "Something unexpected went wrong. Please try again.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BackendUnreachable => "backend_unreachable",
            Self::ConnectionRefused => "connection_refused",
            Self::Timeout => "timeout",
            Self::ServerError => "server_error",
            Self::NetworkError => "network_error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
