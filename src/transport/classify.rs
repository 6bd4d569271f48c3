//! Failure classification
//!
//! Maps the raw signals of a failed attempt onto the closed [`ErrorKind`]
//! taxonomy. Rules are applied in order and the first match wins.

use super::error::{ErrorKind, TypedError};

/// What went wrong underneath, when no usable HTTP response was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CauseKind {
    /// The request never reached the service (DNS, connect, TLS)
    Fetch,
    /// The attempt exceeded its time budget
    Timeout,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cause {
    pub kind: CauseKind,
    pub message: String,
}

/// Raw observation of a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureSignal {
    /// HTTP status, 0 when no response was received
    pub status_code: u16,
    pub message: String,
    pub cause: Option<Cause>,
}

impl FailureSignal {
    /// A response arrived with a non-success status
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            cause: None,
        }
    }

    /// No response arrived
    pub fn from_cause(kind: CauseKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status_code: 0,
            message: message.clone(),
            cause: Some(Cause { kind, message }),
        }
    }

    /// Convert into a [`TypedError`] after `attempts` tries
    pub fn into_error(self, attempts: u32) -> TypedError {
        let kind = classify(&self);
        let technical_message = match &self.cause {
            Some(cause) if cause.message != self.message => {
                format!("{} ({})", self.message, cause.message)
            }
            _ => self.message,
        };
        TypedError::new(kind, self.status_code, technical_message).with_attempts(attempts)
    }
}

const FETCH_FAILURE_PATTERNS: [&str; 2] = ["failed to fetch", "network request failed"];
const REFUSED_PATTERNS: [&str; 2] = ["connection refused", "econnrefused"];

pub fn classify(signal: &FailureSignal) -> ErrorKind {
    let message = signal.message.to_lowercase();

    if signal.status_code == 0 {
        let fetch_failed = signal.cause.as_ref().is_some_and(|cause| {
            let cause_message = cause.message.to_lowercase();
            cause.kind == CauseKind::Fetch
                && FETCH_FAILURE_PATTERNS
                    .iter()
                    .any(|p| cause_message.contains(p) || message.contains(p))
        });
        return if fetch_failed {
            ErrorKind::BackendUnreachable
        } else {
            ErrorKind::NetworkError
        };
    }

    if message.contains("timeout") {
        ErrorKind::Timeout
    } else if signal.status_code >= 500 {
        ErrorKind::ServerError
    } else if REFUSED_PATTERNS.iter().any(|p| message.contains(p)) {
        ErrorKind::ConnectionRefused
    } else {
        ErrorKind::Unknown
    }
}
