//! Resilient remote invocation
//!
//! A [`Transport`] performs exactly one attempt. [`TransportClient`] layers
//! classification and retry on top of it, so nothing above this module ever
//! sees an unclassified failure.

mod classify;
mod client;
mod error;
mod http;
mod retry;
mod types;

#[cfg(test)]
mod proptests;

pub use classify::{classify, Cause, CauseKind, FailureSignal};
pub use client::TransportClient;
pub use error::{ErrorKind, TypedError};
pub use http::HttpTransport;
pub use retry::{RetryPolicy, BASE_DELAY, MAX_RETRIES};
pub use types::{FilePart, FormBody, Method, RawResponse, Request, RequestBody};

use async_trait::async_trait;
use std::sync::Arc;

/// A single raw attempt against the remote service.
///
/// Any response that arrived, whatever its status, is `Ok`. `Err` means no
/// usable response was received.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<RawResponse, FailureSignal>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &Request) -> Result<RawResponse, FailureSignal> {
        (**self).send(request).await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport {
    inner: Arc<dyn Transport>,
}

impl LoggingTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Transport for LoggingTransport {
    async fn send(&self, request: &Request) -> Result<RawResponse, FailureSignal> {
        let start = std::time::Instant::now();
        let result = self.inner.send(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) if response.is_success() => {
                tracing::info!(
                    method = request.method.as_str(),
                    path = %request.path,
                    status = response.status,
                    duration_ms = %duration.as_millis(),
                    "Request completed"
                );
            }
            Ok(response) => {
                tracing::warn!(
                    method = request.method.as_str(),
                    path = %request.path,
                    status = response.status,
                    duration_ms = %duration.as_millis(),
                    "Request returned error status"
                );
            }
            Err(signal) => {
                tracing::warn!(
                    method = request.method.as_str(),
                    path = %request.path,
                    duration_ms = %duration.as_millis(),
                    error = %signal.message,
                    "Request failed without a response"
                );
            }
        }

        result
    }
}
