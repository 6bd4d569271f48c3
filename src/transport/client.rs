//! Retrying transport client

use super::classify::FailureSignal;
use super::error::TypedError;
use super::retry::RetryPolicy;
use super::types::{RawResponse, Request};
use super::Transport;
use std::sync::Arc;

/// Executes logical requests with bounded retry and backoff.
///
/// Holds no per-call state, so one client can serve any number of concurrent
/// calls; each call's backoff only suspends that call.
#[derive(Clone)]
pub struct TransportClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl TransportClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute(&self, request: &Request) -> Result<RawResponse, TypedError> {
        self.execute_with(request, &self.policy).await
    }

    /// Execute under an explicit policy instead of the client default
    pub async fn execute_with(
        &self,
        request: &Request,
        policy: &RetryPolicy,
    ) -> Result<RawResponse, TypedError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let signal = match self.transport.send(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => FailureSignal::from_status(response.status, response.error_message()),
                Err(signal) => signal,
            };

            let error = signal.into_error(attempt);
            if !policy.should_retry(error.kind, attempt) {
                if error.is_retryable() {
                    tracing::error!(
                        path = %request.path,
                        attempts = attempt,
                        kind = %error.kind,
                        status = error.status_code,
                        "Request failed after exhausting retries"
                    );
                } else {
                    tracing::error!(
                        path = %request.path,
                        kind = %error.kind,
                        status = error.status_code,
                        error = %error.technical_message,
                        "Request failed with non-retryable error"
                    );
                }
                return Err(error);
            }

            let delay = policy.delay_after(attempt).unwrap_or_default();
            tracing::warn!(
                path = %request.path,
                attempt,
                max_attempts = policy.max_attempts,
                kind = %error.kind,
                delay_ms = %delay.as_millis(),
                "Retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
