//! Mock implementations for testing
//!
//! These mocks enable exercising retry, decoding and the flow controller
//! without real I/O.

use crate::service::ServiceClient;
use crate::transport::{
    CauseKind, FailureSignal, RawResponse, Request, RetryPolicy, Transport, TransportClient,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// Mock Transport
// ============================================================================

/// Transport that replays queued outcomes in order
#[derive(Default)]
pub struct MockTransport {
    outcomes: Mutex<VecDeque<Result<RawResponse, FailureSignal>>>,
    requests: Mutex<Vec<Request>>,
    times: Mutex<Vec<Instant>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_response(&self, status: u16, body: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok(RawResponse::new(status, body)));
    }

    pub fn queue_json(&self, status: u16, body: &Value) {
        self.queue_response(status, &body.to_string());
    }

    pub fn queue_failure(&self, signal: FailureSignal) {
        self.outcomes.lock().unwrap().push_back(Err(signal));
    }

    /// Number of attempts received so far
    pub fn attempts(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn recorded_requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// When each attempt arrived, on tokio's clock
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.times.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &Request) -> Result<RawResponse, FailureSignal> {
        self.requests.lock().unwrap().push(request.clone());
        self.times.lock().unwrap().push(Instant::now());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(FailureSignal::from_cause(
                    CauseKind::Other,
                    "No mock response queued",
                ))
            })
    }
}

/// Service client over `mock` with immediate retries and the default
/// health timeout
pub fn test_service(mock: &Arc<MockTransport>) -> ServiceClient {
    let transport = TransportClient::new(mock.clone(), RetryPolicy::new(3, Duration::ZERO));
    ServiceClient::new(transport, Duration::from_secs(5))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let mock = MockTransport::new();
        mock.queue_response(500, "a");
        mock.queue_failure(FailureSignal::from_cause(CauseKind::Fetch, "failed to fetch"));

        let request = Request::get("/x");
        assert_eq!(mock.send(&request).await.unwrap().status, 500);
        assert!(mock.send(&request).await.is_err());
        let exhausted = mock.send(&request).await.unwrap_err();
        assert_eq!(exhausted.message, "No mock response queued");
        assert_eq!(mock.attempts(), 3);
    }
}
