//! Property-based tests for failure classification
//!
//! - Status 0 never yields a status-driven kind
//! - Fetch failures are unreachable and final
//! - 5xx without a timeout message is a retryable server error
//! - Retry delays double and stop at the last attempt

use super::classify::{classify, CauseKind, FailureSignal};
use super::error::ErrorKind;
use super::retry::RetryPolicy;
use proptest::prelude::*;
use std::time::Duration;

fn arb_cause_kind() -> impl Strategy<Value = CauseKind> {
    prop_oneof![
        Just(CauseKind::Fetch),
        Just(CauseKind::Timeout),
        Just(CauseKind::Other),
    ]
}

/// Message free of every classifier keyword
fn arb_plain_message() -> impl Strategy<Value = String> {
    "[a-z ]{0,40}".prop_filter("must not contain classifier keywords", |m| {
        !m.contains("timeout")
            && !m.contains("connection refused")
            && !m.contains("econnrefused")
            && !m.contains("failed to fetch")
            && !m.contains("network request failed")
    })
}

proptest! {
    #[test]
    fn prop_failed_to_fetch_is_unreachable(
        prefix in "[a-zA-Z ]{0,20}",
        suffix in "[a-zA-Z: ]{0,20}",
        upper in any::<bool>(),
    ) {
        let core = if upper { "Failed To Fetch" } else { "failed to fetch" };
        let signal = FailureSignal::from_cause(CauseKind::Fetch, format!("{prefix}{core}{suffix}"));
        let err = signal.into_error(1);
        prop_assert_eq!(err.kind, ErrorKind::BackendUnreachable);
        prop_assert!(!err.is_retryable());
    }

    #[test]
    fn prop_status_zero_is_unreachable_or_network(
        kind in arb_cause_kind(),
        message in "[a-zA-Z ]{0,40}",
    ) {
        let result = classify(&FailureSignal::from_cause(kind, message));
        prop_assert!(matches!(result, ErrorKind::BackendUnreachable | ErrorKind::NetworkError));
    }

    #[test]
    fn prop_non_fetch_status_zero_is_network_error(
        kind in prop_oneof![Just(CauseKind::Timeout), Just(CauseKind::Other)],
        message in "[a-zA-Z ]{0,40}",
    ) {
        prop_assert_eq!(classify(&FailureSignal::from_cause(kind, message)), ErrorKind::NetworkError);
    }

    #[test]
    fn prop_server_errors_are_retryable(
        status in 500u16..600,
        message in arb_plain_message(),
    ) {
        let err = FailureSignal::from_status(status, message).into_error(1);
        prop_assert_eq!(err.kind, ErrorKind::ServerError);
        prop_assert!(err.is_retryable());
    }

    #[test]
    fn prop_timeout_message_wins_for_any_status(
        status in 1u16..600,
        prefix in "[a-z ]{0,10}",
    ) {
        let signal = FailureSignal::from_status(status, format!("{prefix}TIMEOUT"));
        prop_assert_eq!(classify(&signal), ErrorKind::Timeout);
    }

    #[test]
    fn prop_plain_client_errors_are_unknown(
        status in 1u16..500,
        message in arb_plain_message(),
    ) {
        prop_assert_eq!(classify(&FailureSignal::from_status(status, message)), ErrorKind::Unknown);
    }

    #[test]
    fn prop_backoff_doubles(
        max_attempts in 2u32..8,
        base_ms in 1u64..2000,
    ) {
        let policy = RetryPolicy::new(max_attempts, Duration::from_millis(base_ms));
        for attempt in 1..max_attempts - 1 {
            let this = policy.delay_after(attempt).unwrap();
            let next = policy.delay_after(attempt + 1).unwrap();
            prop_assert_eq!(next, this * 2);
        }
        prop_assert_eq!(policy.delay_after(max_attempts), None);
    }
}
