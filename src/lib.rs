//! Symptom assessment client
//!
//! A resilient invocation layer for a remote symptom-assessment service
//! (classification, retry with backoff, session identity) and the
//! client-side state machine that drives its question/answer dialogue.

pub mod flow;
pub mod notice;
pub mod service;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use flow::{AssessmentController, AssessmentState, Effect, FlowError, Stage};
pub use notice::{Notice, NoticeAction, NoticeBoard};
pub use service::{AssessmentService, ServiceClient, ServiceConfig};
pub use session::{MemorySessionStore, SessionId, SessionStore};
pub use transport::{ErrorKind, RetryPolicy, TransportClient, TypedError};
