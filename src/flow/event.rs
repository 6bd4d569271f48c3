//! Events that drive the assessment flow

use crate::service::{AnswerReply, AnswerValue, StartReply};
use crate::transport::TypedError;

/// Outcomes fed back into the state machine
#[derive(Debug, Clone)]
pub enum Event {
    /// `start` returned a decoded reply
    StartSucceeded { topic: String, reply: StartReply },

    /// `answer` returned a decoded reply for `question_id`
    AnswerSucceeded {
        question_id: String,
        value: AnswerValue,
        reply: AnswerReply,
    },

    /// Either call failed after the retry envelope
    CallFailed { error: TypedError },

    /// Abandon the current run
    Reset,
}
