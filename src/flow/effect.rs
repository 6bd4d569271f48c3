//! Effects produced by state transitions

use crate::service::{Progress, Question};
use crate::transport::TypedError;

/// Effects for the caller to render after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Show the pending question
    PresentQuestion {
        question: Question,
        progress: Progress,
        message: Option<String>,
    },

    /// Show the final assessment
    PresentResult {
        formatted_response: String,
        message: Option<String>,
    },

    /// Tell the user to seek urgent care
    PresentEmergency { message: String },

    /// Raise a notice for a failed call
    ShowNotice { error: TypedError },

    /// Drop any visible notice
    ClearNotice,
}

impl Effect {
    pub fn present_question(question: &Question, progress: &Progress, message: Option<String>) -> Self {
        Effect::PresentQuestion {
            question: question.clone(),
            progress: progress.clone(),
            message,
        }
    }
}
