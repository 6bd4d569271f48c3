//! Pure state transition function
//!
//! Given the same state and event this always yields the same result and
//! performs no I/O. Failed calls never alter the state.

use super::{AssessmentState, Completion, Effect, Event, Stage};
use crate::service::{AnswerReply, Progress, StartReply};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: AssessmentState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: AssessmentState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The service declined the call; nothing changes
    #[error("{message}")]
    Rejected { message: String },
    /// Outcome for a question that is no longer pending
    #[error("Response no longer matches the pending question")]
    StaleResponse,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: &AssessmentState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&state.stage, event) {
        // ============================================================
        // Start
        // ============================================================
        (Stage::Idle, Event::StartSucceeded { topic, reply }) => match reply {
            StartReply::Question { message, question } => {
                let progress = Progress::new(0, 0);
                let effect = Effect::present_question(&question, &progress, message);
                Ok(started(topic, Stage::AwaitingAnswer { question, progress })
                    .with_effect(Effect::ClearNotice)
                    .with_effect(effect))
            }
            StartReply::Completed { message } => {
                let formatted_response = message.clone().unwrap_or_default();
                let outcome = Completion::Result {
                    formatted_response: formatted_response.clone(),
                    message: message.clone(),
                };
                Ok(started(topic, Stage::Complete { outcome })
                    .with_effect(Effect::ClearNotice)
                    .with_effect(Effect::PresentResult {
                        formatted_response,
                        message,
                    }))
            }
            StartReply::Rejected { message } => Err(TransitionError::Rejected { message }),
        },

        (stage, Event::StartSucceeded { .. }) => Err(TransitionError::InvalidTransition(
            format!("start while {}; reset first", stage.name()),
        )),

        // ============================================================
        // Answer
        // ============================================================
        (
            Stage::AwaitingAnswer { question, progress },
            Event::AnswerSucceeded {
                question_id,
                value,
                reply,
            },
        ) => {
            if question.id != question_id {
                return Err(TransitionError::StaleResponse);
            }

            let mut next = state.clone();
            match reply {
                AnswerReply::Rejected { message } => Err(TransitionError::Rejected { message }),
                AnswerReply::Continue {
                    question: next_question,
                    progress: reported,
                    message,
                } => {
                    next.answers.record(&question_id, value);
                    let progress = advance(progress, reported);
                    let effect = Effect::present_question(&next_question, &progress, message);
                    next.stage = Stage::AwaitingAnswer {
                        question: next_question,
                        progress,
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::ClearNotice)
                        .with_effect(effect))
                }
                AnswerReply::Complete {
                    formatted_response,
                    message,
                } => {
                    next.answers.record(&question_id, value);
                    next.stage = Stage::Complete {
                        outcome: Completion::Result {
                            formatted_response: formatted_response.clone(),
                            message: message.clone(),
                        },
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::ClearNotice)
                        .with_effect(Effect::PresentResult {
                            formatted_response,
                            message,
                        }))
                }
                AnswerReply::Emergency { message } => {
                    next.answers.record(&question_id, value);
                    next.stage = Stage::Complete {
                        outcome: Completion::Emergency {
                            message: message.clone(),
                        },
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::ClearNotice)
                        .with_effect(Effect::PresentEmergency { message }))
                }
            }
        }

        // Late answer after reset or completion
        (_, Event::AnswerSucceeded { .. }) => Err(TransitionError::StaleResponse),

        // ============================================================
        // Failure and reset
        // ============================================================
        (_, Event::CallFailed { error }) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::ShowNotice { error })),

        (_, Event::Reset) => {
            Ok(TransitionResult::new(AssessmentState::default()).with_effect(Effect::ClearNotice))
        }
    }
}

fn started(topic: String, stage: Stage) -> TransitionResult {
    TransitionResult::new(AssessmentState {
        stage,
        topic: Some(topic),
        answers: super::Answers::default(),
    })
}

/// Next progress for the run. A report that would move the percentage
/// backwards (the total grew mid-run) keeps the previous value.
pub fn advance(previous: &Progress, reported: Option<Progress>) -> Progress {
    match reported {
        Some(next) if next.percentage >= previous.percentage => next,
        _ => previous.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{AnswerValue, Multiplicity, Question};
    use crate::transport::{ErrorKind, TypedError};

    fn question(id: &str, options: &[&str], multiplicity: Multiplicity) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("{id}?"),
            options: options.iter().map(|s| (*s).to_string()).collect(),
            multiplicity,
            required: true,
            reason: None,
        }
    }

    fn awaiting(q: Question, progress: Progress) -> AssessmentState {
        AssessmentState {
            stage: Stage::AwaitingAnswer {
                question: q,
                progress,
            },
            topic: Some("headache".to_string()),
            answers: super::super::Answers::default(),
        }
    }

    fn single(value: &str) -> AnswerValue {
        AnswerValue::Single(value.to_string())
    }

    #[test]
    fn test_idle_start_with_question() {
        let q = question("age", &["Under 18", "18-30"], Multiplicity::Single);
        let result = transition(
            &AssessmentState::default(),
            Event::StartSucceeded {
                topic: "headache".to_string(),
                reply: StartReply::Question {
                    message: None,
                    question: q.clone(),
                },
            },
        )
        .unwrap();

        assert_eq!(result.new_state.current_question(), Some(&q));
        assert_eq!(result.new_state.topic.as_deref(), Some("headache"));
        assert_eq!(result.new_state.stage.progress().unwrap().percentage, 0);
        assert!(result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::PresentQuestion { .. })));
    }

    #[test]
    fn test_start_without_question_completes() {
        let result = transition(
            &AssessmentState::default(),
            Event::StartSucceeded {
                topic: "cough".to_string(),
                reply: StartReply::Completed {
                    message: Some("Nothing more to ask".to_string()),
                },
            },
        )
        .unwrap();
        assert!(result.new_state.is_complete());
    }

    #[test]
    fn test_start_rejected_leaves_idle() {
        let err = transition(
            &AssessmentState::default(),
            Event::StartSucceeded {
                topic: "x".to_string(),
                reply: StartReply::Rejected {
                    message: "Unknown topic".to_string(),
                },
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Rejected {
                message: "Unknown topic".to_string()
            }
        );
    }

    #[test]
    fn test_start_requires_idle() {
        let state = awaiting(
            question("age", &[], Multiplicity::Single),
            Progress::new(0, 0),
        );
        let result = transition(
            &state,
            Event::StartSucceeded {
                topic: "x".to_string(),
                reply: StartReply::Completed { message: None },
            },
        );
        assert!(matches!(result, Err(TransitionError::InvalidTransition(_))));
    }

    #[test]
    fn test_continue_records_answer_and_advances() {
        let state = awaiting(
            question("age", &["18-30"], Multiplicity::Single),
            Progress::new(1, 5),
        );
        let next_q = question("duration", &[], Multiplicity::Single);
        let result = transition(
            &state,
            Event::AnswerSucceeded {
                question_id: "age".to_string(),
                value: single("18-30"),
                reply: AnswerReply::Continue {
                    question: next_q.clone(),
                    progress: Some(Progress::new(2, 5)),
                    message: None,
                },
            },
        )
        .unwrap();

        assert_eq!(result.new_state.current_question(), Some(&next_q));
        assert_eq!(result.new_state.stage.progress().unwrap().percentage, 40);
        assert_eq!(result.new_state.answers.get("age"), Some(&single("18-30")));
    }

    #[test]
    fn test_complete_clears_pending_question() {
        let state = awaiting(
            question("age", &["18-30"], Multiplicity::Single),
            Progress::new(4, 5),
        );
        let result = transition(
            &state,
            Event::AnswerSucceeded {
                question_id: "age".to_string(),
                value: single("18-30"),
                reply: AnswerReply::Complete {
                    formatted_response: "## Likely tension headache".to_string(),
                    message: None,
                },
            },
        )
        .unwrap();

        assert!(result.new_state.is_complete());
        assert_eq!(result.new_state.current_question(), None);
        assert_eq!(
            result.effects.last(),
            Some(&Effect::PresentResult {
                formatted_response: "## Likely tension headache".to_string(),
                message: None
            })
        );
    }

    #[test]
    fn test_emergency_completes() {
        let state = awaiting(
            question("chest_pain", &["Yes", "No"], Multiplicity::Single),
            Progress::new(1, 5),
        );
        let result = transition(
            &state,
            Event::AnswerSucceeded {
                question_id: "chest_pain".to_string(),
                value: single("Yes"),
                reply: AnswerReply::Emergency {
                    message: "Call emergency services".to_string(),
                },
            },
        )
        .unwrap();
        assert!(matches!(
            result.new_state.stage,
            Stage::Complete {
                outcome: Completion::Emergency { .. }
            }
        ));
    }

    #[test]
    fn test_answer_for_other_question_is_stale() {
        let state = awaiting(
            question("duration", &[], Multiplicity::Single),
            Progress::new(2, 5),
        );
        let result = transition(
            &state,
            Event::AnswerSucceeded {
                question_id: "age".to_string(),
                value: single("18-30"),
                reply: AnswerReply::Complete {
                    formatted_response: String::new(),
                    message: None,
                },
            },
        );
        assert_eq!(result.unwrap_err(), TransitionError::StaleResponse);

        let result = transition(
            &AssessmentState::default(),
            Event::AnswerSucceeded {
                question_id: "age".to_string(),
                value: single("18-30"),
                reply: AnswerReply::Rejected {
                    message: String::new(),
                },
            },
        );
        assert_eq!(result.unwrap_err(), TransitionError::StaleResponse);
    }

    #[test]
    fn test_failure_keeps_state() {
        let state = awaiting(
            question("age", &["18-30"], Multiplicity::Single),
            Progress::new(1, 5),
        );
        let error = TypedError::new(ErrorKind::ServerError, 503, "unavailable");
        let result = transition(&state, Event::CallFailed { error: error.clone() }).unwrap();
        assert_eq!(result.new_state, state);
        assert_eq!(result.effects, vec![Effect::ShowNotice { error }]);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut state = awaiting(
            question("age", &["18-30"], Multiplicity::Single),
            Progress::new(1, 5),
        );
        state.answers.record("age", single("18-30"));
        let result = transition(&state, Event::Reset).unwrap();
        assert_eq!(result.new_state, AssessmentState::default());
    }

    #[test]
    fn test_progress_never_moves_backwards() {
        let previous = Progress::new(3, 5);
        assert_eq!(advance(&previous, Some(Progress::new(3, 8))), previous);
        assert_eq!(advance(&previous, None), previous);
        assert_eq!(advance(&previous, Some(Progress::new(4, 5))).percentage, 80);
    }
}
