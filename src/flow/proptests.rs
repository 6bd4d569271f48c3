//! Property-based tests for the assessment state machine

use super::*;
use crate::service::{AnswerReply, AnswerValue, Multiplicity, Progress, Question, StartReply};
use crate::transport::{ErrorKind, TypedError};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_question() -> impl Strategy<Value = Question> {
    (
        "[a-z_]{1,12}",
        prop::collection::vec("[A-Za-z]{1,8}", 0..5),
        any::<bool>(),
    )
        .prop_map(|(id, options, multiple)| Question {
            prompt: format!("{id}?"),
            id,
            options,
            multiplicity: if multiple {
                Multiplicity::Multiple
            } else {
                Multiplicity::Single
            },
            required: true,
            reason: None,
        })
}

fn arb_progress() -> impl Strategy<Value = Progress> {
    (1u32..20).prop_flat_map(|total| (0..=total, Just(total)).prop_map(|(c, t)| Progress::new(c, t)))
}

fn arb_error() -> impl Strategy<Value = TypedError> {
    (prop::sample::select(ErrorKind::ALL.to_vec()), 0u16..600, "[a-z ]{0,30}")
        .prop_map(|(kind, status, message)| TypedError::new(kind, status, message))
}

fn arb_state() -> impl Strategy<Value = AssessmentState> {
    prop_oneof![
        Just(AssessmentState::default()),
        (arb_question(), arb_progress()).prop_map(|(question, progress)| AssessmentState {
            stage: Stage::AwaitingAnswer { question, progress },
            topic: Some("headache".to_string()),
            answers: Answers::default(),
        }),
        "[a-z ]{0,20}".prop_map(|text| AssessmentState {
            stage: Stage::Complete {
                outcome: Completion::Result {
                    formatted_response: text,
                    message: None,
                },
            },
            topic: Some("headache".to_string()),
            answers: Answers::default(),
        }),
    ]
}

fn awaiting(question: Question, progress: Progress) -> AssessmentState {
    AssessmentState {
        stage: Stage::AwaitingAnswer { question, progress },
        topic: Some("headache".to_string()),
        answers: Answers::default(),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_failure_never_mutates(state in arb_state(), error in arb_error()) {
        let result = transition(&state, Event::CallFailed { error: error.clone() }).unwrap();
        prop_assert_eq!(result.new_state, state);
        prop_assert_eq!(result.effects, vec![Effect::ShowNotice { error }]);
    }

    #[test]
    fn prop_rejection_is_an_error_not_a_change(question in arb_question(), progress in arb_progress()) {
        let state = awaiting(question.clone(), progress);
        let result = transition(&state, Event::AnswerSucceeded {
            question_id: question.id.clone(),
            value: AnswerValue::Single("x".to_string()),
            reply: AnswerReply::Rejected { message: "no".to_string() },
        });
        let rejected = matches!(result, Err(TransitionError::Rejected { .. }));
        prop_assert!(rejected);
    }

    #[test]
    fn prop_progress_monotonic_within_run(
        first in arb_question(),
        reports in prop::collection::vec(prop::option::of(arb_progress()), 1..10),
    ) {
        let mut state = transition(&AssessmentState::default(), Event::StartSucceeded {
            topic: "headache".to_string(),
            reply: StartReply::Question { message: None, question: first },
        })
        .unwrap()
        .new_state;

        let mut last = 0u8;
        for report in reports {
            let question_id = state.current_question().unwrap().id.clone();
            let next = Question { id: format!("{question_id}_next"), ..state.current_question().unwrap().clone() };
            state = transition(&state, Event::AnswerSucceeded {
                question_id,
                value: AnswerValue::Single("x".to_string()),
                reply: AnswerReply::Continue { question: next, progress: report, message: None },
            })
            .unwrap()
            .new_state;

            let percentage = state.stage.progress().unwrap().percentage;
            prop_assert!(percentage >= last);
            last = percentage;
        }
    }

    #[test]
    fn prop_new_start_resets_progress(state in arb_state(), question in arb_question()) {
        let reset = transition(&state, Event::Reset).unwrap().new_state;
        let started = transition(&reset, Event::StartSucceeded {
            topic: "cough".to_string(),
            reply: StartReply::Question { message: None, question },
        })
        .unwrap()
        .new_state;
        prop_assert_eq!(started.stage.progress().unwrap().percentage, 0);
        prop_assert!(started.answers.is_empty());
    }

    #[test]
    fn prop_toggle_is_membership_flip(
        picks in prop::collection::vec(prop::sample::select(vec!["A", "B", "C", "D"]), 0..20),
    ) {
        let mut selection = Selection::new("q");
        for pick in &picks {
            selection.toggle(pick);
        }
        for option in ["A", "B", "C", "D"] {
            let count = picks.iter().filter(|p| **p == option).count();
            prop_assert_eq!(selection.contains(option), count % 2 == 1);
        }
        let mut seen = selection.values().to_vec();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), selection.values().len());
    }
}
