//! Assessment dialogue state machine
//!
//! Pure transitions in [`transition`], driven by [`AssessmentController`].

mod controller;
mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use controller::{AssessmentController, Applied, FlowError, PendingAnswer, PendingStart};
pub use effect::Effect;
pub use event::Event;
pub use state::{Answers, AssessmentState, Completion, Selection, Stage};
pub use transition::{transition, TransitionError, TransitionResult};
