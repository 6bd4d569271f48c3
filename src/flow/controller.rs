//! Drives the assessment dialogue against a service
//!
//! The controller owns the state exclusively. Each call is split into a
//! `begin_*` step that validates and issues a sequence token, and an
//! `apply_*` step that feeds the outcome through [`transition`]. Outcomes
//! whose token is no longer outstanding are discarded, which covers both
//! superseded calls and results arriving after a reset.

use super::state::Selection;
use super::transition::{transition, TransitionError};
use super::{AssessmentState, Effect, Event};
use crate::notice::NoticeBoard;
use crate::service::{AnswerError, AnswerReply, AnswerValue, AssessmentService, StartReply};
use crate::session::SessionId;
use crate::transport::TypedError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error(transparent)]
    Transport(#[from] TypedError),
    #[error("The service declined the request: {0}")]
    Rejected(String),
    #[error("Invalid answer: {0}")]
    InvalidAnswer(#[from] AnswerError),
    #[error("Select at least one option before submitting")]
    NothingSelected,
    #[error("Topic must not be empty")]
    EmptyTopic,
    #[error("{0}")]
    InvalidState(String),
    #[error("No failed call to retry")]
    NothingToRetry,
}

impl FlowError {
    /// Whether re-invoking the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// An issued `start` awaiting its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStart {
    token: u64,
    pub topic: String,
}

/// An issued `answer` awaiting its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnswer {
    token: u64,
    pub question_id: String,
    pub value: AnswerValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Updated { effects: Vec<Effect> },
    /// Outcome no longer matched the controller and was dropped
    Discarded,
}

impl Applied {
    pub fn into_effects(self) -> Vec<Effect> {
        match self {
            Applied::Updated { effects } => effects,
            Applied::Discarded => vec![],
        }
    }
}

#[derive(Debug, Clone)]
enum FailedCall {
    Start(String),
    Answer(AnswerValue),
}

pub struct AssessmentController<S: AssessmentService> {
    service: S,
    session: SessionId,
    state: AssessmentState,
    sequence: u64,
    outstanding: Option<u64>,
    draft: Option<Selection>,
    notices: Option<NoticeBoard>,
    last_failed: Option<FailedCall>,
}

impl<S: AssessmentService> AssessmentController<S> {
    pub fn new(service: S, session: SessionId) -> Self {
        Self {
            service,
            session,
            state: AssessmentState::default(),
            sequence: 0,
            outstanding: None,
            draft: None,
            notices: None,
            last_failed: None,
        }
    }

    /// Route failure notices to `board`
    #[must_use]
    pub fn with_notices(mut self, board: NoticeBoard) -> Self {
        self.notices = Some(board);
        self
    }

    pub fn state(&self) -> &AssessmentState {
        &self.state
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Multi-select draft for the pending question
    pub fn draft(&self) -> Option<&Selection> {
        self.draft.as_ref()
    }

    pub fn notices(&self) -> Option<&NoticeBoard> {
        self.notices.as_ref()
    }

    pub fn notices_mut(&mut self) -> Option<&mut NoticeBoard> {
        self.notices.as_mut()
    }

    /// Whether the multi-select draft may be submitted
    pub fn can_submit(&self) -> bool {
        self.draft.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn is_busy(&self) -> bool {
        self.outstanding.is_some()
    }

    // ========================================================================
    // Split API
    // ========================================================================

    /// Issue a `start`. Supersedes any outstanding call.
    pub fn begin_start(&mut self, topic: &str) -> Result<PendingStart, FlowError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(FlowError::EmptyTopic);
        }
        if !self.state.is_idle() {
            return Err(FlowError::InvalidState(format!(
                "cannot start while {}; reset first",
                self.state.stage.name()
            )));
        }
        Ok(PendingStart {
            token: self.issue(),
            topic: topic.to_string(),
        })
    }

    /// Validate `value` against the pending question and issue an `answer`
    pub fn begin_answer(&mut self, value: AnswerValue) -> Result<PendingAnswer, FlowError> {
        let question = self.state.current_question().ok_or_else(|| {
            FlowError::InvalidState(format!(
                "no question pending while {}",
                self.state.stage.name()
            ))
        })?;
        question.validate(&value)?;
        let question_id = question.id.clone();
        Ok(PendingAnswer {
            token: self.issue(),
            question_id,
            value,
        })
    }

    pub fn apply_start(
        &mut self,
        pending: PendingStart,
        outcome: Result<StartReply, TypedError>,
    ) -> Result<Applied, FlowError> {
        if !self.settle(pending.token) {
            tracing::debug!(topic = %pending.topic, "Discarding superseded start outcome");
            return Ok(Applied::Discarded);
        }
        match outcome {
            Ok(reply) => {
                self.last_failed = None;
                let topic = pending.topic.clone();
                let applied = self.dispatch(Event::StartSucceeded {
                    topic: pending.topic,
                    reply,
                })?;
                tracing::info!(session_id = %self.session, %topic, stage = self.state.stage.name(), "Assessment started");
                Ok(applied)
            }
            Err(error) => {
                self.last_failed = Some(FailedCall::Start(pending.topic));
                self.fail(error)
            }
        }
    }

    pub fn apply_answer(
        &mut self,
        pending: PendingAnswer,
        outcome: Result<AnswerReply, TypedError>,
    ) -> Result<Applied, FlowError> {
        if !self.settle(pending.token) {
            tracing::debug!(question_id = %pending.question_id, "Discarding superseded answer outcome");
            return Ok(Applied::Discarded);
        }
        match outcome {
            Ok(reply) => {
                self.last_failed = None;
                self.dispatch(Event::AnswerSucceeded {
                    question_id: pending.question_id,
                    value: pending.value,
                    reply,
                })
            }
            Err(error) => {
                self.last_failed = Some(FailedCall::Answer(pending.value));
                self.fail(error)
            }
        }
    }

    // ========================================================================
    // Async API
    // ========================================================================

    pub async fn start(&mut self, topic: &str) -> Result<Vec<Effect>, FlowError> {
        let pending = self.begin_start(topic)?;
        let outcome = self.service.start(&self.session, &pending.topic).await;
        Ok(self.apply_start(pending, outcome)?.into_effects())
    }

    pub async fn answer(&mut self, value: AnswerValue) -> Result<Vec<Effect>, FlowError> {
        let pending = self.begin_answer(value)?;
        let outcome = self.service.answer(&self.session, &pending.value).await;
        Ok(self.apply_answer(pending, outcome)?.into_effects())
    }

    /// Pick an option of the pending question. Single-choice questions are
    /// submitted at once; multi-select toggles the option in the draft.
    pub async fn select(&mut self, option: &str) -> Result<Vec<Effect>, FlowError> {
        let question = self
            .state
            .current_question()
            .ok_or_else(|| FlowError::InvalidState("no question pending".to_string()))?;
        if !question.options.iter().any(|o| o == option) {
            return Err(AnswerError::NotAnOption(option.to_string()).into());
        }

        if !question.is_multiple() {
            return self.answer(AnswerValue::Single(option.to_string())).await;
        }

        let question_id = question.id.clone();
        let draft = self
            .draft
            .get_or_insert_with(|| Selection::new(question_id.clone()));
        if draft.question_id != question_id {
            *draft = Selection::new(question_id);
        }
        draft.toggle(option);
        Ok(vec![])
    }

    /// Submit the multi-select draft
    pub async fn submit(&mut self) -> Result<Vec<Effect>, FlowError> {
        let value = match &self.draft {
            Some(draft) if !draft.is_empty() => draft.to_answer(),
            _ => return Err(FlowError::NothingSelected),
        };
        self.answer(value).await
    }

    /// Answer a free-text question
    pub async fn answer_text(&mut self, text: &str) -> Result<Vec<Effect>, FlowError> {
        self.answer(AnswerValue::Single(text.trim().to_string()))
            .await
    }

    /// Re-issue the last call that failed in transport
    pub async fn retry(&mut self) -> Result<Vec<Effect>, FlowError> {
        match self.last_failed.take() {
            Some(FailedCall::Start(topic)) => self.start(&topic).await,
            Some(FailedCall::Answer(value)) => self.answer(value).await,
            None => Err(FlowError::NothingToRetry),
        }
    }

    /// Abandon the run and any outstanding call
    pub fn reset(&mut self) -> Vec<Effect> {
        self.outstanding = None;
        self.last_failed = None;
        self.dispatch(Event::Reset)
            .map(Applied::into_effects)
            .unwrap_or_default()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn issue(&mut self) -> u64 {
        self.sequence += 1;
        if let Some(previous) = self.outstanding.replace(self.sequence) {
            tracing::debug!(previous, token = self.sequence, "Superseding outstanding call");
        }
        self.sequence
    }

    /// Consume `token` if it is the outstanding one
    fn settle(&mut self, token: u64) -> bool {
        if self.outstanding == Some(token) {
            self.outstanding = None;
            true
        } else {
            false
        }
    }

    fn fail(&mut self, error: TypedError) -> Result<Applied, FlowError> {
        self.dispatch(Event::CallFailed {
            error: error.clone(),
        })?;
        Err(FlowError::Transport(error))
    }

    fn dispatch(&mut self, event: Event) -> Result<Applied, FlowError> {
        let result = match transition(&self.state, event) {
            Ok(result) => result,
            Err(TransitionError::Rejected { message }) => {
                tracing::warn!(%message, "Service rejected the call");
                return Err(FlowError::Rejected(message));
            }
            Err(TransitionError::StaleResponse) => {
                tracing::debug!("Discarding response for a question no longer pending");
                return Ok(Applied::Discarded);
            }
            Err(TransitionError::InvalidTransition(message)) => {
                return Err(FlowError::InvalidState(message));
            }
        };

        self.state = result.new_state;
        tracing::debug!(
            stage = self.state.stage.name(),
            effects = result.effects.len(),
            "Transition applied"
        );
        self.sync_draft();
        for effect in &result.effects {
            self.route_notice(effect);
        }
        Ok(Applied::Updated {
            effects: result.effects,
        })
    }

    /// Keep the draft bound to the pending multi-select question
    fn sync_draft(&mut self) {
        match self.state.current_question() {
            Some(q) if q.is_multiple() => {
                if self.draft.as_ref().map(|d| d.question_id.as_str()) != Some(q.id.as_str()) {
                    self.draft = Some(Selection::new(q.id.clone()));
                }
            }
            _ => self.draft = None,
        }
    }

    fn route_notice(&mut self, effect: &Effect) {
        let Some(board) = self.notices.as_mut() else {
            return;
        };
        match effect {
            Effect::ShowNotice { error } => {
                board.show(error);
            }
            Effect::ClearNotice => board.dismiss(),
            _ => {}
        }
    }
}
