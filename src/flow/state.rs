//! Assessment state types

use crate::service::{AnswerValue, Progress, Question};
use serde::Serialize;

/// Where the dialogue stands
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    /// No topic started
    #[default]
    Idle,

    /// A question is pending
    AwaitingAnswer {
        question: Question,
        progress: Progress,
    },

    /// Dialogue finished
    Complete { outcome: Completion },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::AwaitingAnswer { .. } => "awaiting_answer",
            Stage::Complete { .. } => "complete",
        }
    }

    pub fn question(&self) -> Option<&Question> {
        match self {
            Stage::AwaitingAnswer { question, .. } => Some(question),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<&Progress> {
        match self {
            Stage::AwaitingAnswer { progress, .. } => Some(progress),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Completion {
    /// Final assessment from the service
    Result {
        formatted_response: String,
        message: Option<String>,
    },
    /// Answers pointed to an emergency; no assessment is given
    Emergency { message: String },
}

/// Answers given so far, keyed by question id, in the order first answered
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Answers(Vec<(String, AnswerValue)>);

impl Answers {
    /// Record `value` for `question_id`, replacing any earlier value in place
    pub fn record(&mut self, question_id: &str, value: AnswerValue) {
        match self.0.iter_mut().find(|(id, _)| id == question_id) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((question_id.to_string(), value)),
        }
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.0
            .iter()
            .find(|(id, _)| id == question_id)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.0.iter().map(|(id, value)| (id.as_str(), value))
    }
}

/// Client-held view of one assessment run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AssessmentState {
    pub stage: Stage,
    pub topic: Option<String>,
    pub answers: Answers,
}

impl AssessmentState {
    pub fn is_idle(&self) -> bool {
        matches!(self.stage, Stage::Idle)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.stage, Stage::Complete { .. })
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.stage.question()
    }
}

/// Multi-select draft for the pending question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub question_id: String,
    values: Vec<String>,
}

impl Selection {
    pub fn new(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            values: Vec::new(),
        }
    }

    /// Remove `option` if selected, otherwise append it
    pub fn toggle(&mut self, option: &str) {
        if let Some(pos) = self.values.iter().position(|v| v == option) {
            self.values.remove(pos);
        } else {
            self.values.push(option.to_string());
        }
    }

    pub fn contains(&self, option: &str) -> bool {
        self.values.iter().any(|v| v == option)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_answer(&self) -> AnswerValue {
        AnswerValue::Multiple(self.values.clone())
    }
}
