//! Typed replies of the assessment service
//!
//! Wire payloads are loosely shaped; everything here is validated into
//! explicit variants before the state machine sees it.

use crate::transport::{RawResponse, TypedError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ============================================================================
// Questions and answers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    Single,
    Multiple,
}

/// A question from the service. No options means free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "QuestionWire")]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub multiplicity: Multiplicity,
    pub required: bool,
    /// Why the service is asking, when it says
    pub reason: Option<String>,
}

impl Question {
    pub fn is_free_text(&self) -> bool {
        self.options.is_empty()
    }

    pub fn is_multiple(&self) -> bool {
        self.multiplicity == Multiplicity::Multiple
    }

    /// Check that `value` is an acceptable answer to this question
    pub fn validate(&self, value: &AnswerValue) -> Result<(), AnswerError> {
        let values: &[String] = match (self.multiplicity, value) {
            (Multiplicity::Single, AnswerValue::Single(v)) => std::slice::from_ref(v),
            (Multiplicity::Multiple, AnswerValue::Multiple(vs)) => vs,
            (expected, _) => return Err(AnswerError::WrongMultiplicity { expected }),
        };

        if values.iter().all(|v| v.trim().is_empty()) {
            return if self.required || self.is_multiple() {
                Err(AnswerError::Empty)
            } else {
                Ok(())
            };
        }

        if !self.is_free_text() {
            if let Some(unknown) = values.iter().find(|v| !self.options.contains(v)) {
                return Err(AnswerError::NotAnOption(unknown.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct QuestionWire {
    #[serde(alias = "question_id")]
    id: String,
    text: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    multiple: bool,
    #[serde(default = "default_required")]
    required: bool,
    #[serde(default)]
    reason: Option<String>,
}

fn default_required() -> bool {
    true
}

impl From<QuestionWire> for Question {
    fn from(wire: QuestionWire) -> Self {
        Self {
            id: wire.id,
            prompt: wire.text,
            options: wire.options,
            multiplicity: if wire.multiple {
                Multiplicity::Multiple
            } else {
                Multiplicity::Single
            },
            required: wire.required,
            reason: wire.reason,
        }
    }
}

/// Answer payload: one string for single-choice and free text, a list for
/// multi-select (in selection order)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerValue::Single(v) => f.write_str(v),
            AnswerValue::Multiple(vs) => f.write_str(&vs.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("Answer does not match question type (expected {expected:?})")]
    WrongMultiplicity { expected: Multiplicity },
    #[error("Answer is required")]
    Empty,
    #[error("Not one of the offered options: {0}")]
    NotAnOption(String),
}

// ============================================================================
// Progress
// ============================================================================

/// Dialogue completion. `percentage` is always `round(current / total * 100)`
/// capped at 100, and 0 when `total` is 0.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "ProgressWire")]
pub struct Progress {
    pub current: u32,
    pub total: u32,
    pub percentage: u8,
    /// Server-side phase label, e.g. `universal` or `symptom_specific`
    pub phase: Option<String>,
}

impl Progress {
    pub fn new(current: u32, total: u32) -> Self {
        Self {
            current,
            total,
            percentage: percentage_of(current, total),
            phase: None,
        }
    }

    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }
}

pub fn percentage_of(current: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let (current, total) = (u64::from(current), u64::from(total));
    // Round half up in integer arithmetic
    let rounded = (current * 200 + total) / (total * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

#[derive(Deserialize)]
struct ProgressWire {
    current: u32,
    total: u32,
    #[serde(default)]
    phase: Option<String>,
}

impl From<ProgressWire> for Progress {
    fn from(wire: ProgressWire) -> Self {
        Self {
            phase: wire.phase,
            ..Progress::new(wire.current, wire.total)
        }
    }
}

// ============================================================================
// Operation replies
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartReply {
    /// Dialogue opened with its first question
    Question {
        message: Option<String>,
        question: Question,
    },
    /// Nothing to ask; the service considers the assessment complete
    Completed { message: Option<String> },
    /// `success: false`
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerReply {
    Continue {
        question: Question,
        progress: Option<Progress>,
        message: Option<String>,
    },
    Complete {
        formatted_response: String,
        message: Option<String>,
    },
    /// Answers indicate the user should seek urgent care
    Emergency { message: String },
    Rejected { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "EMERGENCY", alias = "Emergency")]
    Emergency,
    #[serde(alias = "HIGH", alias = "High")]
    High,
    #[serde(alias = "MODERATE", alias = "Moderate")]
    Moderate,
    #[serde(alias = "LOW", alias = "Low")]
    Low,
    #[serde(alias = "MINIMAL", alias = "Minimal")]
    Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Image,
    Voice,
}

/// Reply to a free-form `process` call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessReply {
    pub response: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub input_type: Vec<InputType>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    pub timestamp: i64,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

// ============================================================================
// Decoding
// ============================================================================

#[derive(Deserialize)]
struct StartWire {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    question: Option<Question>,
}

#[derive(Deserialize)]
struct AnswerWire {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    question: Option<Question>,
    #[serde(default)]
    progress: Option<Progress>,
    #[serde(default)]
    formatted_response: Option<String>,
}

fn default_success() -> bool {
    true
}

fn parse<T: DeserializeOwned>(operation: &str, response: &RawResponse) -> Result<T, TypedError> {
    serde_json::from_str(&response.body).map_err(|e| malformed(operation, response, &e))
}

fn malformed(operation: &str, response: &RawResponse, detail: &dyn std::fmt::Display) -> TypedError {
    TypedError::unknown(
        response.status,
        format!("Malformed {operation} reply: {detail}"),
    )
}

pub(crate) fn decode_start(response: &RawResponse) -> Result<StartReply, TypedError> {
    let wire: StartWire = parse("start", response)?;
    if !wire.success {
        return Ok(StartReply::Rejected {
            message: wire.message.unwrap_or_else(|| "Assessment could not be started".to_string()),
        });
    }
    Ok(match wire.question {
        Some(question) => StartReply::Question {
            message: wire.message,
            question,
        },
        None => StartReply::Completed {
            message: wire.message,
        },
    })
}

pub(crate) fn decode_answer(response: &RawResponse) -> Result<AnswerReply, TypedError> {
    let wire: AnswerWire = parse("answer", response)?;
    if !wire.success || wire.status.as_deref() == Some("error") {
        return Ok(AnswerReply::Rejected {
            message: wire.message.unwrap_or_else(|| "Answer was not accepted".to_string()),
        });
    }

    match wire.status.as_deref() {
        Some("continue") => {
            let question = wire
                .question
                .ok_or_else(|| malformed("answer", response, &"continue without a question"))?;
            Ok(AnswerReply::Continue {
                question,
                progress: wire.progress,
                message: wire.message,
            })
        }
        Some("complete") => {
            let formatted_response = wire
                .formatted_response
                .or_else(|| wire.message.clone())
                .unwrap_or_default();
            Ok(AnswerReply::Complete {
                formatted_response,
                message: wire.message,
            })
        }
        Some("emergency") => Ok(AnswerReply::Emergency {
            message: wire.message.unwrap_or_else(|| {
                "Please seek emergency medical care immediately.".to_string()
            }),
        }),
        Some(other) => Err(malformed("answer", response, &format!("unknown status {other:?}"))),
        None => Err(malformed("answer", response, &"missing status")),
    }
}

pub(crate) fn decode_process(response: &RawResponse) -> Result<ProcessReply, TypedError> {
    parse("process", response)
}

pub(crate) fn decode_health(response: &RawResponse) -> Result<HealthReport, TypedError> {
    parse("health", response)
}
