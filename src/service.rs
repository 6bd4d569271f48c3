//! Client for the remote assessment service
//!
//! Every operation goes through the retrying [`TransportClient`] and comes
//! back as a typed reply or a [`TypedError`].

mod config;
mod types;

pub use config::{ConfigError, ServiceConfig, DEFAULT_BASE_URL};
pub use types::{
    percentage_of, AnswerError, AnswerReply, AnswerValue, HealthReport, HealthStatus, InputType,
    Multiplicity, ProcessReply, Progress, Question, Severity, StartReply,
};

use crate::session::SessionId;
use crate::transport::{
    FilePart, FormBody, HttpTransport, LoggingTransport, Request, RetryPolicy, TransportClient,
    TypedError,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const START_PATH: &str = "/api/symptom/start";
const ANSWER_PATH: &str = "/api/symptom/answer";
const PROCESS_PATH: &str = "/api/process";
const HEALTH_PATH: &str = "/api/health";

/// The dialogue operations the flow controller depends on
#[async_trait]
pub trait AssessmentService: Send + Sync {
    async fn start(&self, session: &SessionId, topic: &str) -> Result<StartReply, TypedError>;

    async fn answer(
        &self,
        session: &SessionId,
        value: &AnswerValue,
    ) -> Result<AnswerReply, TypedError>;
}

#[async_trait]
impl<T: AssessmentService + ?Sized> AssessmentService for Arc<T> {
    async fn start(&self, session: &SessionId, topic: &str) -> Result<StartReply, TypedError> {
        (**self).start(session, topic).await
    }

    async fn answer(
        &self,
        session: &SessionId,
        value: &AnswerValue,
    ) -> Result<AnswerReply, TypedError> {
        (**self).answer(session, value).await
    }
}

// ============================================================================
// Process envelope
// ============================================================================

/// Binary payload attached to a `process` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// At most one attachment per request: an image or a voice recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Image(Media),
    Audio(Media),
}

impl Attachment {
    fn field(&self) -> &'static str {
        match self {
            Attachment::Image(_) => "image",
            Attachment::Audio(_) => "audio",
        }
    }

    fn media(&self) -> &Media {
        match self {
            Attachment::Image(media) | Attachment::Audio(media) => media,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Nothing to send: provide a message or an attachment")]
    Empty,
    #[error("Unsupported attachment type {0:?}")]
    InvalidMediaType(String),
}

/// Free-form `process` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    session_id: SessionId,
    message: Option<String>,
    attachment: Option<Attachment>,
}

impl Envelope {
    pub fn new(
        session_id: SessionId,
        message: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Self, EnvelopeError> {
        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        if message.is_none() && attachment.is_none() {
            return Err(EnvelopeError::Empty);
        }
        // Same parse the multipart encoder applies, so a bad type never
        // reaches the retry loop
        if let Some(media) = attachment.as_ref().map(Attachment::media) {
            let parsed = reqwest::multipart::Part::bytes(Vec::new()).mime_str(&media.mime_type);
            if parsed.is_err() {
                return Err(EnvelopeError::InvalidMediaType(media.mime_type.clone()));
            }
        }
        Ok(Self {
            session_id,
            message,
            attachment,
        })
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    fn to_form(&self) -> FormBody {
        let mut fields = vec![("session_id".to_string(), self.session_id.to_string())];
        if let Some(message) = &self.message {
            fields.push(("message".to_string(), message.clone()));
        }
        let file = self.attachment.as_ref().map(|attachment| {
            let media = attachment.media();
            FilePart {
                field: attachment.field().to_string(),
                file_name: media.file_name.clone(),
                mime_type: media.mime_type.clone(),
                bytes: media.bytes.clone(),
            }
        });
        FormBody { fields, file }
    }
}

// ============================================================================
// Service client
// ============================================================================

#[derive(Clone)]
pub struct ServiceClient {
    transport: TransportClient,
    health_timeout: Duration,
}

impl ServiceClient {
    pub fn new(transport: TransportClient, health_timeout: Duration) -> Self {
        Self {
            transport,
            health_timeout,
        }
    }

    /// HTTP client for `config.base_url`, with attempt logging
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = HttpTransport::new(&config.base_url)?;
        let transport = LoggingTransport::new(Arc::new(http));
        Ok(Self::new(
            TransportClient::new(Arc::new(transport), config.retry),
            config.health_timeout,
        ))
    }

    /// Free-form question with optional image or voice attachment
    pub async fn process(&self, envelope: &Envelope) -> Result<ProcessReply, TypedError> {
        let request = Request::post_form(PROCESS_PATH, envelope.to_form());
        let response = self.transport.execute(&request).await?;
        types::decode_process(&response)
    }

    /// Single bounded attempt; never retried
    pub async fn health(&self) -> Result<HealthReport, TypedError> {
        let request = Request::get(HEALTH_PATH).with_timeout(self.health_timeout);
        let response = self
            .transport
            .execute_with(&request, &RetryPolicy::single_attempt())
            .await?;
        types::decode_health(&response)
    }
}

#[async_trait]
impl AssessmentService for ServiceClient {
    async fn start(&self, session: &SessionId, topic: &str) -> Result<StartReply, TypedError> {
        let request = Request::post_json(
            START_PATH,
            json!({ "topic": topic, "session_id": session }),
        );
        let response = self.transport.execute(&request).await?;
        types::decode_start(&response)
    }

    async fn answer(
        &self,
        session: &SessionId,
        value: &AnswerValue,
    ) -> Result<AnswerReply, TypedError> {
        let request = Request::post_json(
            ANSWER_PATH,
            json!({ "answer": value, "session_id": session }),
        );
        let response = self.transport.execute(&request).await?;
        types::decode_answer(&response)
    }
}
