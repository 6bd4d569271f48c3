//! reqwest-backed transport

use super::classify::{CauseKind, FailureSignal};
use super::types::{Method, RawResponse, Request, RequestBody};
use super::Transport;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

/// HTTP transport against the assessment service
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn build_form(form: &super::FormBody) -> Result<Form, FailureSignal> {
        let mut multipart = Form::new();
        for (name, value) in &form.fields {
            multipart = multipart.text(name.clone(), value.clone());
        }
        if let Some(file) = &form.file {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime_type)
                .map_err(|e| {
                    FailureSignal::from_cause(
                        CauseKind::Other,
                        format!("Invalid attachment type {}: {e}", file.mime_type),
                    )
                })?;
            multipart = multipart.part(file.field.clone(), part);
        }
        Ok(multipart)
    }
}

/// Map a reqwest error onto the raw failure signal the classifier expects.
///
/// Connect failures mean the request never reached the service, which is what
/// browsers report as "Failed to fetch".
fn signal_from_reqwest(e: &reqwest::Error) -> FailureSignal {
    if e.is_connect() {
        FailureSignal::from_cause(CauseKind::Fetch, format!("failed to fetch: {e}"))
    } else if e.is_timeout() {
        FailureSignal::from_cause(CauseKind::Timeout, format!("request timeout: {e}"))
    } else {
        FailureSignal::from_cause(CauseKind::Other, format!("request failed: {e}"))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<RawResponse, FailureSignal> {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Form(form) => builder.multipart(Self::build_form(form)?),
        };

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| signal_from_reqwest(&e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            FailureSignal::from_cause(CauseKind::Other, format!("Failed to read response: {e}"))
        })?;

        Ok(RawResponse { status, body })
    }
}
