//! Request and response types for a single transport attempt

use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One logical request. Cloneable so it can be replayed on retry.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    /// Per-attempt timeout override
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: RequestBody::Json(body),
            timeout: None,
        }
    }

    pub fn post_form(path: impl Into<String>, form: FormBody) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: RequestBody::Form(form),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(FormBody),
}

/// Multipart form: text fields plus at most one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBody {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl FormBody {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Whatever came back over the wire, success or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best human-readable description of a failed response.
    ///
    /// Prefers a JSON `error` or `message` field, then the raw body, then the
    /// canonical reason phrase for the status.
    pub fn error_message(&self) -> String {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&self.body) {
            for key in ["error", "message"] {
                if let Some(Value::String(message)) = map.get(key) {
                    return message.clone();
                }
            }
        }

        let body = self.body.trim();
        if !body.is_empty() {
            return body.to_string();
        }

        reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .map_or_else(|| format!("HTTP {}", self.status), str::to_string)
    }
}
