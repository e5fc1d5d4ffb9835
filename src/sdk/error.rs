//! Errors returned by the frontend API client.
//!
//! Every non-2xx answer keeps its status and parsed body so the recovery
//! handler can classify it by payload shape.

use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("identity provider responded {status}")]
    Response {
        status: StatusCode,
        status_text: String,
        data: Value,
    },
    #[error("identity provider unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("failed to decode identity provider response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid identity provider URL: {0}")]
    Url(#[from] url::ParseError),
}

impl SdkError {
    /// Builds a response error from a status and body, mostly for fetchers and tests.
    #[must_use]
    pub fn response(status: StatusCode, data: Value) -> Self {
        Self::Response {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            data,
        }
    }

    /// HTTP status of the provider answer, `None` when there was no answer.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed body of the provider answer.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Response { data, .. } => Some(data),
            _ => None,
        }
    }

    /// `error.id` of a generic error payload, falling back to a top-level `id`.
    #[must_use]
    pub fn error_id(&self) -> Option<&str> {
        let data = self.data()?;
        data.pointer("/error/id")
            .and_then(Value::as_str)
            .or_else(|| data.get("id").and_then(Value::as_str))
    }

    #[must_use]
    pub fn redirect_browser_to(&self) -> Option<&str> {
        self.data()?.get("redirect_browser_to")?.as_str()
    }

    #[must_use]
    pub fn use_flow_id(&self) -> Option<&str> {
        let data = self.data()?;
        data.get("use_flow_id")
            .or_else(|| data.pointer("/error/details/use_flow_id"))
            .and_then(Value::as_str)
    }

    /// First flow-level UI message (`ui.messages[0].text`).
    #[must_use]
    pub fn first_ui_message(&self) -> Option<&str> {
        self.data()?.pointer("/ui/messages/0/text")?.as_str()
    }

    /// Serializable context for the generic error page.
    #[must_use]
    pub fn context(&self, url: &Url) -> Value {
        match self {
            Self::Response {
                status,
                status_text,
                data,
            } => json!({
                "data": data,
                "status": status.as_u16(),
                "statusText": status_text,
                "url": url.as_str(),
            }),
            other => json!({
                "data": other.to_string(),
                "status": 0,
                "statusText": "",
                "url": url.as_str(),
            }),
        }
    }
}
