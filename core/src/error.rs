//! Error types for the MoySklad API client.
//!
//! # Design
//! Infrastructure failures (`Transport`) are kept apart from business-logic
//! failures reported by the server (`Api`) so callers can branch on them. A
//! 2xx response whose body does not fit the expected shape is a `Decode`
//! error and is never coerced into a partial value.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::async_result::AsyncState;
use crate::http::TransportError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One entry of the server's `{"errors": [...]}` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
}

impl std::fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.error) {
            (Some(code), Some(error)) => write!(f, "[{code}] {error}"),
            (None, Some(error)) => f.write_str(error),
            (Some(code), None) => write!(f, "[{code}]"),
            (None, None) => f.write_str("unknown error"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

/// Errors returned by every client operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport could not complete the exchange.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// The server answered with a non-2xx status.
    #[error("API error (HTTP {status}): {}", summarize(.errors, .body))]
    Api {
        status: u16,
        errors: Vec<ApiErrorDetail>,
        body: String,
    },

    /// The server answered 2xx but the body did not match the expected type.
    #[error("malformed response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// An asynchronous job finished without producing a result.
    #[error("async job finished with state {state}: {reason}")]
    AsyncJobFailed { state: AsyncState, reason: String },

    /// The caller's deadline elapsed before the job completed.
    #[error("gave up waiting after {0:?}")]
    Timeout(Duration),

    /// The async submit response lacked a job descriptor header.
    #[error("response is missing the {0} header")]
    MissingHeader(&'static str),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Builds an `Api` error from a non-2xx status and its body.
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        let errors = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|parsed| parsed.errors)
            .unwrap_or_default();
        Error::Api { status, errors, body }
    }

    /// HTTP status of an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Server-provided error entries of an `Api` error.
    pub fn api_errors(&self) -> &[ApiErrorDetail] {
        match self {
            Error::Api { errors, .. } => errors,
            _ => &[],
        }
    }
}

fn summarize(errors: &[ApiErrorDetail], body: &str) -> String {
    if errors.is_empty() {
        return body.to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
