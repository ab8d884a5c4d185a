//! Error taxonomy for API calls.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::http::{TransportError, TransportResponse, Verdict};
use crate::route::TemplateError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// HTTP 403.
    #[error("{0}")]
    Forbidden(ApiFailure),

    /// HTTP 404.
    #[error("{0}")]
    NotFound(ApiFailure),

    /// HTTP 5xx, including transient statuses once retries run out.
    #[error("{0}")]
    Server(ApiFailure),

    /// Any other non-2xx status.
    #[error("{0}")]
    Http(ApiFailure),

    /// A successful response whose body is not the expected JSON.
    #[error("failed to parse response body: {source}")]
    Parse {
        source: serde_json::Error,
        body: String,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl Error {
    /// Details of the failed HTTP exchange, for the status-derived variants.
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            Error::Forbidden(f) | Error::NotFound(f) | Error::Server(f) | Error::Http(f) => Some(f),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.failure().map(|f| f.status)
    }

    /// Builds the variant for a failed response from its [`Verdict`].
    ///
    /// A transient status only reaches here once retries are exhausted, and
    /// then counts as a server error when it is a 5xx.
    pub(crate) fn from_verdict(verdict: Verdict, response: TransportResponse) -> Self {
        let status = response.status;
        let failure = ApiFailure::from_response(response);
        match verdict {
            Verdict::Forbidden => Error::Forbidden(failure),
            Verdict::NotFound => Error::NotFound(failure),
            Verdict::ServerError => Error::Server(failure),
            Verdict::Transient if status >= 500 => Error::Server(failure),
            Verdict::Transient | Verdict::ClientError | Verdict::Success => Error::Http(failure),
        }
    }
}

/// A non-2xx response and what the provider said about it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub status: u16,
    pub reason: String,
    /// Provider error code, 0 when the body carried none.
    pub code: i64,
    pub message: String,
    pub response: TransportResponse,
}

impl ApiFailure {
    pub fn from_response(response: TransportResponse) -> Self {
        let (code, message) = match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(body)) => (error_code(&body), error_message(&body)),
            Ok(Value::String(text)) => (0, text),
            _ => (0, response.body.clone()),
        };

        Self {
            status: response.status,
            reason: response.reason.clone(),
            code,
            message,
            response,
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if !self.reason.is_empty() {
            write!(f, " {}", self.reason)?;
        }
        write!(f, " (error code: {})", self.code)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

fn error_code(body: &Map<String, Value>) -> i64 {
    body.get("code")
        .or_else(|| body.get("errorCode"))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

fn error_message(body: &Map<String, Value>) -> String {
    let base = body
        .get("message")
        .or_else(|| body.get("errorMessage"))
        .map(value_text)
        .unwrap_or_default();

    let mut details = Vec::new();
    match body.get("errors") {
        Some(Value::Object(errors)) => flatten_errors(errors, "", &mut details),
        Some(Value::Array(errors)) => collect_error_list(errors, &mut details),
        _ => {}
    }

    if details.is_empty() {
        return base;
    }

    let lines: Vec<String> = details
        .into_iter()
        .map(|(path, message)| format!("{}: {}", path, message))
        .collect();
    format!("{}\n{}", base, lines.join("\n"))
}

/// Flattens `{"a": {"b": {"_errors": [{"message": "..."}]}}}` into `("a.b", "...")`.
fn flatten_errors(errors: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, value) in errors {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(nested) => match nested.get("_errors") {
                Some(Value::Array(leaf)) => {
                    let messages: Vec<String> = leaf
                        .iter()
                        .map(|e| e.get("message").map(value_text).unwrap_or_default())
                        .collect();
                    out.push((path, messages.join(" ")));
                }
                _ => flatten_errors(nested, &path, out),
            },
            other => out.push((path, value_text(other))),
        }
    }
}

/// Bullhorn validation errors: `[{"propertyName": "...", "detailMessage": "..."}]`.
fn collect_error_list(errors: &[Value], out: &mut Vec<(String, String)>) {
    for error in errors {
        let Value::Object(error) = error else {
            continue;
        };
        let path = error
            .get("propertyName")
            .or_else(|| error.get("field"))
            .map(value_text);
        let message = error
            .get("detailMessage")
            .or_else(|| error.get("message"))
            .map(value_text);
        if let (Some(path), Some(message)) = (path, message) {
            out.push((path, message));
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
