//! Request execution with bounded retries.
//!
//! Every call runs the same small state machine: build the request, send it,
//! classify the response with [`classify_status`], then either return, fail,
//! or back off and try again. At most [`MAX_ATTEMPTS`] attempts are made and
//! the backoff schedule is fixed (see [`backoff_delay`]).

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use super::retry::{
    MAX_ATTEMPTS, Sleeper, TokioSleeper, Verdict, backoff_delay, classify_status,
    has_attempts_left,
};
use super::transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
use crate::error::{Error, Result};
use crate::route::{Method, Route};

/// Header carrying the REST session token.
pub const SESSION_TOKEN_HEADER: &str = "BhRestToken";

/// Per-client request settings shared by every call.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub base_url: String,
    pub token: Option<String>,
    pub user_agent: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_deref().map(mask_token))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// What happened on one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Status(u16),
    Fault(String),
}

/// Diagnostic record emitted once per attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub outcome: AttemptOutcome,
    /// Set when the executor is about to sleep and retry.
    pub retry_in: Option<Duration>,
}

#[cfg_attr(test, mockall::automock)]
pub trait RequestLogger: Send + Sync {
    fn record(&self, record: &AttemptRecord);
}

/// Forwards attempt records to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequestLogger;

impl RequestLogger for LogRequestLogger {
    fn record(&self, record: &AttemptRecord) {
        let outcome = match &record.outcome {
            AttemptOutcome::Status(status) => status.to_string(),
            AttemptOutcome::Fault(fault) => fault.clone(),
        };
        let body = record.body.as_deref().unwrap_or("");

        match record.retry_in {
            Some(delay) => warn!(
                "{} {} with {} has returned {}, retrying in {}s ({}/{})",
                record.method,
                record.url,
                body,
                outcome,
                delay.as_secs(),
                record.attempt + 1,
                MAX_ATTEMPTS
            ),
            None => debug!(
                "{} {} with {} has returned {}",
                record.method, record.url, body, outcome
            ),
        }
    }
}

enum Step {
    Succeeded(Value),
    Backoff(Retry),
    Failed(Error),
}

enum Retry {
    Status(TransportResponse),
    Fault(TransportError),
}

impl Retry {
    /// The error surfaced once no attempts remain.
    fn into_error(self) -> Error {
        match self {
            Retry::Status(response) => Error::from_verdict(Verdict::Transient, response),
            Retry::Fault(fault) => Error::Transport(fault),
        }
    }
}

/// Executes routes against a [`Transport`], retrying transient failures.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    logger: Arc<dyn RequestLogger>,
}

impl Default for RequestExecutor {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestTransport::default()))
    }
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            sleeper: Arc::new(TokioSleeper),
            logger: Arc::new(LogRequestLogger),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Sends `route` and returns the parsed JSON body of the first 2xx response.
    ///
    /// Statuses in [`TRANSIENT_STATUSES`](super::retry::TRANSIENT_STATUSES)
    /// and refused/reset connections are retried; 403, 404, other 5xx and
    /// other non-2xx statuses fail immediately. Each backoff sleep is an
    /// `.await` point, so dropping the returned future cancels the call.
    #[tracing::instrument(skip(self, session, body), fields(route = %route.key()))]
    pub async fn execute(&self, session: &Session, route: &Route, body: Option<&Value>) -> Result<Value> {
        let request = build_request(session, route, body)?;

        let mut attempt = 0;
        loop {
            match self.attempt(attempt, &request).await {
                Step::Succeeded(value) => return Ok(value),
                Step::Failed(error) => return Err(error),
                Step::Backoff(retry) => {
                    if !has_attempts_left(attempt) {
                        return Err(retry.into_error());
                    }
                    self.sleeper.sleep(backoff_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Like [`execute`](Self::execute), deserializing the body into `T`.
    pub async fn execute_as<T: serde::de::DeserializeOwned>(
        &self,
        session: &Session,
        route: &Route,
        body: Option<&Value>,
    ) -> Result<T> {
        let value = self.execute(session, route, body).await?;
        from_value(value)
    }

    async fn attempt(&self, attempt: u32, request: &TransportRequest) -> Step {
        let result = self.transport.send(request.clone()).await;

        let (outcome, step) = match result {
            Ok(response) => {
                let status = response.status;
                let step = match classify_status(status) {
                    Verdict::Success => parse_body(response),
                    Verdict::Transient => Step::Backoff(Retry::Status(response)),
                    verdict => Step::Failed(Error::from_verdict(verdict, response)),
                };
                (AttemptOutcome::Status(status), step)
            }
            Err(fault) if fault.is_connection() => (
                AttemptOutcome::Fault(fault.to_string()),
                Step::Backoff(Retry::Fault(fault)),
            ),
            Err(fault) => (
                AttemptOutcome::Fault(fault.to_string()),
                Step::Failed(Error::Transport(fault)),
            ),
        };

        let retry_in = match step {
            Step::Backoff(_) if has_attempts_left(attempt) => Some(backoff_delay(attempt)),
            _ => None,
        };
        self.logger.record(&AttemptRecord {
            attempt,
            method: request.method,
            url: request.url.clone(),
            body: request.body.clone(),
            outcome,
            retry_in,
        });

        step
    }
}

fn parse_body(response: TransportResponse) -> Step {
    match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => Step::Succeeded(value),
        Err(source) => Step::Failed(Error::Parse {
            source,
            body: response.body,
        }),
    }
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    let body = value.to_string();
    serde_json::from_value(value).map_err(|source| Error::Parse { source, body })
}

fn build_request(session: &Session, route: &Route, body: Option<&Value>) -> Result<TransportRequest> {
    let mut headers = vec![("User-Agent".to_string(), session.user_agent.clone())];
    if let Some(token) = &session.token {
        headers.push((SESSION_TOKEN_HEADER.to_string(), token.clone()));
    }

    let body = match body {
        Some(value) => {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
            Some(encode_body(value)?)
        }
        None => None,
    };

    Ok(TransportRequest {
        method: route.method(),
        url: join_url(&session.base_url, route.url()),
        headers,
        body,
    })
}

/// Joins a relative route URL onto the REST base URL with a single '/'.
pub fn join_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Compact JSON with every non-ASCII character escaped as `\uXXXX`.
pub fn encode_body(value: &Value) -> Result<String> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
    value.serialize(&mut serializer).map_err(Error::Serialize)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
