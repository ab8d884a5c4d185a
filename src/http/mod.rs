//! HTTP layer: transport seam, retry policy and the request executor.

mod executor;
mod retry;
mod transport;

pub use executor::{
    AttemptOutcome, AttemptRecord, LogRequestLogger, RequestExecutor, RequestLogger,
    SESSION_TOKEN_HEADER, Session, encode_body, join_url,
};
pub use retry::{
    MAX_ATTEMPTS, Sleeper, TRANSIENT_STATUSES, TokioSleeper, Verdict, backoff_delay,
    classify_status,
};
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};

#[cfg(test)]
pub(crate) use retry::MockSleeper;
#[cfg(test)]
pub(crate) use transport::MockTransport;
