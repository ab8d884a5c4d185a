//! Retry policy: attempt budget, transient statuses and the backoff schedule.

use async_trait::async_trait;
use std::time::Duration;

/// Maximum number of attempts per request (attempt indices `0..MAX_ATTEMPTS`).
pub const MAX_ATTEMPTS: u32 = 5;

/// Statuses worth retrying: rate limiting and gateway/upstream failures.
pub const TRANSIENT_STATUSES: [u16; 6] = [429, 500, 502, 503, 504, 524];

/// How a response status should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Transient,
    Forbidden,
    NotFound,
    ServerError,
    ClientError,
}

/// Maps a status code to the action the executor takes.
pub fn classify_status(status: u16) -> Verdict {
    match status {
        200..=299 => Verdict::Success,
        s if TRANSIENT_STATUSES.contains(&s) => Verdict::Transient,
        403 => Verdict::Forbidden,
        404 => Verdict::NotFound,
        s if s >= 500 => Verdict::ServerError,
        _ => Verdict::ClientError,
    }
}

/// Delay before the attempt after `attempt`: 1s, 3s, 5s, 7s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 + u64::from(attempt) * 2)
}

/// Whether another attempt may follow `attempt`.
pub fn has_attempts_left(attempt: u32) -> bool {
    attempt + 1 < MAX_ATTEMPTS
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
