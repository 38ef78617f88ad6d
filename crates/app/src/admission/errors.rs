//! Admission control errors.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterCacheError {
    #[error("counter cache did not answer within {0:?}")]
    Timeout(Duration),

    #[error("counter cache unavailable")]
    Unavailable(#[source] sqlx::Error),
}

impl From<sqlx::Error> for CounterCacheError {
    fn from(error: sqlx::Error) -> Self {
        Self::Unavailable(error)
    }
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Raised only under [`FailurePolicy::Closed`](crate::admission::FailurePolicy::Closed).
    #[error("rate limit state unavailable")]
    Cache(#[from] CounterCacheError),
}

#[derive(Debug, Error)]
pub enum ThrottleError {
    #[error("server busy: {limit} requests already in flight")]
    Busy { limit: usize },
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert webhook request failed")]
    Webhook(#[from] reqwest::Error),
}
