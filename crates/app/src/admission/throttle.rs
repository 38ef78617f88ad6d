//! Bound on requests processed at once.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    time::timeout,
};

use crate::admission::{config::ThrottleConfig, errors::ThrottleError};

#[derive(Debug, Clone)]
pub struct Throttle {
    semaphore: Arc<Semaphore>,
    limit: usize,
    acquire_timeout: Duration,
}

/// Held for the lifetime of a request; dropping it frees the slot.
#[derive(Debug)]
pub struct ThrottlePermit {
    _permit: OwnedSemaphorePermit,
}

impl Throttle {
    #[must_use]
    pub fn new(config: &ThrottleConfig) -> Self {
        let limit = config.max_concurrent_requests.max(1);

        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            acquire_timeout: config.acquire_timeout,
        }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Requests currently holding a permit.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.limit.saturating_sub(self.semaphore.available_permits())
    }

    /// Wait up to the acquire timeout for a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::Busy`] when no slot frees up in time.
    pub async fn acquire(&self) -> Result<ThrottlePermit, ThrottleError> {
        let busy = ThrottleError::Busy { limit: self.limit };

        match timeout(
            self.acquire_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => Ok(ThrottlePermit { _permit: permit }),
            Ok(Err(_)) | Err(_) => Err(busy),
        }
    }
}
