//! Background task that releases expired reservations.

use std::{sync::Arc, time::Duration};

use jiff::Timestamp;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::domain::reservations::service::ReservationsService;

/// Spawn the reaper on the current runtime.
///
/// The first pass runs immediately, then once every `period`. Abort the
/// returned handle to stop it.
pub fn spawn_reaper(service: Arc<dyn ReservationsService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            reap_once(service.as_ref()).await;
        }
    })
}

/// Run a single reaping pass, logging the outcome.
pub async fn reap_once(service: &dyn ReservationsService) {
    match service.reap_expired(Timestamp::now()).await {
        Ok(released) if released.is_empty() => {
            debug!("no expired stock reservations");
        }
        Ok(released) => {
            let units: u64 = released.iter().map(|r| u64::from(r.quantity)).sum();

            info!(
                reservations = released.len(),
                units, "released expired stock reservations"
            );
        }
        Err(error) => {
            warn!(%error, "failed to reap expired stock reservations");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::domain::reservations::{ReservationsServiceError, service::MockReservationsService};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reaper_runs_on_every_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut service = MockReservationsService::new();

        service.expect_reap_expired().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });

        let handle = spawn_reaper(Arc::new(service), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(125)).await;

        handle.abort();

        assert!(
            calls.load(Ordering::SeqCst) >= 3,
            "expected an immediate pass plus one per minute"
        );
    }

    #[tokio::test]
    async fn reap_once_swallows_errors() {
        let mut service = MockReservationsService::new();

        service
            .expect_reap_expired()
            .once()
            .returning(|_| Err(ReservationsServiceError::NotFound));

        reap_once(&service).await;
    }
}
