//! State

use std::{fmt, sync::Arc};

use storefront_app::{
    admission::{AlertSink, RateLimiter, Throttle},
    context::AppContext,
};

use crate::admission::ClientIpResolver;

#[derive(Clone)]
pub(crate) struct State {
    pub(crate) app: AppContext,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) throttle: Throttle,
    pub(crate) alerts: Arc<dyn AlertSink>,
    pub(crate) client_ip: ClientIpResolver,
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("app", &self.app)
            .field("rate_limiter", &self.rate_limiter)
            .field("throttle", &self.throttle)
            .field("client_ip", &self.client_ip)
            .finish_non_exhaustive()
    }
}

impl State {
    #[must_use]
    pub(crate) fn new(
        app: AppContext,
        rate_limiter: RateLimiter,
        throttle: Throttle,
        alerts: Arc<dyn AlertSink>,
        client_ip: ClientIpResolver,
    ) -> Arc<Self> {
        Arc::new(Self {
            app,
            rate_limiter,
            throttle,
            alerts,
            client_ip,
        })
    }
}
