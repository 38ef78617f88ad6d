//! Rate limit middleware.

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{http::header::RETRY_AFTER, oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use storefront_app::admission::{
    RateLimitAlert, RateLimitDecision, dispatch_alert,
    key::{ANONYMOUS, path_bucket},
};

use crate::{
    admission::client_ip,
    extensions::*,
    observability::{observe_rate_limit_cache, observe_rate_limit_rejection},
    state::State,
};

/// Rate Limited Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RateLimitedResponse {
    pub error: String,

    /// Seconds until the current window resets.
    pub retry_after: u64,

    pub details: RateLimitDetails,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RateLimitDetails {
    pub current_count: u64,
    pub limit: u64,

    /// Window length in minutes.
    pub window_size: u64,
}

/// Count the request against its key and answer 429 once the key's quota
/// for the window is spent.
#[salvo::handler]
pub(crate) async fn rate_limit(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let state = match depot.obtain::<Arc<State>>() {
        Ok(state) => Arc::clone(state),
        Err(_error) => {
            res.render(StatusError::internal_server_error());
            ctrl.skip_rest();

            return;
        }
    };

    let limiter = &state.rate_limiter;
    let principal = depot.user_uuid().map(|user| user.to_string());
    let client_ip = client_ip(req, depot);
    let path = req.uri().path().to_owned();
    let now = Timestamp::now();

    let key = limiter.key_for(principal.as_deref(), &client_ip, &path, now);

    let decision = match limiter.check(&key, now).await {
        Ok(decision) => decision,
        Err(source) => {
            error!("rate limit check failed: {source}");

            res.render(StatusError::internal_server_error());
            ctrl.skip_rest();

            return;
        }
    };

    if limiter.config().enabled && !decision.degraded {
        observe_rate_limit_cache(!decision.new_window);
    }

    if decision.allowed {
        ctrl.call_next(req, depot, res).await;

        return;
    }

    let alert = RateLimitAlert {
        principal: principal.unwrap_or_else(|| ANONYMOUS.to_string()),
        client_ip,
        path,
        user_agent: req.header::<String>("user-agent"),
        current_count: decision.current_count,
        limit: decision.limit,
        occurred_at: now,
    };

    warn!(
        target: "security",
        principal = %alert.principal,
        client_ip = %alert.client_ip,
        path = %alert.path,
        user_agent = alert.user_agent.as_deref().unwrap_or("unknown"),
        current_count = alert.current_count,
        limit = alert.limit,
        "rate limit exceeded"
    );

    observe_rate_limit_rejection(path_bucket(&alert.path));

    // One alert per key per window; the response never waits on delivery.
    if decision.first_rejection() {
        drop(dispatch_alert(Arc::clone(&state.alerts), alert));
    }

    reject(res, &decision, limiter.config().window_minutes());
    ctrl.skip_rest();
}

fn reject(res: &mut Response, decision: &RateLimitDecision, window_minutes: u64) {
    let retry_after = decision
        .retry_after
        .map_or(1, |retry_after| retry_after.as_secs());

    if let Err(source) = res.add_header(RETRY_AFTER, retry_after.to_string(), true) {
        warn!("failed to set retry-after header: {source}");
    }

    res.status_code(StatusCode::TOO_MANY_REQUESTS);
    res.render(Json(RateLimitedResponse {
        error: "rate limit exceeded".to_string(),
        retry_after,
        details: RateLimitDetails {
            current_count: decision.current_count,
            limit: decision.limit,
            window_size: window_minutes,
        },
    }));
}
