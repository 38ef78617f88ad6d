//! Concurrency throttle middleware.

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    observability::{ActiveConnectionGuard, observe_throttle_rejection},
    state::State,
};

/// Server Busy Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct BusyResponse {
    pub error: String,
}

/// Hold a throttle slot for the rest of the pipeline, or answer 503 when
/// none frees up within the acquire timeout.
#[salvo::handler]
pub(crate) async fn throttle(
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

    let permit = match state.throttle.acquire().await {
        Ok(permit) => permit,
        Err(error) => {
            warn!(
                %error,
                in_flight = state.throttle.in_flight(),
                path = %req.uri().path(),
                "rejecting request: server busy"
            );

            observe_throttle_rejection();

            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(BusyResponse {
                error: "server busy".to_string(),
            }));
            ctrl.skip_rest();

            return;
        }
    };

    let active = ActiveConnectionGuard::track();

    ctrl.call_next(req, depot, res).await;

    drop(active);
    drop(permit);
}
