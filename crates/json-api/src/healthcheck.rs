//! Liveness probe with admission load.

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{extensions::*, state::State};

/// Healthcheck response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Requests currently holding a throttle permit
    pub in_flight: usize,

    /// Maximum concurrent requests the throttle admits
    pub capacity: usize,
}

/// Healthcheck handler
///
/// Reports liveness along with how many throttle slots are in use. The probe
/// sits outside the throttle so it still answers when the server is saturated.
#[endpoint(tags("health"), summary = "Health check endpoint")]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<HealthResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        in_flight: state.throttle.in_flight(),
        capacity: state.throttle.limit(),
    }))
}
