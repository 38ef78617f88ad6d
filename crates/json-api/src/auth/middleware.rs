//! Auth middleware.

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{http::header::AUTHORIZATION, prelude::*};
use storefront_app::auth::AuthServiceError;
use tracing::error;

use crate::{admission::client_ip, extensions::*, state::State};

const INVALID_HEADER: &str = "Missing or invalid Authorization header";
const INVALID_TOKEN: &str = "Invalid API token";

/// Resolve the bearer token, when one is sent, into the caller's identity.
///
/// Requests without an `Authorization` header pass through anonymously.
/// Credentials that do not authenticate are recorded rather than answered
/// here, so the rate limiter counts the attempt under the anonymous key
/// before [`require_user`] sends the 401. Once that key's quota is spent the
/// token is not looked up at all.
#[salvo::handler]
pub(crate) async fn identify(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    if req.headers().get(AUTHORIZATION).is_none() {
        ctrl.call_next(req, depot, res).await;

        return;
    }

    let Some(token) = extract_bearer_token(req) else {
        depot.insert_auth_rejection(INVALID_HEADER);
        ctrl.call_next(req, depot, res).await;

        return;
    };

    let state = match depot.obtain::<Arc<State>>() {
        Ok(state) => Arc::clone(state),
        Err(_error) => {
            res.render(StatusError::internal_server_error());
            ctrl.skip_rest();

            return;
        }
    };

    let anonymous_key = state.rate_limiter.key_for(
        None,
        &client_ip(req, depot),
        req.uri().path(),
        Timestamp::now(),
    );

    if state.rate_limiter.is_exhausted(&anonymous_key).await {
        depot.insert_auth_rejection(INVALID_TOKEN);
        ctrl.call_next(req, depot, res).await;

        return;
    }

    match state.app.auth.authenticate_bearer(token).await {
        Ok(user_uuid) => depot.insert_user_uuid(user_uuid),
        Err(AuthServiceError::NotFound | AuthServiceError::Token(_)) => {
            depot.insert_auth_rejection(INVALID_TOKEN);
        }
        Err(source @ (AuthServiceError::Sql(_) | AuthServiceError::InvalidReference)) => {
            error!("failed to validate api token: {source}");

            res.render(StatusError::internal_server_error());
            ctrl.skip_rest();

            return;
        }
    }

    ctrl.call_next(req, depot, res).await;
}

/// Reject requests that [`identify`] did not attach a user to, including
/// those whose credentials it refused.
#[salvo::handler]
pub(crate) async fn require_user(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    if let Err(error) = depot.user_uuid_or_401() {
        res.render(error);
        ctrl.skip_rest();

        return;
    }

    ctrl.call_next(req, depot, res).await;
}

fn extract_bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.splitn(2, ' ');

    let scheme = parts.next()?;
    let token = parts.next()?.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}
