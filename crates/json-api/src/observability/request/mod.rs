//! Per-request span, access log and latency metrics.

mod parent_context;
mod request_ids;
mod spans;

use std::time::{Duration, Instant};

use salvo::{
    Request, handler,
    http::StatusCode,
    prelude::{Depot, FlowCtrl, Response},
};
use tracing::{Instrument as _, Span, error, info, warn};
use tracing_opentelemetry::OpenTelemetrySpanExt as _;

use crate::{admission::client_ip, extensions::*};

use super::{metrics, settings};

const REQUEST_ID_DEPOT_KEY: &str = "request_id";

/// Probe endpoints skip the access log.
fn is_probe(path: &str) -> bool {
    matches!(path, "/metrics" | "/healthcheck")
}

#[handler]
pub(crate) async fn request_logging(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    if is_probe(req.uri().path()) {
        ctrl.call_next(req, depot, res).await;
        return;
    }

    let started = Instant::now();
    let _in_flight = metrics::InFlightRequestGuard::track();

    let request_id =
        request_ids::resolve_request_id(req.header::<String>(request_ids::REQUEST_ID_HEADER));

    request_ids::set_request_id_header(res, &request_id);
    depot.insert(REQUEST_ID_DEPOT_KEY, request_id.clone());

    let method = req.method().to_string();
    let route = spans::request_span_name(&method, req.uri().path());

    let span = tracing::info_span!(
        parent: None,
        "http.request",
        otel.name = %route.otel_span_name,
        otel.kind = "server",
        request_id = %request_id,
        method = %method,
        path = %req.uri().path(),
        client_ip = %client_ip(req, depot),
        user_uuid = tracing::field::Empty,
        status = tracing::field::Empty,
        duration_ms = tracing::field::Empty
    );

    if settings::otel_parent_propagation_enabled()
        && let Some(parent) = parent_context::extract_parent_context(req.headers())
        && let Err(source) = span.set_parent(parent)
    {
        warn!("failed to set parent context on request span: {source}");
    }

    ctrl.call_next(req, depot, res)
        .instrument(span.clone())
        .await;

    if let Some(user) = depot.user_uuid() {
        span.record("user_uuid", tracing::field::display(user));
    }

    let status = request_ids::response_status_or_ok(res.status_code);
    let elapsed = started.elapsed();

    metrics::observe_request(
        &method,
        &route.otel_path,
        status.as_u16(),
        elapsed.as_secs_f64(),
    );

    record_completion(&span, status, elapsed);
}

fn record_completion(span: &Span, status: StatusCode, elapsed: Duration) {
    let code = status.as_u16();
    let duration_ms = elapsed.as_millis();
    let threshold_ms = u128::from(settings::slow_request_threshold_ms());

    span.record("status", code);
    span.record("duration_ms", duration_ms);

    span.in_scope(|| {
        if status.is_server_error() {
            error!(status = code, duration_ms, "request failed");
        } else if status.is_client_error() {
            warn!(status = code, duration_ms, "request rejected");
        } else {
            info!(status = code, duration_ms, "request completed");
        }

        if duration_ms > threshold_ms {
            warn!(duration_ms, threshold_ms, "slow request");
        }
    });
}
