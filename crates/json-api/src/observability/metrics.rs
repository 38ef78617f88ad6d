//! Prometheus metrics collection and exposition endpoint.

use std::sync::OnceLock;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, core::Collector,
};
use salvo::{
    Request, Response, handler,
    http::{
        StatusCode,
        header::{CONTENT_TYPE, HeaderValue},
    },
};
use tracing::error;

#[derive(Debug)]
struct HttpMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    requests_in_flight: IntGauge,
    active_connections: IntGauge,
    rate_limit_rejections_total: IntCounterVec,
    throttle_rejections_total: IntCounter,
    rate_limit_cache_total: IntCounterVec,
}

static HTTP_METRICS: OnceLock<Option<HttpMetrics>> = OnceLock::new();

#[derive(Debug)]
pub(super) struct InFlightRequestGuard {
    tracked: bool,
}

impl InFlightRequestGuard {
    pub(super) fn track() -> Self {
        if let Some(metrics) = metrics() {
            metrics.requests_in_flight.inc();
            return Self { tracked: true };
        }

        Self { tracked: false }
    }
}

impl Drop for InFlightRequestGuard {
    fn drop(&mut self) {
        if self.tracked
            && let Some(metrics) = metrics()
        {
            metrics.requests_in_flight.dec();
        }
    }
}

/// Counts a request admitted past the throttle for as long as it is held.
#[derive(Debug)]
pub(crate) struct ActiveConnectionGuard {
    tracked: bool,
}

impl ActiveConnectionGuard {
    pub(crate) fn track() -> Self {
        if let Some(metrics) = metrics() {
            metrics.active_connections.inc();
            return Self { tracked: true };
        }

        Self { tracked: false }
    }
}

impl Drop for ActiveConnectionGuard {
    fn drop(&mut self) {
        if self.tracked
            && let Some(metrics) = metrics()
        {
            metrics.active_connections.dec();
        }
    }
}

pub(super) fn observe_request(method: &str, route: &str, status_code: u16, duration_seconds: f64) {
    let Some(metrics) = metrics() else {
        return;
    };

    let status_class = status_class(status_code);
    let status_code = status_code.to_string();

    metrics
        .requests_total
        .with_label_values(&[method, route, status_class, status_code.as_str()])
        .inc();

    metrics
        .request_duration_seconds
        .with_label_values(&[method, route])
        .observe(duration_seconds);
}

pub(crate) fn observe_rate_limit_rejection(path_bucket: &str) {
    if let Some(metrics) = metrics() {
        metrics
            .rate_limit_rejections_total
            .with_label_values(&[path_bucket])
            .inc();
    }
}

pub(crate) fn observe_throttle_rejection() {
    if let Some(metrics) = metrics() {
        metrics.throttle_rejections_total.inc();
    }
}

/// A hit is an increment on an existing counter; a miss opened a new window.
pub(crate) fn observe_rate_limit_cache(hit: bool) {
    if let Some(metrics) = metrics() {
        metrics
            .rate_limit_cache_total
            .with_label_values(&[if hit { "hit" } else { "miss" }])
            .inc();
    }
}

#[handler]
pub(crate) async fn metrics_handler(_req: &mut Request, res: &mut Response) {
    let Some(metrics) = metrics() else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };

    let encoder = TextEncoder::new();
    let metric_families = metrics.registry.gather();

    let mut encoded = Vec::new();

    if let Err(source) = encoder.encode(&metric_families, &mut encoded) {
        error!("failed to encode metrics response: {source}");
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

        return;
    }

    let content_type = match HeaderValue::from_str(encoder.format_type()) {
        Ok(value) => value,
        Err(source) => {
            error!("failed to encode metrics content type header: {source}");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

            return;
        }
    };

    res.headers_mut().insert(CONTENT_TYPE, content_type);
    res.render(String::from_utf8_lossy(&encoded).into_owned());
}

fn metrics() -> Option<&'static HttpMetrics> {
    HTTP_METRICS.get_or_init(build_metrics).as_ref()
}

fn register<C>(registry: &Registry, name: &str, metric: Result<C, prometheus::Error>) -> Option<C>
where
    C: Collector + Clone + 'static,
{
    let metric = match metric {
        Ok(metric) => metric,
        Err(source) => {
            error!("failed to create {name} metric: {source}");
            return None;
        }
    };

    if let Err(source) = registry.register(Box::new(metric.clone())) {
        error!("failed to register {name} metric: {source}");
        return None;
    }

    Some(metric)
}

fn build_metrics() -> Option<HttpMetrics> {
    let registry = Registry::new();

    let requests_total = register(
        &registry,
        "requests_total",
        IntCounterVec::new(
            Opts::new(
                "storefront_json_http_requests_total",
                "Total HTTP requests partitioned by method, route, status class, and status code.",
            ),
            &["method", "route", "status_class", "status_code"],
        ),
    )?;

    let request_duration_seconds = register(
        &registry,
        "request_duration",
        HistogramVec::new(
            HistogramOpts::new(
                "storefront_json_http_request_duration_seconds",
                "HTTP request duration in seconds partitioned by method and route.",
            )
            .buckets(vec![
                0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "route"],
        ),
    )?;

    let requests_in_flight = register(
        &registry,
        "in-flight gauge",
        IntGauge::with_opts(Opts::new(
            "storefront_json_http_requests_in_flight",
            "Current number of in-flight HTTP requests.",
        )),
    )?;

    let active_connections = register(
        &registry,
        "active connections gauge",
        IntGauge::with_opts(Opts::new(
            "storefront_json_active_connections",
            "Requests currently holding a throttle permit.",
        )),
    )?;

    let rate_limit_rejections_total = register(
        &registry,
        "rate_limit_rejections_total",
        IntCounterVec::new(
            Opts::new(
                "storefront_json_rate_limit_rejections_total",
                "Requests rejected for exceeding their quota, partitioned by path bucket.",
            ),
            &["path_bucket"],
        ),
    )?;

    let throttle_rejections_total = register(
        &registry,
        "throttle_rejections_total",
        IntCounter::with_opts(Opts::new(
            "storefront_json_throttle_rejections_total",
            "Requests rejected because no throttle permit freed up in time.",
        )),
    )?;

    let rate_limit_cache_total = register(
        &registry,
        "rate_limit_cache_total",
        IntCounterVec::new(
            Opts::new(
                "storefront_json_rate_limit_cache_total",
                "Rate-limit counter lookups partitioned by hit or miss.",
            ),
            &["result"],
        ),
    )?;

    Some(HttpMetrics {
        registry,
        requests_total,
        request_duration_seconds,
        requests_in_flight,
        active_connections,
        rate_limit_rejections_total,
        throttle_rejections_total,
        rate_limit_cache_total,
    })
}

fn status_class(status_code: u16) -> &'static str {
    match status_code {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}
