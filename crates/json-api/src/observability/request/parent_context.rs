//! Upstream trace context read from W3C `traceparent` headers.

use opentelemetry::{Context, global, propagation::Extractor, trace::TraceContextExt as _};
use salvo::http::{HeaderMap, HeaderName};

/// Remote parent for the request span, if the caller sent a valid one.
///
/// Extraction starts from an empty context so a request without trace
/// headers becomes a new root instead of joining whatever span is current.
pub(super) fn extract_parent_context(headers: &HeaderMap) -> Option<Context> {
    let carrier = HeaderCarrier(headers);

    let context = global::get_text_map_propagator(|propagator| {
        propagator.extract_with_context(&Context::new(), &carrier)
    });

    let valid = context.span().span_context().is_valid();

    valid.then_some(context)
}

struct HeaderCarrier<'a>(&'a HeaderMap);

impl Extractor for HeaderCarrier<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use salvo::http::HeaderValue;

    use super::*;

    const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn headers(traceparent: Option<&'static str>) -> HeaderMap {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let mut headers = HeaderMap::new();

        if let Some(value) = traceparent {
            headers.insert("traceparent", HeaderValue::from_static(value));
        }

        headers
    }

    #[test]
    fn valid_traceparent_becomes_parent() {
        let context = extract_parent_context(&headers(Some(TRACEPARENT)));

        let trace_id =
            context.map(|context| context.span().span_context().trace_id().to_string());

        assert_eq!(
            trace_id.as_deref(),
            Some("4bf92f3577b34da6a3ce929d0e0e4736")
        );
    }

    #[test]
    fn missing_header_has_no_parent() {
        assert!(
            extract_parent_context(&headers(None)).is_none(),
            "no traceparent should mean no parent"
        );
    }

    #[test]
    fn malformed_header_has_no_parent() {
        assert!(
            extract_parent_context(&headers(Some("00-not-a-trace"))).is_none(),
            "malformed traceparent should be ignored"
        );
    }
}
