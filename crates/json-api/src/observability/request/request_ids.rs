//! Request IDs echoed back to callers.

use salvo::{
    http::{StatusCode, header::HeaderValue},
    prelude::Response,
};
use uuid::Uuid;

pub(super) const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Keep a caller-supplied ID when it is short printable ASCII; otherwise mint
/// a time-ordered UUID.
pub(super) fn resolve_request_id(header_value: Option<String>) -> String {
    header_value
        .map(|value| value.trim().to_owned())
        .filter(|value| is_acceptable(value))
        .unwrap_or_else(|| Uuid::now_v7().to_string())
}

fn is_acceptable(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value.bytes().all(|byte| byte.is_ascii_graphic())
}

pub(super) fn set_request_id_header(res: &mut Response, request_id: &str) {
    // resolve_request_id only yields visible ASCII, which always encodes.
    if let Ok(value) = HeaderValue::from_str(request_id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}

pub(super) fn response_status_or_ok(status_code: Option<StatusCode>) -> StatusCode {
    status_code.unwrap_or(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_generated(id: &str) -> bool {
        Uuid::parse_str(id).is_ok()
    }

    #[test]
    fn incoming_request_id_is_kept() {
        assert_eq!(resolve_request_id(Some("checkout-42".to_string())), "checkout-42");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(resolve_request_id(Some(" abc ".to_string())), "abc");
    }

    #[test]
    fn missing_or_blank_id_is_generated() {
        let missing = resolve_request_id(None);
        let blank = resolve_request_id(Some("  ".to_string()));

        assert!(is_generated(&missing), "expected a uuid, got {missing}");
        assert!(is_generated(&blank), "expected a uuid, got {blank}");
    }

    #[test]
    fn oversized_or_spaced_id_is_replaced() {
        let oversized = resolve_request_id(Some("x".repeat(MAX_REQUEST_ID_LEN + 1)));
        let spaced = resolve_request_id(Some("two words".to_string()));

        assert!(is_generated(&oversized), "expected a uuid, got {oversized}");
        assert!(is_generated(&spaced), "expected a uuid, got {spaced}");
    }

    #[test]
    fn header_is_set_on_response() {
        let mut res = Response::new();

        set_request_id_header(&mut res, "abc");

        assert_eq!(
            res.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()),
            Some("abc")
        );
    }
}
