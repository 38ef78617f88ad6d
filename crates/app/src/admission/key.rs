//! Rate-limit counter keys.

use std::time::Duration;

use jiff::Timestamp;

/// Principal used when the request carries no identity.
pub const ANONYMOUS: &str = "anonymous";

/// The first path segment, or `root` for `/`.
#[must_use]
pub fn path_bucket(path: &str) -> &str {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("root")
}

/// Index of the counting window containing `now`.
///
/// With a 60 minute window this is the hour bucket.
#[must_use]
pub fn window_bucket(now: Timestamp, window_minutes: u64) -> u64 {
    let minutes = u64::try_from(now.as_second().max(0)).unwrap_or(0) / 60;

    minutes / window_minutes.max(1)
}

/// Time from `now` until the window containing it closes and keys roll over.
#[must_use]
pub fn until_next_window(now: Timestamp, window_minutes: u64) -> Duration {
    let window_nanos = i128::from(window_minutes.max(1)) * 60 * 1_000_000_000;
    let elapsed = now.as_nanosecond().rem_euclid(window_nanos);

    Duration::from_nanos(u64::try_from(window_nanos - elapsed).unwrap_or(u64::MAX))
}

/// Build the key `{principal}_{client_ip}_{path_bucket}_{window_bucket}`.
#[must_use]
pub fn rate_limit_key(
    principal: Option<&str>,
    client_ip: &str,
    path: &str,
    now: Timestamp,
    window_minutes: u64,
) -> String {
    format!(
        "{}_{}_{}_{}",
        principal.unwrap_or(ANONYMOUS),
        client_ip,
        path_bucket(path),
        window_bucket(now, window_minutes),
    )
}
