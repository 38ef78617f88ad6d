//! Admission control: per-key request quotas and a bound on in-flight work.

pub mod alerts;
pub mod cache;
pub mod config;
pub mod errors;
pub mod key;
pub mod limiter;
pub mod memory;
pub mod postgres;
pub mod throttle;

pub use alerts::{AlertSink, LogAlertSink, RateLimitAlert, WebhookAlertSink, dispatch_alert};
pub use cache::{CounterCache, CounterValue, spawn_purger};
pub use config::{FailurePolicy, RateLimitConfig, ThrottleConfig};
pub use errors::{AlertError, CounterCacheError, RateLimitError, ThrottleError};
pub use limiter::{RateLimitDecision, RateLimiter};
pub use memory::MemoryCounterCache;
pub use postgres::PgCounterCache;
pub use throttle::{Throttle, ThrottlePermit};
