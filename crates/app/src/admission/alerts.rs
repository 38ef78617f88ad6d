//! Notifications for rejected requests.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::admission::errors::AlertError;

/// A request rejected by the rate limiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitAlert {
    pub principal: String,
    pub client_ip: String,
    pub path: String,
    pub user_agent: Option<String>,
    pub current_count: u64,
    pub limit: u64,
    pub occurred_at: Timestamp,
}

#[automock]
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: RateLimitAlert) -> Result<(), AlertError>;
}

/// Writes alerts to the `alerts` log target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, alert: RateLimitAlert) -> Result<(), AlertError> {
        warn!(
            target: "alerts",
            principal = %alert.principal,
            client_ip = %alert.client_ip,
            path = %alert.path,
            user_agent = alert.user_agent.as_deref().unwrap_or("-"),
            current_count = alert.current_count,
            limit = alert.limit,
            "rate limit exceeded"
        );

        Ok(())
    }
}

/// Posts alerts as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookAlertSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookAlertSink {
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// A sink whose deliveries give up after `timeout`, so a slow webhook
    /// cannot hold background tasks open.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::Webhook`] if the HTTP client cannot be built.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self::new(client, url))
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn send(&self, alert: RateLimitAlert) -> Result<(), AlertError> {
        self.client
            .post(&self.url)
            .json(&alert)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

/// Deliver `alert` in the background so the rejected request is not delayed.
pub fn dispatch_alert(sink: Arc<dyn AlertSink>, alert: RateLimitAlert) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(error) = sink.send(alert).await {
            warn!(error = %error, "failed to deliver rate limit alert");
        }
    })
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn alert() -> RateLimitAlert {
        RateLimitAlert {
            principal: "anonymous".to_string(),
            client_ip: "10.0.0.9".to_string(),
            path: "/orders".to_string(),
            user_agent: Some("curl/8".to_string()),
            current_count: 1001,
            limit: 1000,
            occurred_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn alert_serializes_camel_case() -> TestResult {
        let json = serde_json::to_value(alert())?;

        assert_eq!(json["clientIp"], "10.0.0.9");
        assert_eq!(json["currentCount"], 1001);
        assert_eq!(json["userAgent"], "curl/8");

        Ok(())
    }

    #[tokio::test]
    async fn dispatch_delivers_to_sink() -> TestResult {
        let mut sink = MockAlertSink::new();
        sink.expect_send()
            .withf(|alert| alert.current_count == 1001)
            .times(1)
            .returning(|_| Ok(()));

        dispatch_alert(Arc::new(sink), alert()).await?;

        Ok(())
    }

    #[test]
    fn webhook_sink_builds_with_timeout() -> TestResult {
        let sink = WebhookAlertSink::with_timeout(
            "http://127.0.0.1:9/alerts",
            Duration::from_millis(500),
        )?;

        assert_eq!(sink.url, "http://127.0.0.1:9/alerts");

        Ok(())
    }

    #[tokio::test]
    async fn webhook_failure_is_reported() {
        let sink = WebhookAlertSink::with_timeout(
            "http://127.0.0.1:9/alerts",
            Duration::from_millis(200),
        );

        let result = match sink {
            Ok(sink) => sink.send(alert()).await,
            Err(error) => Err(error),
        };

        assert!(
            matches!(result, Err(AlertError::Webhook(_))),
            "unreachable webhook should fail, got {result:?}"
        );
    }

    #[tokio::test]
    async fn log_sink_always_succeeds() -> TestResult {
        LogAlertSink.send(alert()).await?;

        Ok(())
    }
}
