//! Logging subscriber initialisation.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{
    EnvFilter, Registry,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, ServerConfig};

use super::ObservabilityError;

pub(super) fn init_subscriber(
    config: &ServerConfig,
    tracer_provider: Option<&SdkTracerProvider>,
) -> Result<(), ObservabilityError> {
    match config.logging.log_format {
        LogFormat::Compact => init_with_layer(
            config,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
            tracer_provider,
        ),
        LogFormat::Json => init_with_layer(
            config,
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true),
            tracer_provider,
        ),
    }
}

fn build_env_filter(config: &ServerConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.logging.log_level)))
}

/// Rejection and alert events stay visible even when the base level is
/// `error`; noisy transport and pool crates are held at `warn`.
fn default_directives(level: &str) -> String {
    format!(
        "{level},security=warn,alerts=warn,sqlx=warn,reqwest=warn,h2=warn,hyper=warn,tower=warn,tonic=warn,opentelemetry=warn"
    )
}

fn init_with_layer<L>(
    config: &ServerConfig,
    fmt_layer: L,
    tracer_provider: Option<&SdkTracerProvider>,
) -> Result<(), ObservabilityError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_env_filter(config));

    if let Some(tracer_provider) = tracer_provider {
        let tracer = tracer_provider.tracer(config.observability.otel_service_name.clone());

        subscriber
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()?;
    } else {
        subscriber.try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_level_leads_directives() {
        assert!(
            default_directives("debug").starts_with("debug,"),
            "base level should come first"
        );
    }

    #[test]
    fn security_targets_survive_error_level() {
        let directives = default_directives("error");

        assert!(directives.contains("security=warn"), "got {directives}");
        assert!(directives.contains("alerts=warn"), "got {directives}");
    }

    #[test]
    fn directives_parse_as_filter() {
        assert!(
            EnvFilter::try_new(default_directives("info")).is_ok(),
            "default directives should parse"
        );
    }
}
