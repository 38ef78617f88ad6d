//! OpenTelemetry tracer provider setup.

use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};

use crate::config::observability::ObservabilityConfig;

use super::ObservabilityError;

const SERVICE_NAMESPACE: &str = "storefront";

pub(super) fn build_tracer_provider(
    config: &ObservabilityConfig,
) -> Result<SdkTracerProvider, ObservabilityError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otel_exporter_otlp_endpoint.clone())
        .with_timeout(Duration::from_secs(
            config.otel_exporter_otlp_timeout_seconds,
        ))
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            clamp_sample_ratio(config.otel_trace_sample_ratio),
        ))))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource(config))
        .with_batch_exporter(exporter)
        .build())
}

fn resource(config: &ObservabilityConfig) -> Resource {
    Resource::builder_empty()
        .with_service_name(config.otel_service_name.clone())
        .with_attributes([
            KeyValue::new("service.namespace", SERVICE_NAMESPACE),
            KeyValue::new("service.version", config.otel_service_version.clone()),
            KeyValue::new(
                "deployment.environment.name",
                config.otel_deployment_environment.clone(),
            ),
        ])
        .build()
}

fn clamp_sample_ratio(sample_ratio: f64) -> f64 {
    sample_ratio.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use opentelemetry::{Key, Value};

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        observability: ObservabilityConfig,
    }

    #[test]
    fn resource_carries_service_identity() -> Result<(), clap::Error> {
        let harness =
            Harness::try_parse_from(["test", "--otel-deployment-environment", "staging"])?;

        let resource = resource(&harness.observability);

        assert_eq!(
            resource.get(&Key::from_static_str("service.name")),
            Some(Value::from("storefront-json"))
        );
        assert_eq!(
            resource.get(&Key::from_static_str("service.namespace")),
            Some(Value::from("storefront"))
        );
        assert_eq!(
            resource.get(&Key::from_static_str("deployment.environment.name")),
            Some(Value::from("staging"))
        );

        Ok(())
    }

    #[test]
    fn sample_ratio_is_clamped() {
        assert!((clamp_sample_ratio(-0.5) - 0.0).abs() < f64::EPSILON, "negative clamps to 0");
        assert!((clamp_sample_ratio(2.0) - 1.0).abs() < f64::EPSILON, "above one clamps to 1");
        assert!((clamp_sample_ratio(0.25) - 0.25).abs() < f64::EPSILON, "in range is kept");
    }
}
