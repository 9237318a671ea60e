//! Distributed-tracing bootstrap.
//!
//! One-shot process-wide initialization of an OTLP tracer that samples every
//! span. The returned tracer is meant to be layered into `tracing-subscriber`
//! via `tracing_opentelemetry::layer().with_tracer(..)`. Tracing is mandatory
//! startup infrastructure; callers treat initialization failure as fatal.

use crate::error::{InfraError, InfraResult};
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, Tracer, TracerProvider};
use tracing::info;

/// Initialize the global tracer provider.
///
/// Builds an OTLP gRPC exporter for the collector at `endpoint`, wires it to
/// a batch tracer provider sampling all spans, registers the provider as the
/// process-wide global, and returns a tracer named after the service.
pub fn init(service_name: &str, endpoint: &str) -> InfraResult<Tracer> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| InfraError::telemetry(format!("Failed to build span exporter: {}", e)))?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build();

    let tracer = provider.tracer(service_name.to_string());
    global::set_tracer_provider(provider);

    info!(
        service_name = %service_name,
        endpoint = %endpoint,
        "Tracer initialized"
    );

    Ok(tracer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_init_builds_tracer() {
        // Exporter construction is lazy; no collector needs to be running.
        let result = init("platform-infra-test", "http://127.0.0.1:4317");
        assert!(result.is_ok());
    }
}
