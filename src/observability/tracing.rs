use opentelemetry::{global, trace::TraceError, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{self as sdktrace, RandomIdGenerator, Sampler},
    Resource,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn, Subscriber};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::ObservabilityConfig;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Failed to initialize OpenTelemetry: {0}")]
    OpenTelemetryInit(#[from] TraceError),
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Install the global subscriber. Spans are exported over OTLP only when an
/// endpoint is configured; logs always go to stdout.
pub fn init_observability(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let otel_layer = match otlp_endpoint(config) {
        Some(endpoint) => Some(OpenTelemetryLayer::new(otlp_tracer(config, endpoint)?)),
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.service_name, &config.log_level))
        .with(otel_layer)
        .with(log_layer(config.enable_json_logging))
        .try_init()
        .map_err(|e| ObservabilityError::TracingInit(e.to_string()))?;

    info!(
        service = %config.service_name,
        version = %config.service_version,
        sample_ratio = config.trace_sample_ratio,
        otlp = otlp_endpoint(config).is_some(),
        "Observability initialized"
    );
    Ok(())
}

fn otlp_endpoint(config: &ObservabilityConfig) -> Option<&str> {
    config
        .otlp_endpoint
        .as_deref()
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
}

/// `RUST_LOG` wins; otherwise our crate and tower_http log at the configured level
fn env_filter(service_name: &str, log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let crate_target = service_name.replace('-', "_");
        EnvFilter::new(format!(
            "{crate_target}={log_level},tower_http={log_level},aws_config=warn,aws_smithy_runtime=warn,redis=warn"
        ))
    })
}

fn log_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    if json {
        layer
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        layer.boxed()
    }
}

fn otlp_tracer(
    config: &ObservabilityConfig,
    endpoint: &str,
) -> Result<sdktrace::Tracer, ObservabilityError> {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("service.namespace", "reggie"),
    ]);

    // Follow the caller's sampling decision; sample new roots at the configured ratio
    let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
        config.trace_sample_ratio,
    )));

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            sdktrace::config()
                .with_sampler(sampler)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)?;

    Ok(tracer)
}

/// Trace id of the active span, when one is being recorded
pub fn get_current_trace_id() -> Option<String> {
    use opentelemetry::trace::TraceContextExt;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    let context = tracing::Span::current().context();
    let span_context = context.span().span_context().clone();
    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}

/// Log at `$level`, tagging the event with the active trace id if there is one
#[macro_export]
macro_rules! log_with_trace {
    ($level:ident, $($arg:tt)*) => {
        match $crate::observability::tracing::get_current_trace_id() {
            Some(trace_id) => tracing::$level!(trace_id = %trace_id, $($arg)*),
            None => tracing::$level!($($arg)*),
        }
    };
}

#[macro_export]
macro_rules! info_with_trace {
    ($($arg:tt)*) => { $crate::log_with_trace!(info, $($arg)*) };
}

#[macro_export]
macro_rules! warn_with_trace {
    ($($arg:tt)*) => { $crate::log_with_trace!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! error_with_trace {
    ($($arg:tt)*) => { $crate::log_with_trace!(error, $($arg)*) };
}

/// Flush pending spans. Gives up after a few seconds so shutdown never hangs on a dead collector.
pub async fn shutdown_observability() {
    info!("Shutting down observability");

    let flush = tokio::task::spawn_blocking(global::shutdown_tracer_provider);
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, flush).await {
        Ok(Ok(())) => info!("Observability shutdown completed"),
        Ok(Err(e)) => warn!(error = %e, "Observability shutdown task failed"),
        Err(_) => warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Observability shutdown timed out"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_shutdown_without_exporter_returns_promptly() {
        let start = std::time::Instant::now();
        shutdown_observability().await;
        assert!(start.elapsed() < SHUTDOWN_TIMEOUT + Duration::from_secs(1));
    }

    #[test]
    fn test_no_trace_id_outside_spans() {
        assert!(get_current_trace_id().is_none());
    }

    #[test]
    fn test_blank_otlp_endpoint_is_ignored() {
        let mut config = Config::in_memory().observability;
        config.otlp_endpoint = Some("   ".to_string());
        assert_eq!(otlp_endpoint(&config), None);

        config.otlp_endpoint = Some("http://collector:4317".to_string());
        assert_eq!(otlp_endpoint(&config), Some("http://collector:4317"));
    }

    #[test]
    fn test_env_filter_targets_crate() {
        if std::env::var("RUST_LOG").is_err() {
            let filter = env_filter("reggie-rs", "debug");
            assert!(filter.to_string().contains("reggie_rs=debug"));
        }
    }
}
