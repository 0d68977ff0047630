//! Telemetry initialization and configuration

use std::error::Error;
use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Console log layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn env_filter() -> Result<EnvFilter, Box<dyn Error>> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?)
}

/// Initialize console logging for the process.
///
/// Honors `RUST_LOG`, defaulting to `info`. Later calls are no-ops.
///
/// # Example
/// ```
/// use rubric_telemetry::init_telemetry;
/// init_telemetry("rubric-bench").expect("Failed to initialize telemetry");
/// ```
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn Error>> {
    init_with_format(service_name, LogFormat::Pretty)
}

/// Initialize console logging with an explicit layout.
pub fn init_with_format(service_name: &str, format: LogFormat) -> Result<(), Box<dyn Error>> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = install_console(format);
        if result.is_ok() {
            tracing::info!(service.name = service_name, "Telemetry initialized");
        }
    });
    result
}

fn install_console(format: LogFormat) -> Result<(), Box<dyn Error>> {
    let registry = tracing_subscriber::registry().with(env_filter()?);
    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true).with_line_number(true))
            .try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()?,
    }
    Ok(())
}

/// Initialize logging plus OpenTelemetry OTLP span export.
///
/// # Arguments
/// * `service_name` - Name reported as `service.name`
/// * `endpoint` - OTLP collector endpoint (e.g., "http://localhost:4317")
///
/// Must be called from within a Tokio runtime.
pub fn init_with_otlp(service_name: &str, endpoint: &str) -> Result<(), Box<dyn Error>> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = install_otlp(service_name, endpoint);
        if result.is_ok() {
            tracing::info!(
                service.name = service_name,
                otlp.endpoint = endpoint,
                "Telemetry initialized with OpenTelemetry"
            );
        }
    });
    result
}

fn install_otlp(service_name: &str, endpoint: &str) -> Result<(), Box<dyn Error>> {
    use opentelemetry_otlp::WithExportConfig;
    use tracing_opentelemetry::OpenTelemetryLayer;

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
            opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                "service.name",
                service_name.to_string(),
            )]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_line_number(true))
        .with(OpenTelemetryLayer::new(tracer))
        .try_init()?;
    Ok(())
}

/// Flush pending spans before exit.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
