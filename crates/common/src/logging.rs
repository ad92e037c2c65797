//! Provides utilities to initialize logging and OpenTelemetry tracing.
use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Environment variable holding the OTLP collector endpoint. Spans are only exported if set.
pub const OTLP_URL_ENVVAR: &str = "FACILITATOR_OTLP_URL";

/// Environment variable holding the service label, which is appended to the service name.
pub const SVC_LABEL_ENVVAR: &str = "FACILITATOR_SVC_LABEL";

/// Errors that can occur while installing the logger.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to build the otlp exporter: {0}")]
    Exporter(String),

    #[error("failed to install the subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Configuration for the logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Identifies the service in logs and exported spans.
    whoami: String,

    otel_url: Option<String>,
}

impl LoggerConfig {
    pub const fn new(whoami: String) -> Self {
        Self {
            whoami,
            otel_url: None,
        }
    }

    /// Creates a config for the service `base`, labelled and exported as configured by the
    /// environment.
    pub fn from_env(base: &str) -> Self {
        let label = env::var(SVC_LABEL_ENVVAR).ok();

        Self {
            whoami: whoami_string(base, label.as_deref()),
            otel_url: env::var(OTLP_URL_ENVVAR).ok(),
        }
    }

    pub fn with_otlp_url(self, url: impl Into<String>) -> Self {
        Self {
            otel_url: Some(url.into()),
            ..self
        }
    }

    pub fn whoami(&self) -> &str {
        &self.whoami
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new("facilitator".to_string())
    }
}

/// Installs the global subscriber: compact stdout output filtered by `RUST_LOG`, plus span export
/// when an OTLP endpoint is configured.
///
/// `LOG_FILE=1` and `LOG_LINE_NUM=1` add the source location to every event.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();

    let log_file = env::var("LOG_FILE").is_ok_and(|v| v == "1");
    let log_line_num = env::var("LOG_LINE_NUM").is_ok_and(|v| v == "1");

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .event_format(
            tracing_subscriber::fmt::format()
                .with_file(log_file)
                .with_line_number(log_line_num),
        )
        .with_filter(filter);

    match &config.otel_url {
        Some(otel_url) => {
            let resource = Resource::builder()
                .with_attribute(KeyValue::new("service.name", config.whoami.clone()))
                .build();

            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(otel_url)
                .build()
                .map_err(|e| LoggingError::Exporter(e.to_string()))?;

            let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                .with_resource(resource)
                .with_batch_exporter(exporter)
                .build();

            let otel_layer =
                tracing_opentelemetry::layer().with_tracer(provider.tracer("facilitator"));

            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(otel_layer)
                .try_init()?;
        }
        None => tracing_subscriber::registry().with(stdout_layer).try_init()?,
    }

    info!(whoami = %config.whoami, otlp = config.otel_url.is_some(), "logging started");

    Ok(())
}

/// Computes the service name from its base name and optional label.
pub fn whoami_string(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}
