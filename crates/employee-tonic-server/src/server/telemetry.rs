//! # Telemetry
//!
//! Console logging through `tracing-subscriber` is always on and honours
//! `RUST_LOG` (default `info`). OpenTelemetry export is opt-in:
//!
//! - `otel-trace`: export spans through `tracing-opentelemetry`.
//! - `otel-metrics`: record OpenTelemetry counters and histograms.
//! - `stdout`: print exported spans/metrics to stdout.
//! - `otlp`: ship spans/metrics over OTLP/gRPC to
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` (default `http://localhost:4317`).
//!
//! Exporters require at least one of `otel-trace` or `otel-metrics`. Both
//! exporters may be enabled together.
//!
//! ```bash
//! cargo run --features otel-trace,otel-metrics,otlp
//! ```
//!
//! The metric helpers at the bottom of this module compile to no-ops without
//! `otel-metrics`, so call sites never need feature gates.

#[cfg(all(
    feature = "otlp",
    not(any(feature = "otel-trace", feature = "otel-metrics"))
))]
compile_error!(
    "The 'otlp' feature requires at least one of 'otel-trace' or 'otel-metrics' to be enabled."
);

#[cfg(all(
    feature = "stdout",
    not(any(feature = "otel-trace", feature = "otel-metrics"))
))]
compile_error!(
    "The 'stdout' feature requires at least one of 'otel-trace' or 'otel-metrics' to be enabled."
);

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(all(feature = "otlp", any(feature = "otel-metrics", feature = "otel-trace")))]
use opentelemetry_otlp::{Compression, Protocol, WithExportConfig, WithTonicConfig};

#[cfg(feature = "otel-metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(feature = "otel-metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "otel-metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "otel-metrics", feature = "otel-trace"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "otel-metrics", feature = "otel-trace"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "otel-metrics", feature = "otel-trace"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "otel-trace")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel-trace")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "otel-trace")]
use opentelemetry_sdk::trace as sdktrace;

const SERVICE_NAME: &str = "employee-tonic-server";

pub struct TelemetryProviders {
    #[cfg(feature = "otel-trace")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "otel-metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every exporter. Errors are reported on stderr
    /// because the subscriber may already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "otel-trace")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "otel-metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "otel-trace")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "otel-trace")]
    let tracer_provider = init_tracer()?;

    #[cfg(feature = "otel-metrics")]
    let meter_provider = init_metrics()?;

    #[cfg(any(feature = "otel-metrics", feature = "otel-trace"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    // Human-readable console output, independent of any OpenTelemetry
    // exporter.
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "otel-trace")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "otel-metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.init();

    Ok(TelemetryProviders {
        #[cfg(feature = "otel-trace")]
        tracer_provider,
        #[cfg(feature = "otel-metrics")]
        meter_provider,
    })
}

#[cfg(all(feature = "otlp", any(feature = "otel-metrics", feature = "otel-trace")))]
fn otlp_endpoint() -> String {
    std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string())
}

#[cfg(any(feature = "otel-metrics", feature = "otel-trace"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "otel-metrics")]
fn init_metrics() -> anyhow::Result<sdkmetrics::SdkMeterProvider> {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        let exporter = opentelemetry_stdout::MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    #[cfg(feature = "otlp")]
    let builder = {
        use anyhow::Context;

        let exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(otlp_endpoint())
            .with_protocol(Protocol::Grpc)
            .with_timeout(std::time::Duration::from_secs(10))
            .with_compression(Compression::Gzip)
            .build()
            .context("failed to build metrics exporter")?;

        builder.with_periodic_exporter(exporter)
    };

    Ok(builder.build())
}

#[cfg(feature = "otel-trace")]
fn init_tracer() -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        let exporter = opentelemetry_stdout::SpanExporter::default();
        builder.with_span_processor(batch_processor(exporter))
    };

    #[cfg(feature = "otlp")]
    let builder = {
        use anyhow::Context;

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otlp_endpoint())
            .with_protocol(Protocol::Grpc)
            .with_timeout(std::time::Duration::from_secs(10))
            .with_compression(Compression::Gzip)
            .build()
            .context("failed to build span exporter")?;

        builder.with_span_processor(batch_processor(exporter))
    };

    Ok(builder.build())
}

#[cfg(all(feature = "otel-trace", any(feature = "stdout", feature = "otlp")))]
fn batch_processor<E>(exporter: E) -> sdktrace::BatchSpanProcessor
where
    E: opentelemetry_sdk::trace::SpanExporter + 'static,
{
    sdktrace::BatchSpanProcessor::builder(exporter)
        .with_batch_config(
            sdktrace::BatchConfigBuilder::default()
                .with_scheduled_delay(std::time::Duration::from_secs(5))
                .with_max_queue_size(2048)
                .build(),
        )
        .build()
}

// Metric handles - only compiled when metrics are enabled
#[cfg(feature = "otel-metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static STREAMS_INFLIGHT: OnceLock<UpDownCounter<i64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static STREAM_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static STREAM_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static EMPLOYEES_STREAMED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static BATCH_SIZE: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "otel-metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Total gRPC calls, by method")
            .build(),
    );

    let _ = STREAMS_INFLIGHT.set(
        meter
            .i64_up_down_counter("streams_inflight")
            .with_description("Concurrent streaming calls")
            .build(),
    );

    let _ = STREAM_ERRORS.set(
        meter
            .u64_counter("stream_errors")
            .with_description("Errored, interrupted or cancelled streams")
            .build(),
    );

    let _ = STREAM_DURATION_MS.set(
        meter
            .f64_histogram("stream_duration")
            .with_unit("ms")
            .with_description("End-to-end streaming call duration")
            .build(),
    );

    let _ = EMPLOYEES_STREAMED.set(
        meter
            .u64_counter("employees_streamed")
            .with_description("Employees sent on paced streams")
            .build(),
    );

    let _ = BATCH_SIZE.set(
        meter
            .f64_histogram("batch_size")
            .with_description("Employees per bulk upload")
            .build(),
    );
}

#[cfg(feature = "otel-metrics")]
pub fn increment_requests(method: &'static str) {
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &[KeyValue::new("rpc.method", method)]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn increment_requests(_method: &'static str) {}

#[cfg(feature = "otel-metrics")]
pub fn increment_streams_inflight() {
    if let Some(counter) = STREAMS_INFLIGHT.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn increment_streams_inflight() {}

#[cfg(feature = "otel-metrics")]
pub fn decrement_streams_inflight() {
    if let Some(counter) = STREAMS_INFLIGHT.get() {
        counter.add(-1, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn decrement_streams_inflight() {}

#[cfg(feature = "otel-metrics")]
pub fn increment_stream_errors() {
    if let Some(counter) = STREAM_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn increment_stream_errors() {}

#[cfg(feature = "otel-metrics")]
pub fn record_stream_duration(duration_ms: f64) {
    if let Some(histogram) = STREAM_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn record_stream_duration(_duration_ms: f64) {}

#[cfg(feature = "otel-metrics")]
pub fn increment_employees_streamed(count: u64) {
    if let Some(counter) = EMPLOYEES_STREAMED.get() {
        counter.add(count, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn increment_employees_streamed(_count: u64) {}

#[cfg(feature = "otel-metrics")]
pub fn record_batch_size(size: f64) {
    if let Some(histogram) = BATCH_SIZE.get() {
        histogram.record(size, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn record_batch_size(_size: f64) {}
