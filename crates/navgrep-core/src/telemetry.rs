use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry_prometheus::PrometheusExporter;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing_subscriber::{EnvFilter, fmt};

static LOGGING: OnceLock<()> = OnceLock::new();
static TELEMETRY: OnceCell<TelemetryState> = OnceCell::new();
static METRICS: OnceCell<MetricsHandles> = OnceCell::new();

struct TelemetryState {
    _provider: SdkMeterProvider,
    registry: Registry,
}

struct MetricsHandles {
    search_calls: Counter<u64>,
    search_results: Counter<u64>,
    search_failures: Counter<u64>,
    fallbacks: Counter<u64>,
    cache_hits: Counter<u64>,
    lookup_latency_histogram: Histogram<f64>,
}

/// Initialize logging and metrics exporters. Safe to call multiple times.
pub fn init() -> Result<()> {
    init_logging();
    configure_metrics()?;
    Ok(())
}

/// JSON logs on stderr, filtered by `RUST_LOG` (default `info`). Stdout is
/// left to command output.
pub fn init_logging() {
    LOGGING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

fn configure_metrics() -> Result<&'static TelemetryState> {
    TELEMETRY.get_or_try_init(|| {
        let registry = Registry::new();
        let exporter = build_exporter(&registry)?;

        let provider = SdkMeterProvider::builder()
            .with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                "navgrep",
            )]))
            .with_reader(exporter)
            .build();

        global::set_meter_provider(provider.clone());

        let meter = global::meter("navgrep");
        let search_calls = meter
            .u64_counter("navgrep_search_calls_total")
            .with_description("Search queries issued to the search backend")
            .init();
        let search_results = meter
            .u64_counter("navgrep_search_results_total")
            .with_description("Raw results returned by the search backend")
            .init();
        let search_failures = meter
            .u64_counter("navgrep_search_failures_total")
            .with_description("Search queries that failed")
            .init();
        let fallbacks = meter
            .u64_counter("navgrep_index_fallbacks_total")
            .with_description("Lookups answered by the index-only fallback query")
            .init();
        let cache_hits = meter
            .u64_counter("navgrep_cache_hits_total")
            .with_description("File content cache hits")
            .init();
        let lookup_latency_histogram = meter
            .f64_histogram("navgrep_lookup_latency_ms")
            .with_description("End-to-end latency of a navigation lookup in milliseconds")
            .init();

        METRICS
            .set(MetricsHandles {
                search_calls,
                search_results,
                search_failures,
                fallbacks,
                cache_hits,
                lookup_latency_histogram,
            })
            .map_err(|_| anyhow!("metrics handles already initialized"))?;

        Ok(TelemetryState {
            _provider: provider,
            registry,
        })
    })
}

fn build_exporter(registry: &Registry) -> Result<PrometheusExporter> {
    opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .context("failed to build Prometheus exporter")
}

fn metrics() -> Option<&'static MetricsHandles> {
    METRICS.get()
}

fn state() -> Option<&'static TelemetryState> {
    TELEMETRY.get()
}

pub fn record_search_call(scope: &'static str) {
    if let Some(metrics) = metrics() {
        metrics
            .search_calls
            .add(1, &[KeyValue::new("scope", scope)]);
    }
}

pub fn record_search_results(scope: &'static str, count: usize) {
    if let Some(metrics) = metrics() {
        metrics
            .search_results
            .add(count as u64, &[KeyValue::new("scope", scope)]);
    }
}

pub fn record_search_failure(scope: &'static str) {
    if let Some(metrics) = metrics() {
        metrics
            .search_failures
            .add(1, &[KeyValue::new("scope", scope)]);
    }
}

/// Record that the index-only fallback answered a tier.
pub fn record_fallback(scope: &'static str) {
    if let Some(metrics) = metrics() {
        metrics.fallbacks.add(1, &[KeyValue::new("scope", scope)]);
    }
}

pub fn record_cache_hit(cache: &'static str) {
    if let Some(metrics) = metrics() {
        metrics
            .cache_hits
            .add(1, &[KeyValue::new("cache", cache)]);
    }
}

pub fn record_lookup_latency(operation: &'static str, latency_ms: u64) {
    if let Some(metrics) = metrics() {
        metrics
            .lookup_latency_histogram
            .record(latency_ms as f64, &[KeyValue::new("operation", operation)]);
    }
}

/// Render all currently collected metrics in Prometheus text format.
pub fn export_prometheus() -> Result<String> {
    let state = state().ok_or_else(|| anyhow!("telemetry not initialized"))?;
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("failed to encode metrics")?;
    String::from_utf8(buffer).context("metrics buffer is not valid UTF-8")
}
