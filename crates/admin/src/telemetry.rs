//! Subscriber setup for the admin binary: JSON logs for `serve`, with
//! spans exported over OTLP when a collector is configured.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rf_domain::config::ObservabilityConfig;

const SERVE_FILTER: &str = "info,rf_admin=debug,rf_registry=debug";

/// Keeps the span exporter alive; call [`Telemetry::shutdown`] before
/// exit to flush pending spans.
#[must_use]
pub struct Telemetry {
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    pub fn exporting(&self) -> bool {
        self.provider.is_some()
    }

    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = ?e, "span exporter shutdown failed");
            }
        }
    }
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn otlp_provider(endpoint: &str, obs: &ObservabilityConfig) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::TraceIdRatioBased(obs.sample_rate))
        .with_resource(
            Resource::builder()
                .with_service_name(obs.service_name.clone())
                .build(),
        )
        .build())
}

/// Install the `serve` subscriber. An exporter that fails to build is
/// reported on stderr and the server runs with logs only.
pub fn init_server(obs: &ObservabilityConfig) -> Telemetry {
    let provider = obs.otlp_endpoint.as_deref().and_then(|endpoint| {
        otlp_provider(endpoint, obs)
            .map_err(|e| eprintln!("OTLP export to {endpoint} disabled: {e:#}"))
            .ok()
    });
    let otel = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("renderfleet")));

    tracing_subscriber::registry()
        .with(filter(SERVE_FILTER))
        .with(tracing_subscriber::fmt::layer().json())
        .with(otel)
        .init();

    Telemetry { provider }
}

/// Compact stderr logging at `warn` for one-shot CLI commands.
pub fn init_cli() {
    tracing_subscriber::fmt()
        .with_env_filter(filter("warn"))
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
