//! Tracing and Prometheus metrics for quire binaries.
//!
//! ```ignore
//! use quire_common::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init(TelemetryConfig::from_env("quire-server"));
//! tracing::info!("server started");
//!
//! // Expose the recorder on the router.
//! let app = Router::new().route("/metrics", get(|| async { telemetry::render() }));
//! metrics::counter!("quire_query_requests_total").increment(1);
//! ```

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event.
    pub service_name: String,
    /// Console log level when `RUST_LOG` is unset (DEBUG in debug builds).
    pub console_level: Level,
    /// Emit JSON lines instead of the compact human format.
    pub json: bool,
}

impl TelemetryConfig {
    /// - `RUST_LOG`: standard env filter, overrides `console_level`
    /// - `QUIRE_LOG_JSON`: any non-empty value other than `0` enables JSON output
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };
        let json = std::env::var("QUIRE_LOG_JSON")
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false);

        Self {
            service_name: service_name.into(),
            console_level,
            json,
        }
    }
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the metrics recorder and the global subscriber. Call once at
/// startup; later calls are no-ops.
pub fn init(config: TelemetryConfig) {
    handle();
    init_tracing(config);
}

/// The Prometheus handle, installing the global recorder on first use.
///
/// If another recorder is already installed the handle still renders, but
/// only sees what this recorder is given.
pub fn handle() -> &'static PrometheusHandle {
    PROMETHEUS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("a metrics recorder was already installed");
        }
        handle
    })
}

/// Render metrics in Prometheus text format.
pub fn render() -> String {
    handle().render()
}

fn init_tracing(config: TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_filter(env_filter)
            .boxed()
    };

    if tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!(service = %config.service_name, "telemetry initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_metrics_include_recorded_counters() {
        handle();
        metrics::counter!("quire_telemetry_test_total", "kind" => "unit").increment(3);
        let text = render();
        assert!(text.contains("quire_telemetry_test_total{kind=\"unit\"} 3"), "{text}");
    }
}
