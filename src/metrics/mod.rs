//! Metrics for the PMS adapter layer
//!
//! Each phase (webhook dispatch, catalog refresh) owns its metrics in a
//! dedicated submodule. Names follow `pms_{phase}_{name}` so phases cannot
//! collide. Recording is a no-op until [`init_metrics`] installs a recorder.

pub mod catalog;
pub mod registry;
pub mod webhook;

pub use catalog::CatalogMetrics;
pub use webhook::WebhookMetrics;

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

/// Install the Prometheus recorder with an HTTP listener on `addr`.
///
/// Idempotent. Registers every phase's metrics so they show up on `/metrics`
/// before first use.
pub fn init_metrics(addr: SocketAddr) {
    INIT.call_once(|| {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install() {
            Ok(()) => {
                info!("Prometheus exporter listening on http://{}/metrics", addr);
                registry::register_all_metrics();
            }
            Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
        }
    });
}

/// Trait for phase-specific metrics collections
pub trait PhaseMetrics {
    /// Touch every metric of the phase so it is exported with a zero value
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Histogram,
}

/// Macro to create phase-specific metric names with consistent naming
///
/// Counters: `pms_{phase}_{name}_total`, histograms: `pms_{phase}_{name}`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("pms_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("pms_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
