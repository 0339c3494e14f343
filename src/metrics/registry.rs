//! Registers every phase's metrics and detects name conflicts early

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::webhook::WebhookMetrics>(&mut all_metrics);
    register_phase_metrics::<super::catalog::CatalogMetrics>(&mut all_metrics);

    info!(
        "Registered {} total metrics across all phases",
        all_metrics.len()
    );
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if phase_of(doc.name) != phase_name {
            warn!(
                "Metric '{}' is documented by phase '{}' but named for '{}'",
                doc.name,
                phase_name,
                phase_of(doc.name)
            );
        }
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric name conflict detected: '{}' registered again by phase '{}'",
                doc.name, phase_name
            );
            continue;
        }
        debug!(
            "  - {} ({:?}, labels {:?}): {}",
            doc.name, doc.metric_type, doc.labels, doc.help
        );
        all_metrics.insert(doc.name, doc);
    }
}

/// Phase segment of a metric name (`pms_webhook_outcomes_total` -> `webhook`)
fn phase_of(metric_name: &str) -> &str {
    metric_name
        .strip_prefix("pms_")
        .and_then(|rest| rest.split('_').next())
        .unwrap_or("unknown")
}
