//! Catalog refresh metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct CatalogMetrics;

impl CatalogMetrics {
    pub fn record_refresh(provider: &'static str, fetched: usize, persisted: usize) {
        ::metrics::counter!(phase_metric!(counter, "catalog", "refreshes_success"), "provider" => provider)
            .increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "catalog", "products_fetched"), "provider" => provider)
            .record(fetched as f64);
        ::metrics::counter!(phase_metric!(counter, "catalog", "products_persisted"), "provider" => provider)
            .increment(persisted as u64);
    }

    pub fn record_refresh_error(provider: &'static str, error_kind: &'static str) {
        ::metrics::counter!(
            phase_metric!(counter, "catalog", "refreshes_error"),
            "provider" => provider,
            "error" => error_kind
        )
        .increment(1);
    }
}

impl PhaseMetrics for CatalogMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "catalog", "refreshes_success"));
        let _ = counter!(phase_metric!(counter, "catalog", "refreshes_error"));
        let _ = counter!(phase_metric!(counter, "catalog", "products_persisted"));
        let _ = histogram!(phase_metric!(histogram, "catalog", "products_fetched"));
    }

    fn phase_name() -> &'static str {
        "catalog"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "catalog", "refreshes_success"),
                metric_type: MetricType::Counter,
                help: "Catalog refreshes that reached the store",
                labels: vec!["provider"],
            },
            MetricDoc {
                name: phase_metric!(counter, "catalog", "refreshes_error"),
                metric_type: MetricType::Counter,
                help: "Catalog refreshes that failed, by error kind",
                labels: vec!["provider", "error"],
            },
            MetricDoc {
                name: phase_metric!(counter, "catalog", "products_persisted"),
                metric_type: MetricType::Counter,
                help: "Upsell products created or updated by refreshes",
                labels: vec!["provider"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "catalog", "products_fetched"),
                metric_type: MetricType::Histogram,
                help: "Catalog size returned by the vendor per refresh",
                labels: vec!["provider"],
            },
        ]
    }
}
