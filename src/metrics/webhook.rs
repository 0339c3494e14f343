//! Webhook dispatch metrics
//!
//! One counter per terminal dispatch outcome, labeled with the outcome's
//! taxonomy name and the resolved provider name (`unknown` when the
//! path segment matched no provider).

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct WebhookMetrics;

impl WebhookMetrics {
    pub fn record_outcome(provider: &'static str, outcome: &'static str, status: u16) {
        ::metrics::counter!(
            phase_metric!(counter, "webhook", "outcomes"),
            "provider" => provider,
            "outcome" => outcome,
            "status" => status.to_string()
        )
        .increment(1);
    }

    pub fn record_reservations(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "webhook", "reservations_received"))
            .increment(count as u64);
    }
}

impl PhaseMetrics for WebhookMetrics {
    fn register_metrics() {
        use metrics::counter;

        let _ = counter!(phase_metric!(counter, "webhook", "outcomes"));
        let _ = counter!(phase_metric!(counter, "webhook", "reservations_received"));
    }

    fn phase_name() -> &'static str {
        "webhook"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "webhook", "outcomes"),
                metric_type: MetricType::Counter,
                help: "Webhook deliveries by terminal dispatch outcome",
                labels: vec!["provider", "outcome", "status"],
            },
            MetricDoc {
                name: phase_metric!(counter, "webhook", "reservations_received"),
                metric_type: MetricType::Counter,
                help: "Reservation ids extracted from normalized webhooks",
                labels: vec![],
            },
        ]
    }
}
