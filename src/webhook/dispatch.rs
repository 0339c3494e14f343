use tracing::{error, info, instrument, warn};

use crate::common::constants::WEBHOOK_ACK_BODY;
use crate::common::error::PmsError;
use crate::metrics::WebhookMetrics;
use crate::state::AppState;

/// Terminal state of one webhook delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Provider name failed validation or is not registered
    UnknownProvider,
    InvalidPayload,
    /// Well-formed payload for a hotel we do not manage
    UnknownHotel,
    /// Normalization routed to a hotel that is gone by the time we load it
    HotelNotFound,
    /// The provider declined or failed to apply the events
    Rejected,
    /// Store failure before the provider was reached
    InternalError,
    Handled,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::UnknownProvider => "unknown_provider",
            DispatchOutcome::InvalidPayload => "invalid_payload",
            DispatchOutcome::UnknownHotel => "unknown_hotel",
            DispatchOutcome::HotelNotFound => "hotel_not_found",
            DispatchOutcome::Rejected => "rejected",
            DispatchOutcome::InternalError => "internal_error",
            DispatchOutcome::Handled => "handled",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            DispatchOutcome::Handled => 200,
            DispatchOutcome::UnknownProvider | DispatchOutcome::HotelNotFound => 404,
            DispatchOutcome::InvalidPayload
            | DispatchOutcome::UnknownHotel
            | DispatchOutcome::Rejected => 400,
            DispatchOutcome::InternalError => 500,
        }
    }
}

/// Metric label for deliveries whose provider name did not resolve
pub const UNRESOLVED_PROVIDER: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    pub outcome: DispatchOutcome,
    pub body: String,
    /// Registry name of the resolved provider, [`UNRESOLVED_PROVIDER`] otherwise
    pub provider: &'static str,
    /// Error taxonomy name behind a failed delivery
    pub error_kind: Option<&'static str>,
}

impl DispatchResponse {
    fn new(outcome: DispatchOutcome, body: impl Into<String>) -> Self {
        Self {
            outcome,
            body: body.into(),
            provider: UNRESOLVED_PROVIDER,
            error_kind: None,
        }
    }

    fn failed(outcome: DispatchOutcome, error: &PmsError) -> Self {
        Self {
            error_kind: Some(error.kind()),
            ..Self::new(outcome, error.to_string())
        }
    }

    fn from_provider(mut self, provider: &'static str) -> Self {
        self.provider = provider;
        self
    }

    pub fn status(&self) -> u16 {
        self.outcome.status()
    }
}

/// Run one webhook delivery through resolve -> normalize -> route -> handle.
///
/// Never fails: every error becomes an outcome with a status code.
#[instrument(skip(state, payload), fields(payload_bytes = payload.len()))]
pub async fn dispatch(state: &AppState, provider_name: &str, payload: &[u8]) -> DispatchResponse {
    let response = run(state, provider_name, payload).await;
    let outcome = response.outcome;
    if outcome == DispatchOutcome::Handled {
        info!(outcome = outcome.as_str(), status = outcome.status(), "webhook handled");
    } else {
        warn!(
            outcome = outcome.as_str(),
            status = outcome.status(),
            error_kind = response.error_kind.unwrap_or("none"),
            reason = %response.body,
            "webhook not handled"
        );
    }
    WebhookMetrics::record_outcome(response.provider, outcome.as_str(), outcome.status());
    response
}

async fn run(state: &AppState, provider_name: &str, payload: &[u8]) -> DispatchResponse {
    let provider = match state.registry.resolve(provider_name) {
        Ok(provider) => provider,
        Err(e) => return DispatchResponse::failed(DispatchOutcome::UnknownProvider, &e),
    };
    let name = provider.name();

    // Received -> Parsed
    let normalized = match provider.normalize_webhook(payload, state.store.as_ref()).await {
        Ok(normalized) => normalized,
        Err(e @ PmsError::UnknownHotel { .. }) => {
            return DispatchResponse::failed(DispatchOutcome::UnknownHotel, &e).from_provider(name)
        }
        Err(e @ PmsError::InvalidPayload(_)) | Err(e @ PmsError::Json(_)) => {
            return DispatchResponse::failed(DispatchOutcome::InvalidPayload, &e).from_provider(name)
        }
        Err(e) => {
            error!(error_kind = e.kind(), "webhook normalization failed: {}", e);
            return DispatchResponse::failed(DispatchOutcome::InternalError, &e).from_provider(name);
        }
    };
    WebhookMetrics::record_reservations(normalized.reservation_ids().len());

    // Parsed -> Routed
    let hotel = match state.store.find_hotel(normalized.hotel_id).await {
        Ok(Some(hotel)) => hotel,
        Ok(None) => {
            return DispatchResponse::new(
                DispatchOutcome::HotelNotFound,
                format!("hotel {} not found", normalized.hotel_id),
            )
            .from_provider(name)
        }
        Err(e) => {
            error!(error_kind = e.kind(), "hotel lookup failed: {}", e);
            return DispatchResponse::failed(DispatchOutcome::InternalError, &e).from_provider(name);
        }
    };

    // Routed -> Handled
    let response = match provider
        .handle_webhook(&hotel, &normalized.events, state.store.as_ref())
        .await
    {
        Ok(true) => DispatchResponse::new(DispatchOutcome::Handled, WEBHOOK_ACK_BODY),
        Ok(false) => DispatchResponse::new(
            DispatchOutcome::Rejected,
            format!("{name} did not handle the webhook"),
        ),
        Err(e) => DispatchResponse::failed(DispatchOutcome::Rejected, &e),
    };
    response.from_provider(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Hotel;
    use crate::providers::ProviderRegistry;
    use crate::storage::{InMemoryStore, Store};
    use crate::vendor::{RetryPolicy, SimulatedVendor};
    use serde_json::json;
    use std::sync::Arc;

    const HOTEL_ID: &str = "851df8c8-90f2-4c4a-8e01-a4fc46b25178";

    async fn state(failure_rate: f64) -> (AppState, Hotel) {
        let store = Arc::new(InMemoryStore::new());
        let hotel = Hotel::new("Hotel 1", "Berlin", Some("Apaleo"), HOTEL_ID);
        store.create_hotel(&hotel).await.unwrap();
        let registry = ProviderRegistry::new(
            Arc::new(SimulatedVendor::new(failure_rate)),
            RetryPolicy::no_delay(1),
        );
        (AppState::new(store, registry), hotel)
    }

    fn payload(hotel_id: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "HotelId": hotel_id,
            "Events": [{"Name": "Created", "Value": {"ReservationId": "R1"}}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_handled_webhook_creates_one_stay() {
        let (state, hotel) = state(0.0).await;
        let response = dispatch(&state, "apaleo", &payload(HOTEL_ID)).await;

        assert_eq!(response.outcome, DispatchOutcome::Handled);
        assert_eq!(response.status(), 200);
        assert_eq!(response.body, WEBHOOK_ACK_BODY);

        let stays = state.store.list_stays(hotel.id).await.unwrap();
        assert_eq!(stays.len(), 1);
        assert_eq!(stays[0].pms_reservation_id, "R1");
    }

    #[tokio::test]
    async fn test_same_webhook_twice_keeps_one_stay() {
        let (state, hotel) = state(0.0).await;
        dispatch(&state, "apaleo", &payload(HOTEL_ID)).await;
        dispatch(&state, "apaleo", &payload(HOTEL_ID)).await;
        assert_eq!(state.store.list_stays(hotel.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hotel_stored_with_lowercase_provider_receives_webhooks() {
        let store = Arc::new(InMemoryStore::new());
        let hotel = Hotel::new("Hotel 1", "Berlin", Some("apaleo"), HOTEL_ID);
        store.create_hotel(&hotel).await.unwrap();
        let registry = ProviderRegistry::new(
            Arc::new(SimulatedVendor::reliable()),
            RetryPolicy::no_delay(1),
        );
        let state = AppState::new(store, registry);

        let response = dispatch(&state, "apaleo", &payload(HOTEL_ID)).await;
        assert_eq!(response.outcome, DispatchOutcome::Handled);
    }

    #[tokio::test]
    async fn test_outcomes_map_to_status_codes() {
        let (state, _) = state(0.0).await;

        let unknown_provider = dispatch(&state, "mews", &payload(HOTEL_ID)).await;
        assert_eq!(unknown_provider.outcome, DispatchOutcome::UnknownProvider);
        assert_eq!(unknown_provider.status(), 404);
        assert_eq!(unknown_provider.error_kind, Some("not_found"));
        assert_eq!(unknown_provider.provider, UNRESOLVED_PROVIDER);

        let bad_name = dispatch(&state, "apa1eo", &payload(HOTEL_ID)).await;
        assert_eq!(bad_name.status(), 404);
        assert_eq!(bad_name.error_kind, Some("invalid_name"));

        let invalid = dispatch(&state, "apaleo", &payload("not-a-uuid")).await;
        assert_eq!(invalid.outcome, DispatchOutcome::InvalidPayload);
        assert_eq!(invalid.status(), 400);

        let unknown_hotel =
            dispatch(&state, "apaleo", &payload("00000000-0000-0000-0000-000000000000")).await;
        assert_eq!(unknown_hotel.outcome, DispatchOutcome::UnknownHotel);
        assert_eq!(unknown_hotel.status(), 400);

        let guestline = dispatch(&state, "guestline", &payload(HOTEL_ID)).await;
        assert_eq!(guestline.outcome, DispatchOutcome::InvalidPayload);
        assert_eq!(guestline.provider, "Guestline");
    }

    #[test]
    fn test_outcome_series_stay_bounded_for_unregistered_names() {
        let recorder = ::metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let (state, _) = state(0.0).await;
                for i in 0..50 {
                    let name = format!("junk{i}x");
                    let response = dispatch(&state, &name, &payload(HOTEL_ID)).await;
                    assert_eq!(response.outcome, DispatchOutcome::UnknownProvider);
                }
                dispatch(&state, "APALEO", &payload(HOTEL_ID)).await;
            })
        });

        let rendered = handle.render();
        let series: Vec<&str> = rendered
            .lines()
            .filter(|line| line.starts_with("pms_webhook_outcomes_total{"))
            .collect();
        assert_eq!(series.len(), 2, "{rendered}");
        assert!(series.iter().any(|l| l.contains(r#"provider="unknown""#) && l.ends_with(" 50")));
        assert!(series.iter().any(|l| l.contains(r#"provider="Apaleo""#)));
        assert!(!rendered.contains("junk"));
    }

    #[tokio::test]
    async fn test_vendor_outage_asks_pms_to_resend() {
        let (state, hotel) = state(1.0).await;
        let response = dispatch(&state, "apaleo", &payload(HOTEL_ID)).await;
        assert_eq!(response.outcome, DispatchOutcome::Rejected);
        assert_eq!(response.status(), 400);
        assert!(state.store.list_stays(hotel.id).await.unwrap().is_empty());
    }
}
