//! Guestline adapter. Catalog only: Guestline does not push webhooks to us.

pub mod catalog;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{catalog_items, PmsProvider, RawProduct};
use crate::common::constants::{GUESTLINE_CATALOG_KEY, GUESTLINE_PROVIDER};
use crate::common::error::{PmsError, Result};
use crate::domain::{CanonicalEvents, Hotel, NormalizedWebhook, Stay, UnifiedProduct};
use crate::storage::Store;
use crate::vendor::{RetryPolicy, VendorApi};

pub struct Guestline {
    vendor: Arc<dyn VendorApi>,
    retry: RetryPolicy,
}

impl Guestline {
    pub fn new(vendor: Arc<dyn VendorApi>, retry: RetryPolicy) -> Self {
        Self { vendor, retry }
    }
}

#[async_trait]
impl PmsProvider for Guestline {
    fn name(&self) -> &'static str {
        GUESTLINE_PROVIDER
    }

    async fn normalize_webhook(
        &self,
        _payload: &[u8],
        _store: &dyn Store,
    ) -> Result<NormalizedWebhook> {
        warn!("Received a webhook for Guestline, which has no webhook format");
        Err(PmsError::InvalidPayload(
            "webhooks are not supported for Guestline".to_string(),
        ))
    }

    async fn handle_webhook(
        &self,
        _hotel: &Hotel,
        _events: &CanonicalEvents,
        _store: &dyn Store,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn sync_arrivals(
        &self,
        hotel: &Hotel,
        _checkin: NaiveDate,
        _store: &dyn Store,
    ) -> Result<usize> {
        debug!(hotel_id = %hotel.id, "Guestline reservations are not synced");
        Ok(0)
    }

    async fn fetch_catalog(&self, hotel: &Hotel) -> Result<Vec<RawProduct>> {
        let document = self
            .retry
            .run("fetch_catalog", || {
                self.vendor
                    .fetch_catalog(GUESTLINE_PROVIDER, &hotel.pms_hotel_id)
            })
            .await?;
        Ok(catalog_items(document, GUESTLINE_CATALOG_KEY))
    }

    fn adapt(&self, raw: &RawProduct) -> UnifiedProduct {
        catalog::adapt(raw)
    }

    async fn stay_has_breakfast(&self, _stay: &Stay) -> Option<bool> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::vendor::SimulatedVendor;

    fn provider() -> Guestline {
        Guestline::new(Arc::new(SimulatedVendor::reliable()), RetryPolicy::no_delay(1))
    }

    #[tokio::test]
    async fn test_webhooks_are_rejected_as_invalid() {
        let store = InMemoryStore::new();
        let result = provider().normalize_webhook(b"{}", &store).await;
        assert!(matches!(result, Err(PmsError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn test_fetches_sandbox_products() {
        let hotel = Hotel::new("Hotel 2", "London", Some("Guestline"), "LON");
        let guestline = provider();
        let raw = guestline.fetch_catalog(&hotel).await.unwrap();
        assert_eq!(raw.len(), 6);
        assert!(raw.iter().map(|r| guestline.adapt(r)).all(|p| !p.price.is_empty()));
    }

    #[tokio::test]
    async fn test_arrivals_are_not_synced() {
        let store = InMemoryStore::new();
        let hotel = Hotel::new("Hotel 2", "London", Some("Guestline"), "LON");
        store.create_hotel(&hotel).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 2, 8).unwrap();

        assert_eq!(provider().sync_arrivals(&hotel, day, &store).await.unwrap(), 0);
        assert!(store.list_stays(hotel.id).await.unwrap().is_empty());
    }
}
