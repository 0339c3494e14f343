//! Apaleo adapter: webhook normalization, reservation sync and the services catalog.

pub mod catalog;
pub mod handler;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;

use super::{catalog_items, PmsProvider, RawProduct};
use crate::common::constants::{APALEO_CATALOG_KEY, APALEO_PROVIDER};
use crate::common::error::Result;
use crate::domain::{CanonicalEvents, Hotel, NormalizedWebhook, Stay, UnifiedProduct};
use crate::storage::Store;
use crate::vendor::{RetryPolicy, VendorApi};

use handler::ReservationSync;

pub struct Apaleo {
    vendor: Arc<dyn VendorApi>,
    retry: RetryPolicy,
}

impl Apaleo {
    pub fn new(vendor: Arc<dyn VendorApi>, retry: RetryPolicy) -> Self {
        Self { vendor, retry }
    }
}

#[async_trait]
impl PmsProvider for Apaleo {
    fn name(&self) -> &'static str {
        APALEO_PROVIDER
    }

    async fn normalize_webhook(
        &self,
        payload: &[u8],
        store: &dyn Store,
    ) -> Result<NormalizedWebhook> {
        webhook::normalize(payload, store).await
    }

    async fn handle_webhook(
        &self,
        hotel: &Hotel,
        events: &CanonicalEvents,
        store: &dyn Store,
    ) -> Result<bool> {
        let sync = ReservationSync {
            vendor: self.vendor.as_ref(),
            retry: self.retry,
            store,
        };
        sync.apply(hotel, events).await
    }

    async fn sync_arrivals(
        &self,
        hotel: &Hotel,
        checkin: NaiveDate,
        store: &dyn Store,
    ) -> Result<usize> {
        let sync = ReservationSync {
            vendor: self.vendor.as_ref(),
            retry: self.retry,
            store,
        };
        sync.sync_arrivals(hotel, checkin).await
    }

    async fn fetch_catalog(&self, hotel: &Hotel) -> Result<Vec<RawProduct>> {
        let document = self
            .retry
            .run("fetch_catalog", || {
                self.vendor.fetch_catalog(APALEO_PROVIDER, &hotel.pms_hotel_id)
            })
            .await?;
        Ok(catalog_items(document, APALEO_CATALOG_KEY))
    }

    fn adapt(&self, raw: &RawProduct) -> UnifiedProduct {
        catalog::adapt(raw)
    }

    async fn stay_has_breakfast(&self, stay: &Stay) -> Option<bool> {
        if stay.pms_reservation_id.is_empty() {
            return None;
        }
        let details = self
            .retry
            .run("fetch_reservation_details", || {
                self.vendor.fetch_reservation_details(&stay.pms_reservation_id)
            })
            .await;
        match details {
            Ok(details) => details.breakfast_included,
            Err(e) => {
                warn!(reservation_id = %stay.pms_reservation_id, error = %e, "breakfast lookup failed");
                None
            }
        }
    }
}
