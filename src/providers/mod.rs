//! PMS provider adapters.
//!
//! Each supported PMS implements [`PmsProvider`]. The provider set is fixed at
//! startup in a [`registry::ProviderRegistry`] table; request handlers resolve
//! a provider by name and never construct one directly.

pub mod apaleo;
pub mod fields;
pub mod guestline;
pub mod registry;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::common::error::Result;
use crate::domain::{CanonicalEvents, Hotel, NormalizedWebhook, Stay, UnifiedProduct};
use crate::storage::Store;

pub use registry::ProviderRegistry;

/// One catalog entry exactly as the vendor returned it
pub type RawProduct = serde_json::Value;

/// Capabilities every PMS adapter provides.
///
/// Providers are stateless apart from their vendor handle, so one value can
/// serve any hotel of that PMS.
#[async_trait]
pub trait PmsProvider: Send + Sync {
    /// Capitalized registry name, e.g. `Apaleo`
    fn name(&self) -> &'static str;

    /// Validate a raw webhook body and route it to a known hotel.
    ///
    /// Returns `InvalidPayload` for anything malformed and `UnknownHotel`
    /// when the payload is well formed but names a hotel we do not manage.
    async fn normalize_webhook(&self, payload: &[u8], store: &dyn Store)
        -> Result<NormalizedWebhook>;

    /// Apply canonical events to the hotel's stays. `Ok(false)` means the
    /// provider declined the events and the PMS should resend.
    async fn handle_webhook(
        &self,
        hotel: &Hotel,
        events: &CanonicalEvents,
        store: &dyn Store,
    ) -> Result<bool>;

    /// Apply every reservation arriving at `hotel` on `checkin`; returns the
    /// number of stays updated.
    async fn sync_arrivals(&self, hotel: &Hotel, checkin: NaiveDate, store: &dyn Store)
        -> Result<usize>;

    async fn fetch_catalog(&self, hotel: &Hotel) -> Result<Vec<RawProduct>>;

    /// Map one raw catalog entry onto the unified shape. Total over partial input.
    fn adapt(&self, raw: &RawProduct) -> UnifiedProduct;

    /// Real-time breakfast lookup; `None` when the PMS cannot tell right now
    async fn stay_has_breakfast(&self, stay: &Stay) -> Option<bool>;
}

/// Pull the product list out of a catalog document, tolerating a bare array.
pub(crate) fn catalog_items(document: serde_json::Value, list_key: &str) -> Vec<RawProduct> {
    match document {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove(list_key) {
            Some(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_items_reads_list_key_or_bare_array() {
        let wrapped = json!({"services": [{"id": "A"}, {"id": "B"}]});
        assert_eq!(catalog_items(wrapped, "services").len(), 2);

        let bare = json!([{"id": "A"}]);
        assert_eq!(catalog_items(bare, "services").len(), 1);

        assert!(catalog_items(json!({"other": []}), "services").is_empty());
        assert!(catalog_items(json!("nope"), "services").is_empty());
    }
}
