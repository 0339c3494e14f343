use serde::Serialize;
use tracing::{info, instrument};

use crate::common::error::Result;
use crate::domain::{Hotel, UnifiedProduct};
use crate::metrics::CatalogMetrics;
use crate::providers::{PmsProvider, ProviderRegistry};
use crate::storage::Store;

/// Outcome of one catalog refresh
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub persisted: usize,
    pub products: Vec<UnifiedProduct>,
}

/// Fetch, adapt and persist a hotel's upsell catalog.
///
/// The three steps live on the provider and the store; this type only wires
/// them together and records metrics.
pub struct CatalogSync<'a> {
    registry: &'a ProviderRegistry,
    store: &'a dyn Store,
}

impl<'a> CatalogSync<'a> {
    pub fn new(registry: &'a ProviderRegistry, store: &'a dyn Store) -> Self {
        Self { registry, store }
    }

    #[instrument(skip_all, fields(hotel_id = %hotel.id))]
    pub async fn refresh(&self, hotel: &Hotel) -> Result<SyncReport> {
        let provider = self.registry.for_hotel(hotel)?;
        let result = refresh_with(provider.as_ref(), self.store, hotel).await;
        match &result {
            Ok(report) => CatalogMetrics::record_refresh(provider.name(), report.fetched, report.persisted),
            Err(e) => CatalogMetrics::record_refresh_error(provider.name(), e.kind()),
        }
        result
    }
}

/// fetch -> adapt -> upsert against one provider
pub async fn refresh_with(
    provider: &dyn PmsProvider,
    store: &dyn Store,
    hotel: &Hotel,
) -> Result<SyncReport> {
    let raw = provider.fetch_catalog(hotel).await?;
    let products: Vec<UnifiedProduct> = raw.iter().map(|item| provider.adapt(item)).collect();
    let persisted = store.upsert_upsell_products(hotel.id, &products).await?;

    info!(
        "Refreshed {} catalog for {}: {} fetched, {} persisted",
        provider.name(),
        hotel.name,
        raw.len(),
        persisted
    );
    Ok(SyncReport {
        fetched: raw.len(),
        persisted,
        products,
    })
}
