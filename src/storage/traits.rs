use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::Result;
use crate::domain::{Guest, Hotel, Stay, UnifiedProduct, UpsellProduct};

/// Storage trait for the hotel aggregate: hotels, stays, guests and upsell products.
///
/// Multi-record writes (`upsert_upsell_products`) are atomic: either every
/// record of the batch is applied or none is.
#[async_trait]
pub trait Store: Send + Sync {
    // Hotel operations
    async fn create_hotel(&self, hotel: &Hotel) -> Result<()>;
    async fn find_hotel(&self, hotel_id: Uuid) -> Result<Option<Hotel>>;
    async fn find_hotel_by_external_id(
        &self,
        provider: &str,
        pms_hotel_id: &str,
    ) -> Result<Option<Hotel>>;
    async fn list_hotels(&self) -> Result<Vec<Hotel>>;

    // Upsell product operations

    /// Create-or-update fetched products keyed by `pms_id`. Returns the number of records written.
    ///
    /// Two concurrent calls touching the same `pms_id` are not serialized
    /// against each other; the last one to commit wins.
    async fn upsert_upsell_products(
        &self,
        hotel_id: Uuid,
        products: &[UnifiedProduct],
    ) -> Result<usize>;
    async fn list_upsell_products(&self, hotel_id: Uuid) -> Result<Vec<UpsellProduct>>;

    // Stay operations
    async fn find_or_create_stay(&self, hotel_id: Uuid, pms_reservation_id: &str) -> Result<Stay>;
    async fn update_stay(&self, stay: &Stay) -> Result<()>;
    async fn list_stays(&self, hotel_id: Uuid) -> Result<Vec<Stay>>;

    // Guest operations

    /// Insert a guest or overwrite the one holding the same phone. Returns the stored record.
    async fn upsert_guest_by_phone(&self, guest: &Guest) -> Result<Guest>;
    async fn find_guest(&self, guest_id: Uuid) -> Result<Option<Guest>>;
}
