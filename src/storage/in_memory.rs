use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::traits::Store;
use crate::catalog::reconcile;
use crate::common::error::{PmsError, Result};
use crate::domain::{Guest, Hotel, Stay, UnifiedProduct, UpsellProduct};

#[derive(Default)]
struct Tables {
    hotels: HashMap<Uuid, Hotel>,
    stays: HashMap<Uuid, Stay>,
    guests: HashMap<Uuid, Guest>,
    /// Keyed by `pms_id`
    upsell_products: HashMap<String, UpsellProduct>,
}

/// In-memory storage implementation for development/testing.
///
/// All tables sit behind one lock, so a batch write is applied under a
/// single guard and readers never observe half of it.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PmsError::storage("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_hotel(&self, hotel: &Hotel) -> Result<()> {
        let mut tables = self.tables()?;
        tables.hotels.insert(hotel.id, hotel.clone());
        debug!("Created hotel: {} with id {}", hotel.name, hotel.id);
        Ok(())
    }

    async fn find_hotel(&self, hotel_id: Uuid) -> Result<Option<Hotel>> {
        let tables = self.tables()?;
        Ok(tables.hotels.get(&hotel_id).cloned())
    }

    async fn find_hotel_by_external_id(
        &self,
        provider: &str,
        pms_hotel_id: &str,
    ) -> Result<Option<Hotel>> {
        let tables = self.tables()?;
        let hotel = tables
            .hotels
            .values()
            .find(|h| {
                h.pms_provider_name
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(provider))
                    && h.pms_hotel_id == pms_hotel_id
            })
            .cloned();
        Ok(hotel)
    }

    async fn list_hotels(&self) -> Result<Vec<Hotel>> {
        let tables = self.tables()?;
        let mut hotels: Vec<Hotel> = tables.hotels.values().cloned().collect();
        hotels.sort_by(|a, b| a.city.cmp(&b.city).then_with(|| a.name.cmp(&b.name)));
        Ok(hotels)
    }

    async fn upsert_upsell_products(
        &self,
        hotel_id: Uuid,
        products: &[UnifiedProduct],
    ) -> Result<usize> {
        if products.is_empty() {
            return Ok(0);
        }

        let mut tables = self.tables()?;
        if !tables.hotels.contains_key(&hotel_id) {
            return Err(PmsError::NotFound(format!("hotel {hotel_id}")));
        }

        let existing = reconcile::collect_keys(products)
            .iter()
            .filter_map(|key| tables.upsell_products.get(key).cloned())
            .collect();
        let plan = reconcile::plan_upsert(hotel_id, existing, products);
        let written = plan.len();

        debug!(
            "Upserting {} upsell products for hotel {} ({} new, {} updated)",
            written,
            hotel_id,
            plan.creates.len(),
            plan.updates.len()
        );
        for product in plan.creates.into_iter().chain(plan.updates) {
            tables.upsell_products.insert(product.pms_id.clone(), product);
        }
        Ok(written)
    }

    async fn list_upsell_products(&self, hotel_id: Uuid) -> Result<Vec<UpsellProduct>> {
        let tables = self.tables()?;
        let mut products: Vec<UpsellProduct> = tables
            .upsell_products
            .values()
            .filter(|p| p.hotel_id == hotel_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.pms_id.cmp(&b.pms_id));
        Ok(products)
    }

    async fn find_or_create_stay(&self, hotel_id: Uuid, pms_reservation_id: &str) -> Result<Stay> {
        let mut tables = self.tables()?;
        if !tables.hotels.contains_key(&hotel_id) {
            return Err(PmsError::NotFound(format!("hotel {hotel_id}")));
        }

        let existing = tables
            .stays
            .values()
            .find(|s| s.hotel_id == hotel_id && s.pms_reservation_id == pms_reservation_id)
            .cloned();
        if let Some(stay) = existing {
            return Ok(stay);
        }

        let stay = Stay::new(hotel_id, pms_reservation_id);
        tables.stays.insert(stay.id, stay.clone());
        debug!("Created stay for reservation {} with id {}", pms_reservation_id, stay.id);
        Ok(stay)
    }

    async fn update_stay(&self, stay: &Stay) -> Result<()> {
        let mut tables = self.tables()?;
        let slot = tables
            .stays
            .get_mut(&stay.id)
            .ok_or_else(|| PmsError::NotFound(format!("stay {}", stay.id)))?;
        *slot = Stay {
            updated_at: Utc::now(),
            ..stay.clone()
        };
        debug!("Updated stay {} ({})", stay.id, stay.status.as_str());
        Ok(())
    }

    async fn list_stays(&self, hotel_id: Uuid) -> Result<Vec<Stay>> {
        let tables = self.tables()?;
        let mut stays: Vec<Stay> = tables
            .stays
            .values()
            .filter(|s| s.hotel_id == hotel_id)
            .cloned()
            .collect();
        stays.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(stays)
    }

    async fn upsert_guest_by_phone(&self, guest: &Guest) -> Result<Guest> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;
        let existing = tables.guests.values_mut().find(|g| g.phone == guest.phone);

        let stored = match existing {
            Some(existing) => {
                // phone is the identity; the stored id survives
                existing.name = guest.name.clone();
                existing.language = guest.language;
                existing.updated_at = Utc::now();
                existing.clone()
            }
            None => {
                tables.guests.insert(guest.id, guest.clone());
                guest.clone()
            }
        };
        debug!("Upserted guest {} with id {}", stored.phone, stored.id);
        Ok(stored)
    }

    async fn find_guest(&self, guest_id: Uuid) -> Result<Option<Guest>> {
        let tables = self.tables()?;
        Ok(tables.guests.get(&guest_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Language;

    async fn store_with_hotel() -> (InMemoryStore, Hotel) {
        let store = InMemoryStore::new();
        let hotel = Hotel::new(
            "Hotel 1",
            "Berlin",
            Some("Apaleo"),
            "851df8c8-90f2-4c4a-8e01-a4fc46b25178",
        );
        store.create_hotel(&hotel).await.unwrap();
        (store, hotel)
    }

    fn product(id: &str, name: &str) -> UnifiedProduct {
        UnifiedProduct {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_find_hotel_by_external_id_is_scoped_by_provider() {
        let (store, hotel) = store_with_hotel().await;
        let found = store
            .find_hotel_by_external_id("Apaleo", &hotel.pms_hotel_id)
            .await
            .unwrap();
        assert_eq!(found.map(|h| h.id), Some(hotel.id));

        let other = store
            .find_hotel_by_external_id("Guestline", &hotel.pms_hotel_id)
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_find_hotel_by_external_id_ignores_provider_case() {
        let store = InMemoryStore::new();
        let hotel = Hotel::new("Hotel 1", "Berlin", Some("apaleo"), "PMS-1");
        store.create_hotel(&hotel).await.unwrap();

        let found = store.find_hotel_by_external_id("Apaleo", "PMS-1").await.unwrap();
        assert_eq!(found.map(|h| h.id), Some(hotel.id));
    }

    #[tokio::test]
    async fn test_upsert_twice_does_not_duplicate() {
        let (store, hotel) = store_with_hotel().await;
        let batch = vec![product("BER-BRKF", "Breakfast"), product("BER-WLAN", "WLAN")];

        assert_eq!(store.upsert_upsell_products(hotel.id, &batch).await.unwrap(), 2);
        assert_eq!(store.upsert_upsell_products(hotel.id, &batch).await.unwrap(), 2);
        assert_eq!(store.list_upsell_products(hotel.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let (store, hotel) = store_with_hotel().await;
        store
            .upsert_upsell_products(hotel.id, &[product("X", "first")])
            .await
            .unwrap();
        store
            .upsert_upsell_products(hotel.id, &[product("X", "second")])
            .await
            .unwrap();

        let stored = store.list_upsell_products(hotel.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "second");
    }

    #[tokio::test]
    async fn test_upsert_empty_batch_is_noop() {
        let (store, hotel) = store_with_hotel().await;
        assert_eq!(store.upsert_upsell_products(hotel.id, &[]).await.unwrap(), 0);
        assert!(store.list_upsell_products(hotel.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_for_unknown_hotel_writes_nothing() {
        let (store, hotel) = store_with_hotel().await;
        let result = store
            .upsert_upsell_products(Uuid::new_v4(), &[product("X", "orphan")])
            .await;
        assert!(matches!(result, Err(PmsError::NotFound(_))));
        assert!(store.list_upsell_products(hotel.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_or_create_stay_is_idempotent() {
        let (store, hotel) = store_with_hotel().await;
        let first = store.find_or_create_stay(hotel.id, "R1").await.unwrap();
        let second = store.find_or_create_stay(hotel.id, "R1").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_stays(hotel.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_guest_upsert_keeps_identity_per_phone() {
        let store = InMemoryStore::new();
        let first = store
            .upsert_guest_by_phone(&Guest::new("Jane Doe", "+491234567890", None))
            .await
            .unwrap();
        let second = store
            .upsert_guest_by_phone(&Guest::new(
                "Jane Smith",
                "+491234567890",
                Some(Language::German),
            ))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Jane Smith");
        let stored = store.find_guest(first.id).await.unwrap().unwrap();
        assert_eq!(stored.language, Some(Language::German));
    }
}
