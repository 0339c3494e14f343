use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use super::traits::Store;
use crate::catalog::reconcile;
use crate::common::error::{PmsError, Result};
use crate::domain::{Guest, Hotel, Language, Stay, StayStatus, UnifiedProduct, UpsellProduct};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS hotel (
        id            TEXT PRIMARY KEY,
        name          TEXT NOT NULL,
        city          TEXT NOT NULL,
        pms           TEXT,
        pms_hotel_id  TEXT NOT NULL,
        created_at    TEXT NOT NULL,
        updated_at    TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS hotel_pms_idx ON hotel (pms, pms_hotel_id);
    CREATE TABLE IF NOT EXISTS guest (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        phone       TEXT NOT NULL UNIQUE,
        language    TEXT,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS stay (
        id                  TEXT PRIMARY KEY,
        hotel_id            TEXT NOT NULL REFERENCES hotel (id) ON DELETE CASCADE,
        guest_id            TEXT REFERENCES guest (id) ON DELETE CASCADE,
        pms_reservation_id  TEXT NOT NULL,
        pms_guest_id        TEXT,
        status              TEXT NOT NULL DEFAULT 'unknown',
        checkin             TEXT,
        checkout            TEXT,
        created_at          TEXT NOT NULL,
        updated_at          TEXT NOT NULL,
        UNIQUE (hotel_id, pms_reservation_id)
    );
    CREATE TABLE IF NOT EXISTS upsell_product (
        id            TEXT PRIMARY KEY,
        hotel_id      TEXT NOT NULL REFERENCES hotel (id) ON DELETE CASCADE,
        pms_id        TEXT NOT NULL UNIQUE,
        name          TEXT NOT NULL,
        code          TEXT NOT NULL,
        description   TEXT NOT NULL,
        price         TEXT NOT NULL,
        age_category  TEXT NOT NULL,
        created_at    TEXT NOT NULL,
        updated_at    TEXT NOT NULL
    );
"#;

const HOTEL_COLUMNS: &str = "id, name, city, pms, pms_hotel_id, created_at, updated_at";
const STAY_COLUMNS: &str = "id, hotel_id, guest_id, pms_reservation_id, pms_guest_id, status, \
                            checkin, checkout, created_at, updated_at";
const GUEST_COLUMNS: &str = "id, name, phone, language, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, hotel_id, pms_id, name, code, description, price, \
                               age_category, created_at, updated_at";

/// SQLite-backed store. The upsell upsert runs inside a single transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!("Opened SQLite store at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PmsError::storage("sqlite connection lock poisoned"))
    }
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn hotel_from_row(row: &Row<'_>) -> rusqlite::Result<Hotel> {
    Ok(Hotel {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        pms_provider_name: row.get(3)?,
        pms_hotel_id: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
        updated_at: timestamp_at(row, 6)?,
    })
}

fn stay_from_row(row: &Row<'_>) -> rusqlite::Result<Stay> {
    let status: String = row.get(5)?;
    Ok(Stay {
        id: uuid_at(row, 0)?,
        hotel_id: uuid_at(row, 1)?,
        guest_id: opt_uuid_at(row, 2)?,
        pms_reservation_id: row.get(3)?,
        pms_guest_id: row.get(4)?,
        status: StayStatus::parse(&status),
        checkin: opt_date_at(row, 6)?,
        checkout: opt_date_at(row, 7)?,
        created_at: timestamp_at(row, 8)?,
        updated_at: timestamp_at(row, 9)?,
    })
}

fn guest_from_row(row: &Row<'_>) -> rusqlite::Result<Guest> {
    let language: Option<String> = row.get(3)?;
    Ok(Guest {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        language: language.as_deref().and_then(Language::from_code),
        created_at: timestamp_at(row, 4)?,
        updated_at: timestamp_at(row, 5)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<UpsellProduct> {
    Ok(UpsellProduct {
        id: uuid_at(row, 0)?,
        hotel_id: uuid_at(row, 1)?,
        pms_id: row.get(2)?,
        name: row.get(3)?,
        code: row.get(4)?,
        description: row.get(5)?,
        price: row.get(6)?,
        age_category: row.get(7)?,
        created_at: timestamp_at(row, 8)?,
        updated_at: timestamp_at(row, 9)?,
    })
}

fn hotel_exists(conn: &Connection, hotel_id: Uuid) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM hotel WHERE id = ?1",
            params![hotel_id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_hotel(&self, hotel: &Hotel) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO hotel ({HOTEL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                hotel.id.to_string(),
                hotel.name,
                hotel.city,
                hotel.pms_provider_name,
                hotel.pms_hotel_id,
                hotel.created_at.to_rfc3339(),
                hotel.updated_at.to_rfc3339(),
            ],
        )?;
        debug!("Created hotel: {} with id {}", hotel.name, hotel.id);
        Ok(())
    }

    async fn find_hotel(&self, hotel_id: Uuid) -> Result<Option<Hotel>> {
        let conn = self.conn()?;
        let hotel = conn
            .query_row(
                &format!("SELECT {HOTEL_COLUMNS} FROM hotel WHERE id = ?1"),
                params![hotel_id.to_string()],
                hotel_from_row,
            )
            .optional()?;
        Ok(hotel)
    }

    async fn find_hotel_by_external_id(
        &self,
        provider: &str,
        pms_hotel_id: &str,
    ) -> Result<Option<Hotel>> {
        let conn = self.conn()?;
        let hotel = conn
            .query_row(
                &format!(
                    "SELECT {HOTEL_COLUMNS} FROM hotel WHERE pms = ?1 COLLATE NOCASE AND pms_hotel_id = ?2 \
                     ORDER BY created_at LIMIT 1"
                ),
                params![provider, pms_hotel_id],
                hotel_from_row,
            )
            .optional()?;
        Ok(hotel)
    }

    async fn list_hotels(&self) -> Result<Vec<Hotel>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HOTEL_COLUMNS} FROM hotel ORDER BY city, name"
        ))?;
        let hotels = stmt
            .query_map([], hotel_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
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

        let mut conn = self.conn()?;
        // Dropping the transaction without commit rolls both batches back
        let tx = conn.transaction()?;
        if !hotel_exists(&tx, hotel_id)? {
            return Err(PmsError::NotFound(format!("hotel {hotel_id}")));
        }

        let keys = reconcile::collect_keys(products);
        let existing = if keys.is_empty() {
            Vec::new()
        } else {
            let placeholders = vec!["?"; keys.len()].join(", ");
            let mut stmt = tx.prepare(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM upsell_product WHERE pms_id IN ({placeholders})"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(keys.iter()), product_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let plan = reconcile::plan_upsert(hotel_id, existing, products);
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO upsell_product ({PRODUCT_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ))?;
            for p in &plan.creates {
                insert.execute(params![
                    p.id.to_string(),
                    p.hotel_id.to_string(),
                    p.pms_id,
                    p.name,
                    p.code,
                    p.description,
                    p.price,
                    p.age_category,
                    p.created_at.to_rfc3339(),
                    p.updated_at.to_rfc3339(),
                ])?;
            }

            let mut update = tx.prepare(
                "UPDATE upsell_product SET hotel_id = ?2, name = ?3, code = ?4, description = ?5, \
                 price = ?6, age_category = ?7, updated_at = ?8 WHERE pms_id = ?1",
            )?;
            for p in &plan.updates {
                update.execute(params![
                    p.pms_id,
                    p.hotel_id.to_string(),
                    p.name,
                    p.code,
                    p.description,
                    p.price,
                    p.age_category,
                    p.updated_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            "Upserted {} upsell products for hotel {} ({} new, {} updated)",
            plan.len(),
            hotel_id,
            plan.creates.len(),
            plan.updates.len()
        );
        Ok(plan.len())
    }

    async fn list_upsell_products(&self, hotel_id: Uuid) -> Result<Vec<UpsellProduct>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM upsell_product WHERE hotel_id = ?1 ORDER BY pms_id"
        ))?;
        let products = stmt
            .query_map(params![hotel_id.to_string()], product_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    async fn find_or_create_stay(&self, hotel_id: Uuid, pms_reservation_id: &str) -> Result<Stay> {
        let conn = self.conn()?;
        if !hotel_exists(&conn, hotel_id)? {
            return Err(PmsError::NotFound(format!("hotel {hotel_id}")));
        }

        let fresh = Stay::new(hotel_id, pms_reservation_id);
        let inserted = conn.execute(
            &format!(
                "INSERT INTO stay ({STAY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                 ON CONFLICT (hotel_id, pms_reservation_id) DO NOTHING"
            ),
            params![
                fresh.id.to_string(),
                hotel_id.to_string(),
                Option::<String>::None,
                pms_reservation_id,
                Option::<String>::None,
                fresh.status.as_str(),
                Option::<String>::None,
                Option::<String>::None,
                fresh.created_at.to_rfc3339(),
                fresh.updated_at.to_rfc3339(),
            ],
        )?;
        if inserted > 0 {
            debug!("Created stay for reservation {} with id {}", pms_reservation_id, fresh.id);
        }

        let stay = conn.query_row(
            &format!(
                "SELECT {STAY_COLUMNS} FROM stay WHERE hotel_id = ?1 AND pms_reservation_id = ?2"
            ),
            params![hotel_id.to_string(), pms_reservation_id],
            stay_from_row,
        )?;
        Ok(stay)
    }

    async fn update_stay(&self, stay: &Stay) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE stay SET guest_id = ?2, pms_guest_id = ?3, status = ?4, checkin = ?5, \
             checkout = ?6, updated_at = ?7 WHERE id = ?1",
            params![
                stay.id.to_string(),
                stay.guest_id.map(|id| id.to_string()),
                stay.pms_guest_id,
                stay.status.as_str(),
                stay.checkin.map(|d| d.format("%Y-%m-%d").to_string()),
                stay.checkout.map(|d| d.format("%Y-%m-%d").to_string()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        if updated == 0 {
            return Err(PmsError::NotFound(format!("stay {}", stay.id)));
        }
        debug!("Updated stay {} ({})", stay.id, stay.status.as_str());
        Ok(())
    }

    async fn list_stays(&self, hotel_id: Uuid) -> Result<Vec<Stay>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STAY_COLUMNS} FROM stay WHERE hotel_id = ?1 ORDER BY created_at"
        ))?;
        let stays = stmt
            .query_map(params![hotel_id.to_string()], stay_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stays)
    }

    async fn upsert_guest_by_phone(&self, guest: &Guest) -> Result<Guest> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO guest ({GUEST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT (phone) DO UPDATE SET name = excluded.name, \
                 language = excluded.language, updated_at = excluded.updated_at"
            ),
            params![
                guest.id.to_string(),
                guest.name,
                guest.phone,
                guest.language.map(|l| l.code()),
                guest.created_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        let stored = conn.query_row(
            &format!("SELECT {GUEST_COLUMNS} FROM guest WHERE phone = ?1"),
            params![guest.phone],
            guest_from_row,
        )?;
        debug!("Upserted guest {} with id {}", stored.phone, stored.id);
        Ok(stored)
    }

    async fn find_guest(&self, guest_id: Uuid) -> Result<Option<Guest>> {
        let conn = self.conn()?;
        let guest = conn
            .query_row(
                &format!("SELECT {GUEST_COLUMNS} FROM guest WHERE id = ?1"),
                params![guest_id.to_string()],
                guest_from_row,
            )
            .optional()?;
        Ok(guest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn product(id: &str, name: &str) -> UnifiedProduct {
        UnifiedProduct {
            id: id.to_string(),
            name: name.to_string(),
            code: "BRKF".to_string(),
            description: "Breakfast".to_string(),
            price: "15.0 EUR".to_string(),
            age_category: "BER-ADULTS".to_string(),
        }
    }

    async fn store_with_hotel() -> (SqliteStore, Hotel) {
        let store = SqliteStore::open_in_memory().unwrap();
        let hotel = Hotel::new(
            "Hotel 1",
            "Berlin",
            Some("Apaleo"),
            "851df8c8-90f2-4c4a-8e01-a4fc46b25178",
        );
        store.create_hotel(&hotel).await.unwrap();
        (store, hotel)
    }

    #[tokio::test]
    async fn test_hotel_round_trips_through_sqlite() {
        let (store, hotel) = store_with_hotel().await;
        let found = store.find_hotel(hotel.id).await.unwrap().unwrap();
        assert_eq!(found.pms_hotel_id, hotel.pms_hotel_id);
        assert_eq!(found.pms_provider_name.as_deref(), Some("Apaleo"));
        assert!(store.find_hotel(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_external_lookup_ignores_provider_case() {
        let store = SqliteStore::open_in_memory().unwrap();
        let hotel = Hotel::new("Hotel 1", "Berlin", Some("apaleo"), "PMS-1");
        store.create_hotel(&hotel).await.unwrap();

        let found = store.find_hotel_by_external_id("Apaleo", "PMS-1").await.unwrap();
        assert_eq!(found.map(|h| h.id), Some(hotel.id));
        assert!(store
            .find_hotel_by_external_id("Guestline", "PMS-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_last_write_wins() {
        let (store, hotel) = store_with_hotel().await;
        let written = store
            .upsert_upsell_products(hotel.id, &[product("X", "first"), product("Y", "other")])
            .await
            .unwrap();
        assert_eq!(written, 2);

        store
            .upsert_upsell_products(hotel.id, &[product("X", "second")])
            .await
            .unwrap();

        let stored = store.list_upsell_products(hotel.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].pms_id, "X");
        assert_eq!(stored[0].name, "second");
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back_creates_and_updates() {
        let (store, hotel) = store_with_hotel().await;
        store
            .upsert_upsell_products(hotel.id, &[product("X", "original")])
            .await
            .unwrap();

        store
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_boom BEFORE INSERT ON upsell_product \
                 WHEN NEW.pms_id = 'BOOM' BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )
            .unwrap();

        let result = store
            .upsert_upsell_products(
                hotel.id,
                &[product("X", "changed"), product("NEW", "new"), product("BOOM", "fails")],
            )
            .await;
        assert!(matches!(result, Err(PmsError::Storage { .. })));

        let stored = store.list_upsell_products(hotel.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "original");
    }

    #[tokio::test]
    async fn test_stay_lookup_is_unique_per_hotel_and_reservation() {
        let (store, hotel) = store_with_hotel().await;
        let mut stay = store.find_or_create_stay(hotel.id, "R1").await.unwrap();
        stay.status = StayStatus::InStay;
        stay.checkin = NaiveDate::from_ymd_opt(2025, 2, 8);
        store.update_stay(&stay).await.unwrap();

        let again = store.find_or_create_stay(hotel.id, "R1").await.unwrap();
        assert_eq!(again.id, stay.id);
        assert_eq!(again.status, StayStatus::InStay);
        assert_eq!(again.checkin, NaiveDate::from_ymd_opt(2025, 2, 8));
        assert_eq!(store.list_stays(hotel.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_guest_upsert_by_phone_keeps_first_id() {
        let (store, _) = store_with_hotel().await;
        let first = store
            .upsert_guest_by_phone(&Guest::new("Izzy", "+442071234567", None))
            .await
            .unwrap();
        let second = store
            .upsert_guest_by_phone(&Guest::new(
                "Izzy Smith",
                "+442071234567",
                Some(Language::BritishEnglish),
            ))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.language, Some(Language::BritishEnglish));
    }

    #[tokio::test]
    async fn test_open_creates_database_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("pms.db");
        let store = SqliteStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.list_hotels().await.unwrap().is_empty());
    }
}
