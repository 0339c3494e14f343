use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::common::error::Result;
use crate::domain::{CanonicalEvents, Guest, Hotel, Language, StayStatus};
use crate::storage::Store;
use crate::vendor::{GuestDetails, ReservationDetails, RetryPolicy, VendorApi};

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{6,15}$").expect("valid phone regex"));

/// Guests without a usable phone number are not stored
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(phone)
}

/// Applies reservation events to a hotel's stays and guests.
pub struct ReservationSync<'a> {
    pub vendor: &'a dyn VendorApi,
    pub retry: RetryPolicy,
    pub store: &'a dyn Store,
}

impl<'a> ReservationSync<'a> {
    /// Refresh every reservation mentioned in `events`. Each id is handled
    /// once, whatever number of groups it appears in.
    #[instrument(skip_all, fields(hotel_id = %hotel.id))]
    pub async fn apply(&self, hotel: &Hotel, events: &CanonicalEvents) -> Result<bool> {
        let mut seen = std::collections::HashSet::new();
        let mut applied = 0usize;
        for reservation_id in events.values().flatten() {
            if !seen.insert(reservation_id.as_str()) {
                continue;
            }
            self.sync_reservation(hotel, reservation_id).await?;
            applied += 1;
        }
        info!("Applied {} reservations for hotel {}", applied, hotel.name);
        Ok(true)
    }

    /// Pull every reservation arriving on `checkin` and apply the ones that
    /// belong to `hotel`. Returns how many stays were updated.
    #[instrument(skip_all, fields(hotel_id = %hotel.id, %checkin))]
    pub async fn sync_arrivals(&self, hotel: &Hotel, checkin: NaiveDate) -> Result<usize> {
        let reservations = self
            .retry
            .run("fetch_reservations_for_checkin_date", || {
                self.vendor.fetch_reservations_for_checkin_date(checkin)
            })
            .await?;

        let mut applied = 0usize;
        for details in reservations {
            if details.hotel_id != hotel.pms_hotel_id {
                debug!(reservation_id = %details.reservation_id, "arrival for another hotel, skipping");
                continue;
            }
            self.apply_details(hotel, details).await?;
            applied += 1;
        }
        info!("Synced {} arrivals for hotel {}", applied, hotel.name);
        Ok(applied)
    }

    async fn sync_reservation(&self, hotel: &Hotel, reservation_id: &str) -> Result<()> {
        let details = self
            .retry
            .run("fetch_reservation_details", || {
                self.vendor.fetch_reservation_details(reservation_id)
            })
            .await?;
        self.apply_details(hotel, details).await
    }

    async fn apply_details(&self, hotel: &Hotel, details: ReservationDetails) -> Result<()> {
        let reservation_id = details.reservation_id.as_str();
        if details.hotel_id != hotel.pms_hotel_id {
            warn!(
                reservation_id,
                reported = %details.hotel_id,
                routed = %hotel.pms_hotel_id,
                "reservation reports a different hotel, applying to the routed one"
            );
        }

        let mut stay = self.store.find_or_create_stay(hotel.id, reservation_id).await?;
        stay.status = StayStatus::from_vendor_status(&details.status);
        stay.checkin = details.check_in_date;
        stay.checkout = details.check_out_date;
        stay.pms_guest_id = details.guest_id.clone();

        if let Some(guest_id) = details.guest_id.as_deref() {
            let guest = self
                .retry
                .run("fetch_guest_details", || self.vendor.fetch_guest_details(guest_id))
                .await?;
            stay.guest_id = match self.store_guest(guest).await? {
                Some(stored) => Some(stored.id),
                None => stay.guest_id,
            };
        }

        self.store.update_stay(&stay).await?;
        debug!(reservation_id, status = stay.status.as_str(), "stay updated");
        Ok(())
    }

    async fn store_guest(&self, details: GuestDetails) -> Result<Option<Guest>> {
        let phone = details.phone.unwrap_or_default();
        if !is_valid_phone(&phone) {
            warn!(
                pms_guest_id = %details.guest_id,
                phone = %phone,
                "guest has no valid phone number, not storing guest"
            );
            return Ok(None);
        }

        let language = details.country.as_deref().and_then(Language::from_country);
        let guest = Guest::new(details.name.unwrap_or_default(), phone, language);
        Ok(Some(self.store.upsert_guest_by_phone(&guest).await?))
    }
}
