use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event name -> reservation ids, in the order the PMS sent them.
pub type CanonicalEvents = IndexMap<String, Vec<String>>;

/// Result of webhook normalization. Always carries the routed hotel together with the events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWebhook {
    pub hotel_id: Uuid,
    pub events: CanonicalEvents,
}

impl NormalizedWebhook {
    /// Reservation ids across all event groups, deduplicated, first-seen order
    pub fn reservation_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.events
            .values()
            .flatten()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// Vendor-agnostic upsell offering. No field is ever null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedProduct {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub age_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub pms_provider_name: Option<String>,
    pub pms_hotel_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hotel {
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        pms_provider_name: Option<&str>,
        pms_hotel_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            city: city.into(),
            pms_provider_name: pms_provider_name.map(str::to_string),
            pms_hotel_id: pms_hotel_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StayStatus {
    Cancelled,
    Before,
    InStay,
    After,
    #[default]
    Unknown,
}

impl StayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StayStatus::Cancelled => "cancelled",
            StayStatus::Before => "before",
            StayStatus::InStay => "in-stay",
            StayStatus::After => "after",
            StayStatus::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cancelled" => StayStatus::Cancelled,
            "before" => StayStatus::Before,
            "in-stay" => StayStatus::InStay,
            "after" => StayStatus::After,
            _ => StayStatus::Unknown,
        }
    }

    /// Map a vendor reservation status onto the stay lifecycle.
    pub fn from_vendor_status(status: &str) -> Self {
        match status {
            "in_house" => StayStatus::InStay,
            "checked_out" => StayStatus::After,
            "cancelled" | "no_show" => StayStatus::Cancelled,
            "booked" | "not_confirmed" => StayStatus::Before,
            _ => StayStatus::Unknown,
        }
    }
}

/// One guest's reservation at one hotel. Unique per (hotel_id, pms_reservation_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stay {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub guest_id: Option<Uuid>,
    pub pms_reservation_id: String,
    /// Guest id on the PMS side. Kept per stay since one phone can map to several PMS guests.
    pub pms_guest_id: Option<String>,
    pub status: StayStatus,
    pub checkin: Option<NaiveDate>,
    pub checkout: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stay {
    pub fn new(hotel_id: Uuid, pms_reservation_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            guest_id: None,
            pms_reservation_id: pms_reservation_id.into(),
            pms_guest_id: None,
            status: StayStatus::Unknown,
            checkin: None,
            checkout: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "de")]
    German,
    #[serde(rename = "en-GB")]
    BritishEnglish,
    #[serde(rename = "es-ES")]
    SpanishSpain,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "nl")]
    Dutch,
    #[serde(rename = "pt-PT")]
    PortuguesePortugal,
    #[serde(rename = "sv")]
    Swedish,
    #[serde(rename = "da")]
    Danish,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::German => "de",
            Language::BritishEnglish => "en-GB",
            Language::SpanishSpain => "es-ES",
            Language::French => "fr",
            Language::Italian => "it",
            Language::Dutch => "nl",
            Language::PortuguesePortugal => "pt-PT",
            Language::Swedish => "sv",
            Language::Danish => "da",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "de" => Some(Language::German),
            "en-GB" => Some(Language::BritishEnglish),
            "es-ES" => Some(Language::SpanishSpain),
            "fr" => Some(Language::French),
            "it" => Some(Language::Italian),
            "nl" => Some(Language::Dutch),
            "pt-PT" => Some(Language::PortuguesePortugal),
            "sv" => Some(Language::Swedish),
            "da" => Some(Language::Danish),
            _ => None,
        }
    }

    /// Best guess of a guest's language from an ISO country code
    pub fn from_country(country: &str) -> Option<Self> {
        match country.to_ascii_uppercase().as_str() {
            "DE" | "AT" => Some(Language::German),
            "NL" => Some(Language::Dutch),
            "GB" | "GG" | "IE" | "AU" | "CA" => Some(Language::BritishEnglish),
            "BR" | "PT" => Some(Language::PortuguesePortugal),
            "ES" => Some(Language::SpanishSpain),
            "FR" => Some(Language::French),
            "IT" => Some(Language::Italian),
            "SE" => Some(Language::Swedish),
            "DK" => Some(Language::Danish),
            _ => None,
        }
    }
}

/// Guests are identified by their phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub language: Option<Language>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Guest {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, language: Option<Language>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: phone.into(),
            language,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Persisted upsell product, keyed by the provider-assigned `pms_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsellProduct {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub pms_id: String,
    pub name: String,
    pub code: String,
    pub description: String,
    pub price: String,
    pub age_category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UpsellProduct {
    pub fn from_unified(hotel_id: Uuid, product: &UnifiedProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            pms_id: product.id.clone(),
            name: product.name.clone(),
            code: product.code.clone(),
            description: product.description.clone(),
            price: product.price.clone(),
            age_category: product.age_category.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite every catalog field from the fetched product. Last write wins.
    pub fn apply(&mut self, hotel_id: Uuid, product: &UnifiedProduct) {
        self.hotel_id = hotel_id;
        self.name = product.name.clone();
        self.code = product.code.clone();
        self.description = product.description.clone();
        self.price = product.price.clone();
        self.age_category = product.age_category.clone();
        self.updated_at = Utc::now();
    }

    pub fn to_unified(&self) -> UnifiedProduct {
        UnifiedProduct {
            id: self.pms_id.clone(),
            name: self.name.clone(),
            code: self.code.clone(),
            description: self.description.clone(),
            price: self.price.clone(),
            age_category: self.age_category.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_status_mapping() {
        assert_eq!(StayStatus::from_vendor_status("in_house"), StayStatus::InStay);
        assert_eq!(StayStatus::from_vendor_status("checked_out"), StayStatus::After);
        assert_eq!(StayStatus::from_vendor_status("no_show"), StayStatus::Cancelled);
        assert_eq!(StayStatus::from_vendor_status("booked"), StayStatus::Before);
        assert_eq!(StayStatus::from_vendor_status("teleported"), StayStatus::Unknown);
    }

    #[test]
    fn test_stay_status_serializes_kebab_case() {
        let json = serde_json::to_string(&StayStatus::InStay).unwrap();
        assert_eq!(json, "\"in-stay\"");
        assert_eq!(StayStatus::parse(StayStatus::InStay.as_str()), StayStatus::InStay);
    }

    #[test]
    fn test_reservation_ids_are_deduplicated_in_order() {
        let mut events = CanonicalEvents::new();
        events.insert("Created".into(), vec!["R1".into(), "R2".into()]);
        events.insert("Changed".into(), vec!["R2".into(), "R3".into()]);
        let normalized = NormalizedWebhook {
            hotel_id: Uuid::new_v4(),
            events,
        };
        assert_eq!(normalized.reservation_ids(), vec!["R1", "R2", "R3"]);
    }

    #[test]
    fn test_apply_overwrites_every_field() {
        let hotel_id = Uuid::new_v4();
        let first = UnifiedProduct {
            id: "X".into(),
            name: "Breakfast".into(),
            price: "15.0 EUR".into(),
            ..Default::default()
        };
        let mut stored = UpsellProduct::from_unified(hotel_id, &first);
        let second = UnifiedProduct {
            id: "X".into(),
            name: "Super Breakfast".into(),
            ..Default::default()
        };
        stored.apply(hotel_id, &second);
        assert_eq!(stored.to_unified(), second);
    }
}
