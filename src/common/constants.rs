/// Provider name constants to ensure consistency across the codebase.
/// Registry lookups capitalize the incoming name before matching these.
pub const APALEO_PROVIDER: &str = "Apaleo";
pub const GUESTLINE_PROVIDER: &str = "Guestline";

/// Acknowledgement body returned to the PMS on a handled webhook
pub const WEBHOOK_ACK_BODY: &str = "Thanks for the update.";

// Apaleo webhook payload keys
pub const APALEO_HOTEL_ID_KEY: &str = "HotelId";
pub const APALEO_EVENTS_KEY: &str = "Events";
pub const APALEO_EVENT_NAME_KEY: &str = "Name";
pub const APALEO_EVENT_VALUE_KEY: &str = "Value";
pub const APALEO_RESERVATION_ID_KEY: &str = "ReservationId";

// Catalog list keys per provider
pub const APALEO_CATALOG_KEY: &str = "services";
pub const GUESTLINE_CATALOG_KEY: &str = "products";
