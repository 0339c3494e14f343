use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::common::constants::{
    APALEO_EVENTS_KEY, APALEO_EVENT_NAME_KEY, APALEO_EVENT_VALUE_KEY, APALEO_HOTEL_ID_KEY,
    APALEO_PROVIDER, APALEO_RESERVATION_ID_KEY,
};
use crate::common::error::{PmsError, Result};
use crate::domain::{CanonicalEvents, NormalizedWebhook};
use crate::storage::Store;

/// Shape checks that need no store: JSON, a UUID `HotelId`, and the event groups.
pub fn parse_payload(payload: &[u8]) -> Result<(String, CanonicalEvents)> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        error!("Webhook payload is missing or empty");
        return Err(PmsError::InvalidPayload("payload is empty".to_string()));
    }

    let json: Value = serde_json::from_slice(payload).map_err(|e| {
        error!("Failed to parse webhook payload as JSON: {}", e);
        PmsError::InvalidPayload(format!("payload is not valid JSON: {e}"))
    })?;

    let pms_hotel_id = match json.get(APALEO_HOTEL_ID_KEY) {
        Some(Value::String(id)) if Uuid::parse_str(id).is_ok() => id.clone(),
        other => {
            error!("Invalid pms hotel id: {:?}", other);
            return Err(PmsError::InvalidPayload(format!(
                "{APALEO_HOTEL_ID_KEY} must be a UUID string"
            )));
        }
    };

    Ok((pms_hotel_id, group_events(&json)))
}

/// Group `Events[*]` by name into reservation id lists. Malformed entries are skipped.
pub fn group_events(json: &Value) -> CanonicalEvents {
    let mut events = CanonicalEvents::new();
    let entries = match json.get(APALEO_EVENTS_KEY) {
        Some(Value::Array(entries)) => entries.as_slice(),
        Some(other) => {
            warn!("Ignoring non-list {}: {}", APALEO_EVENTS_KEY, other);
            &[]
        }
        None => &[],
    };

    for entry in entries {
        let name = entry.get(APALEO_EVENT_NAME_KEY).and_then(Value::as_str);
        let reservation_id = entry
            .get(APALEO_EVENT_VALUE_KEY)
            .and_then(|v| v.get(APALEO_RESERVATION_ID_KEY))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty());

        match (name, reservation_id) {
            (Some(name), Some(id)) => events
                .entry(name.to_string())
                .or_default()
                .push(id.to_string()),
            _ => warn!("Skipping event with missing name or reservation id: {}", entry),
        }
    }
    events
}

/// Full normalization: shape checks, then route the payload to the Apaleo hotel it names.
pub async fn normalize(payload: &[u8], store: &dyn Store) -> Result<NormalizedWebhook> {
    let (pms_hotel_id, events) = parse_payload(payload)?;

    let hotel = store
        .find_hotel_by_external_id(APALEO_PROVIDER, &pms_hotel_id)
        .await?
        .ok_or_else(|| {
            error!("Hotel with pms hotel id {} not found", pms_hotel_id);
            PmsError::UnknownHotel {
                provider: APALEO_PROVIDER.to_string(),
                pms_hotel_id: pms_hotel_id.clone(),
            }
        })?;

    info!("Hotel found: {} (id={})", hotel.name, hotel.id);
    Ok(NormalizedWebhook {
        hotel_id: hotel.id,
        events,
    })
}
