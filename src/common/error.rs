use thiserror::Error;

/// Error taxonomy for the PMS adapter layer.
///
/// The HTTP boundary collapses these into a handful of status codes, so every
/// variant carries a stable [`PmsError::kind`] used in logs and metric labels.
#[derive(Error, Debug)]
pub enum PmsError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unknown hotel: provider={provider} pms_hotel_id={pms_hotel_id}")]
    UnknownHotel {
        provider: String,
        pms_hotel_id: String,
    },

    #[error("Invalid provider name: {0:?}")]
    InvalidName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Vendor temporarily unavailable: {0}")]
    TemporarilyUnavailable(String),

    #[error("Webhook handling failed: {0}")]
    HandlerFailure(String),

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PmsError {
    pub fn kind(&self) -> &'static str {
        match self {
            PmsError::InvalidPayload(_) => "invalid_payload",
            PmsError::UnknownHotel { .. } => "unknown_hotel",
            PmsError::InvalidName(_) => "invalid_name",
            PmsError::NotFound(_) => "not_found",
            PmsError::TemporarilyUnavailable(_) => "temporarily_unavailable",
            PmsError::HandlerFailure(_) => "handler_failure",
            PmsError::Storage { .. } => "storage",
            PmsError::Json(_) => "json",
            PmsError::Io(_) => "io",
            PmsError::Config(_) => "config",
        }
    }

    /// Whether a caller may retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PmsError::TemporarilyUnavailable(_))
    }

    pub fn storage(message: impl Into<String>) -> Self {
        PmsError::Storage {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for PmsError {
    fn from(e: rusqlite::Error) -> Self {
        PmsError::Storage {
            message: e.to_string(),
        }
    }
}

impl From<toml::de::Error> for PmsError {
    fn from(e: toml::de::Error) -> Self {
        PmsError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_payload_and_unknown_hotel_are_distinct_kinds() {
        let invalid = PmsError::InvalidPayload("empty".into());
        let unknown = PmsError::UnknownHotel {
            provider: "Apaleo".into(),
            pms_hotel_id: "851df8c8-90f2-4c4a-8e01-a4fc46b25178".into(),
        };
        assert_ne!(invalid.kind(), unknown.kind());
    }

    #[test]
    fn test_only_vendor_outage_is_retryable() {
        assert!(PmsError::TemporarilyUnavailable("down".into()).is_retryable());
        assert!(!PmsError::HandlerFailure("rejected".into()).is_retryable());
        assert!(!PmsError::storage("locked").is_retryable());
    }
}
