use crate::domain::UnifiedProduct;
use crate::providers::fields::{price, text};
use crate::providers::RawProduct;

/// Map a Guestline product onto the unified product shape. A missing amount is `0`.
pub fn adapt(raw: &RawProduct) -> UnifiedProduct {
    UnifiedProduct {
        id: text(raw.get("id")),
        name: text(raw.get("name")),
        code: text(raw.get("code")),
        description: text(raw.get("description")),
        price: price(raw.get("grossPrice"), "0"),
        age_category: text(raw.get("ageCategory")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adapts_full_product() {
        let raw = json!({
            "id": "LON-PARK",
            "code": "PARK",
            "name": "Parking",
            "description": "Underground parking per night",
            "grossPrice": {"amount": 20.0, "currency": "GBP"},
            "ageCategory": "ADULT"
        });
        let product = adapt(&raw);
        assert_eq!(product.name, "Parking");
        assert_eq!(product.price, "20.0 GBP");
        assert_eq!(product.age_category, "ADULT");
    }

    #[test]
    fn test_missing_price_defaults_to_zero() {
        let product = adapt(&json!({"id": "LON-DRINK", "name": "Welcome drink"}));
        assert_eq!(product.price, "0 ");
        assert_eq!(product.code, "");
    }
}
