use crate::domain::UnifiedProduct;
use crate::providers::fields::{price, text};
use crate::providers::RawProduct;

/// Map an Apaleo service onto the unified product shape
pub fn adapt(raw: &RawProduct) -> UnifiedProduct {
    UnifiedProduct {
        id: text(raw.get("id")),
        name: text(raw.get("name")),
        code: text(raw.get("code")),
        description: text(raw.get("description")),
        price: price(raw.get("defaultGrossPrice"), ""),
        age_category: text(raw.get("ageCategoryId")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adapts_full_service() {
        let raw = json!({
            "id": "BER-BRKF",
            "code": "BRKF",
            "name": "Breakfast",
            "description": "Continental breakfast buffet",
            "defaultGrossPrice": {"amount": 15.0, "currency": "EUR"},
            "ageCategoryId": "BER-ADULTS"
        });
        let product = adapt(&raw);
        assert_eq!(product.id, "BER-BRKF");
        assert_eq!(product.price, "15.0 EUR");
        assert_eq!(product.age_category, "BER-ADULTS");
    }

    #[test]
    fn test_partial_service_never_fails() {
        let product = adapt(&json!({"id": 7}));
        assert_eq!(product.id, "7");
        assert_eq!(product.name, "");
        assert_eq!(product.price, " ");
        assert_eq!(product.age_category, "");
    }

    #[test]
    fn test_ignores_guestline_field_names() {
        let raw = json!({
            "id": "X",
            "grossPrice": {"amount": 3, "currency": "EUR"},
            "ageCategory": "ADULT"
        });
        let product = adapt(&raw);
        assert_eq!(product.price, " ");
        assert_eq!(product.age_category, "");
    }
}
