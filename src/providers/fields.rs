use serde_json::Value;

/// Render a JSON field as text: strings verbatim, other scalars as their JSON
/// text, `null` or absent as `""`.
pub fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// `<amount> <currency>` from a price object such as `{"amount": 15.0, "currency": "EUR"}`.
///
/// A missing amount renders as `default_amount`; a missing currency as `""`.
pub fn price(price: Option<&Value>, default_amount: &str) -> String {
    let amount = price.and_then(|p| p.get("amount")).filter(|v| !v.is_null());
    let currency = price.and_then(|p| p.get("currency"));
    let amount = match amount {
        Some(v) => text(Some(v)),
        None => default_amount.to_string(),
    };
    format!("{} {}", amount, text(currency))
}
