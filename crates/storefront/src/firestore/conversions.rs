//! Conversions from Firestore documents to order records.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use modern_shop_core::{OrderId, OrderRecord, StoreTimestamp};

use super::types::{Document, Value};
use crate::orders::StoreError;

/// Field names as written by the checkout webhook.
pub mod fields {
    pub const AMOUNT: &str = "amount";
    pub const AMOUNT_SHIPPING: &str = "amount_shipping";
    pub const IMAGES: &str = "images";
    pub const TIMESTAMP: &str = "timestamp";
}

/// Convert an order document into an [`OrderRecord`].
///
/// `amount` and `images` must match the schema or the whole document is
/// rejected. The timestamp is carried through as read, including when it is
/// missing or of the wrong type, so that fault stays with this one order.
///
/// # Errors
///
/// Returns [`StoreError::InvalidDocument`] on a schema mismatch.
pub fn convert_order_document(document: Document) -> Result<OrderRecord, StoreError> {
    let invalid = |reason: String| StoreError::InvalidDocument {
        document: document.name.clone(),
        reason,
    };

    let id = document.id();
    if id.is_empty() {
        return Err(invalid("document name has no id".to_string()));
    }

    let amount = match document.fields.get(fields::AMOUNT) {
        Some(value) => number(value)
            .ok_or_else(|| invalid(format!("amount: expected a number, got {}", value.kind())))?,
        None => return Err(invalid("amount: missing".to_string())),
    };

    let amount_shipping = match document.fields.get(fields::AMOUNT_SHIPPING) {
        None | Some(Value::NullValue(())) => None,
        Some(value) => Some(number(value).ok_or_else(|| {
            invalid(format!(
                "amount_shipping: expected a number, got {}",
                value.kind()
            ))
        })?),
    };

    let images = match document.fields.get(fields::IMAGES) {
        None | Some(Value::NullValue(())) => Vec::new(),
        Some(Value::ArrayValue(array)) => array
            .values
            .iter()
            .map(|value| match value {
                Value::StringValue(s) => Ok(s.clone()),
                other => Err(invalid(format!(
                    "images: expected strings, got {}",
                    other.kind()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(invalid(format!(
                "images: expected an array, got {}",
                other.kind()
            )));
        }
    };

    let timestamp = convert_timestamp(document.fields.get(fields::TIMESTAMP));

    Ok(OrderRecord {
        id: OrderId::new(id),
        amount,
        amount_shipping,
        images,
        timestamp,
    })
}

/// Read a timestamp field in any of the shapes it is stored in.
///
/// Besides native timestamps, documents imported from JSON exports carry a
/// `{seconds, nanoseconds}` map (or `{_seconds, _nanoseconds}`).
#[must_use]
pub fn convert_timestamp(value: Option<&Value>) -> StoreTimestamp {
    match value {
        None | Some(Value::NullValue(())) => StoreTimestamp::Missing,
        Some(Value::TimestampValue(text)) => StoreTimestamp::Rfc3339(text.clone()),
        Some(Value::MapValue(map)) => timestamp_parts(&map.fields)
            .unwrap_or_else(|| StoreTimestamp::Unsupported("mapValue".to_string())),
        Some(other) => StoreTimestamp::Unsupported(other.kind().to_string()),
    }
}

fn timestamp_parts(fields: &BTreeMap<String, Value>) -> Option<StoreTimestamp> {
    let integer = |keys: [&str; 2]| {
        keys.iter().find_map(|key| match fields.get(*key) {
            Some(Value::IntegerValue(s)) => s.parse::<i64>().ok(),
            _ => None,
        })
    };

    let seconds = integer(["seconds", "_seconds"])?;
    let nanos = integer(["nanoseconds", "_nanoseconds"]).unwrap_or(0);

    Some(StoreTimestamp::Parts {
        seconds,
        nanos: i32::try_from(nanos).ok()?,
    })
}

/// Read an integer or double value as a decimal.
fn number(value: &Value) -> Option<Decimal> {
    match value {
        Value::IntegerValue(s) => s.parse::<i64>().ok().map(Decimal::from),
        Value::DoubleValue(v) => v.as_f64().and_then(Decimal::from_f64),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document(fields: serde_json::Value) -> Document {
        serde_json::from_value(json!({
            "name": "projects/shop/databases/(default)/documents/users/a@b.com/orders/cs_test_1",
            "fields": fields,
            "createTime": "2023-01-01T00:00:01Z",
            "updateTime": "2023-01-01T00:00:01Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_full_document() {
        let record = convert_order_document(document(json!({
            "amount": { "doubleValue": 49.99 },
            "amount_shipping": { "integerValue": "5" },
            "images": { "arrayValue": { "values": [
                { "stringValue": "https://cdn.example.com/1.png" },
                { "stringValue": "https://cdn.example.com/2.png" }
            ] } },
            "timestamp": { "timestampValue": "2023-01-01T00:00:00Z" }
        })))
        .unwrap();

        assert_eq!(record.id.as_str(), "cs_test_1");
        assert_eq!(record.amount, Decimal::new(4999, 2));
        assert_eq!(record.amount_shipping, Some(Decimal::from(5)));
        assert_eq!(record.images.len(), 2);
        assert_eq!(record.timestamp.to_epoch_seconds(), Ok(1_672_531_200));
    }

    #[test]
    fn test_optional_fields_absent() {
        let record = convert_order_document(document(json!({
            "amount": { "integerValue": "120" },
            "amount_shipping": { "nullValue": null }
        })))
        .unwrap();

        assert_eq!(record.amount, Decimal::from(120));
        assert_eq!(record.amount_shipping, None);
        assert!(record.images.is_empty());
        assert_eq!(record.timestamp, StoreTimestamp::Missing);
    }

    #[test]
    fn test_missing_amount_is_invalid() {
        let err = convert_order_document(document(json!({
            "images": { "arrayValue": {} }
        })))
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument { ref reason, .. } if reason.contains("amount")));
    }

    #[test]
    fn test_string_amount_is_invalid() {
        let err = convert_order_document(document(json!({
            "amount": { "stringValue": "49.99" }
        })))
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument { .. }));
    }

    #[test]
    fn test_non_string_image_is_invalid() {
        let err = convert_order_document(document(json!({
            "amount": { "integerValue": "1" },
            "images": { "arrayValue": { "values": [{ "integerValue": "7" }] } }
        })))
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument { ref reason, .. } if reason.contains("images")));
    }

    #[test]
    fn test_wrong_timestamp_type_is_kept_for_the_order() {
        let record = convert_order_document(document(json!({
            "amount": { "integerValue": "1" },
            "timestamp": { "stringValue": "last tuesday" }
        })))
        .unwrap();
        assert_eq!(
            record.timestamp,
            StoreTimestamp::Unsupported("stringValue".to_string())
        );
    }

    #[test]
    fn test_exported_timestamp_map() {
        let ts = convert_timestamp(Some(&Value::MapValue(super::super::types::MapValue {
            fields: [
                ("_seconds".to_string(), Value::IntegerValue("1672531200".to_string())),
                ("_nanoseconds".to_string(), Value::IntegerValue("5000".to_string())),
            ]
            .into_iter()
            .collect(),
        })));
        assert_eq!(
            ts,
            StoreTimestamp::Parts {
                seconds: 1_672_531_200,
                nanos: 5000
            }
        );
    }
}
