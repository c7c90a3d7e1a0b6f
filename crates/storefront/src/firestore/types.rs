//! Firestore REST wire types.
//!
//! Only the subset needed to run a structured query and read its documents.
//! See <https://firebase.google.com/docs/firestore/reference/rest/v1/Value>.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Query request
// =============================================================================

/// Body of a `documents:runQuery` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

/// A structured query over one collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<QueryOrder>,
}

/// Collection the query reads from, relative to the parent document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

/// Sort clause.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOrder {
    pub field: FieldReference,
    pub direction: Direction,
}

/// Reference to a document field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Ascending,
    Descending,
}

impl RunQueryRequest {
    /// Query a sub-collection sorted by one field, newest first.
    #[must_use]
    pub fn newest_first(collection_id: &str, field_path: &str) -> Self {
        Self {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: collection_id.to_string(),
                }],
                order_by: vec![QueryOrder {
                    field: FieldReference {
                        field_path: field_path.to_string(),
                    },
                    direction: Direction::Descending,
                }],
            },
        }
    }
}

// =============================================================================
// Query response
// =============================================================================

/// One element of the streamed `runQuery` response array.
///
/// Elements without a document only carry progress information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponseItem {
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub read_time: Option<String>,
}

/// A stored document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name, ending in the document id.
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl Document {
    /// The document id (last segment of the resource name).
    #[must_use]
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

/// A typed field value. Exactly one variant is present on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// 64-bit integer, encoded as a decimal string.
    IntegerValue(String),
    /// A number, or one of the strings `"NaN"`, `"Infinity"`, `"-Infinity"`.
    DoubleValue(serde_json::Value),
    /// RFC 3339 text, UTC, up to nanosecond precision.
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

impl Value {
    /// Wire name of the value's type, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NullValue(()) => "nullValue",
            Self::BooleanValue(_) => "booleanValue",
            Self::IntegerValue(_) => "integerValue",
            Self::DoubleValue(_) => "doubleValue",
            Self::TimestampValue(_) => "timestampValue",
            Self::StringValue(_) => "stringValue",
            Self::BytesValue(_) => "bytesValue",
            Self::ReferenceValue(_) => "referenceValue",
            Self::GeoPointValue(_) => "geoPointValue",
            Self::ArrayValue(_) => "arrayValue",
            Self::MapValue(_) => "mapValue",
        }
    }
}

/// An array value. An empty array omits `values`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

/// A map value. An empty map omits `fields`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorStatus,
}

/// Google API error status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorStatus {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_serializes_descending_order() {
        let body = serde_json::to_value(RunQueryRequest::newest_first("orders", "timestamp")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "structuredQuery": {
                    "from": [{ "collectionId": "orders" }],
                    "orderBy": [{
                        "field": { "fieldPath": "timestamp" },
                        "direction": "DESCENDING"
                    }]
                }
            })
        );
    }

    #[test]
    fn test_value_variants_deserialize() {
        let v: Value = serde_json::from_value(serde_json::json!({ "nullValue": null })).unwrap();
        assert_eq!(v, Value::NullValue(()));

        let v: Value = serde_json::from_value(serde_json::json!({ "integerValue": "42" })).unwrap();
        assert_eq!(v, Value::IntegerValue("42".to_string()));

        let v: Value = serde_json::from_value(serde_json::json!({ "arrayValue": {} })).unwrap();
        assert_eq!(v, Value::ArrayValue(ArrayValue::default()));
    }

    #[test]
    fn test_document_id_is_last_segment() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "name": "projects/p/databases/(default)/documents/users/a@b.com/orders/cs_test_1"
        }))
        .unwrap();
        assert_eq!(doc.id(), "cs_test_1");
        assert!(doc.fields.is_empty());
    }
}
