//! The value model: every shape a document field may hold.

use bson::{Bson, DateTime, oid::ObjectId};
use chrono::SecondsFormat;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value as JsonValue};
use std::fmt;

use crate::{association::AssociationRef, bag::DocumentRef, schema::IdStrategy};

/// A globally unique document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentId {
    ObjectId(ObjectId),
    Uuid(bson::Uuid),
}

impl DocumentId {
    /// Generates a fresh identifier with the given strategy.
    pub fn generate(strategy: IdStrategy) -> Self {
        match strategy {
            IdStrategy::ObjectId => DocumentId::ObjectId(ObjectId::new()),
            IdStrategy::Uuid => DocumentId::Uuid(bson::Uuid::from(uuid::Uuid::new_v4())),
        }
    }

    /// Reads an identifier back from its wire form.
    pub fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::ObjectId(oid) => Some(DocumentId::ObjectId(*oid)),
            Bson::Binary(binary) => binary.to_uuid().ok().map(DocumentId::Uuid),
            _ => None,
        }
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            DocumentId::ObjectId(oid) => Bson::ObjectId(*oid),
            DocumentId::Uuid(uuid) => Bson::from(*uuid),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
            DocumentId::Uuid(uuid) => write!(f, "{}", uuid),
        }
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        DocumentId::ObjectId(oid)
    }
}

impl From<bson::Uuid> for DocumentId {
    fn from(uuid: bson::Uuid) -> Self {
        DocumentId::Uuid(uuid)
    }
}

/// A value held by a document field.
///
/// Numbers keep their wire width so that a decoded document encodes back to the same
/// bytes. Wire values without a dedicated variant are carried untouched in
/// [`Value::Other`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Bool(bool),
    Id(DocumentId),
    /// Milliseconds since the Unix epoch.
    Timestamp(DateTime),
    Embedded(DocumentRef),
    Sequence(Vec<Value>),
    Keyed(IndexMap<String, Value>),
    Association(AssociationRef),
    Other(Bson),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(value) => Some(*value as i64),
            Value::Int64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(value) => Some(*value as f64),
            Value::Int64(value) => Some(*value as f64),
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<DocumentId> {
        match self {
            Value::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime> {
        match self {
            Value::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentRef> {
        match self {
            Value::Embedded(document) => Some(document),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_keyed(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Keyed(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_association(&self) -> Option<&AssociationRef> {
        match self {
            Value::Association(association) => Some(association),
            _ => None,
        }
    }

    /// Renders the value for display.
    ///
    /// Identifiers become strings, timestamps RFC 3339 strings and embedded documents
    /// plain objects without their discriminator.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::String(value) => JsonValue::String(value.clone()),
            Value::Int32(value) => JsonValue::from(*value),
            Value::Int64(value) => JsonValue::from(*value),
            Value::Double(value) => Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Bool(value) => JsonValue::Bool(*value),
            Value::Id(id) => JsonValue::String(id.to_string()),
            Value::Timestamp(value) => JsonValue::String(value.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Embedded(document) => document.to_json(),
            Value::Sequence(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Keyed(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Value::Association(association) => association.to_json(),
            Value::Other(bson) => JsonValue::String(bson.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::Id(id)
    }
}

impl From<ObjectId> for Value {
    fn from(oid: ObjectId) -> Self {
        Value::Id(DocumentId::ObjectId(oid))
    }
}

impl From<DateTime> for Value {
    fn from(value: DateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl From<DocumentRef> for Value {
    fn from(document: DocumentRef) -> Self {
        Value::Embedded(document)
    }
}

impl From<&DocumentRef> for Value {
    fn from(document: &DocumentRef) -> Self {
        Value::Embedded(document.clone())
    }
}

impl From<AssociationRef> for Value {
    fn from(association: AssociationRef) -> Self {
        Value::Association(association)
    }
}

impl From<&AssociationRef> for Value {
    fn from(association: &AssociationRef) -> Self {
        Value::Association(association.clone())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Keyed(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uuid_ids_survive_the_wire_form() {
        let id = DocumentId::generate(IdStrategy::Uuid);

        assert_eq!(DocumentId::from_bson(&id.to_bson()), Some(id));
    }

    #[test]
    fn object_ids_render_as_hex() {
        let oid = ObjectId::new();

        assert_eq!(Value::from(oid).to_json(), json!(oid.to_hex()));
    }

    #[test]
    fn containers_render_recursively() {
        let value = Value::from(vec![
            Value::from(vec![1, 2]),
            Value::Keyed(IndexMap::from([("a".to_string(), Value::from("b"))])),
        ]);

        assert_eq!(value.to_json(), json!([[1, 2], {"a": "b"}]));
    }

    #[test]
    fn timestamps_render_as_rfc3339() {
        let value = Value::Timestamp(DateTime::from_millis(0));

        assert_eq!(value.to_json(), json!("1970-01-01T00:00:00.000Z"));
    }
}
