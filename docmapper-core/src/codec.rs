//! Conversion between attribute bags and their BSON wire form.
//!
//! Encoding comes in two modes. [`EncodeMode::Full`] writes every attribute and is
//! used for inserts. [`EncodeMode::Partial`] writes only what changed since the last
//! baseline and is used as the body of a `$set` update. Changes inside an embedded
//! document are flattened into dotted paths (`address.zip`) so that the store updates
//! single leaves instead of replacing the whole sub-document.
//!
//! Embedded documents carry a discriminator (`embeddedClass`) naming their type, which
//! is looked up in the [`TypeRegistry`] on decode.

use bson::{Bson, DateTime, Document};
use indexmap::IndexMap;
use std::sync::Arc;

use crate::{
    association::{ASSOCIATION_MARKER, AssociationRef},
    bag::{AttributeBag, DocumentRef},
    error::{DocumentStoreError, DocumentStoreResult},
    registry::TypeRegistry,
    schema::{DISCRIMINATOR, PRIMARY_KEY, Schema, UPDATED_DATE},
    tracker::DirtyKind,
    value::{DocumentId, Value},
};

/// Which attributes an encode writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncodeMode {
    /// Every attribute.
    #[default]
    Full,
    /// Only changed attributes, keyed by dotted path, plus the updated date.
    Partial,
}

/// Encodes a bag, first assigning its created date and primary key if missing.
///
/// Encoding never fails. Bootstrap assignments are not recorded as changes.
pub fn encode(bag: &mut AttributeBag, mode: EncodeMode) -> Document {
    let bootstrapped = bag.bootstrap();

    let raw = match mode {
        EncodeMode::Full => encode_attributes(bag),
        EncodeMode::Partial => encode_changes(bag, &bootstrapped),
    };

    tracing::trace!(
        type_name = %bag.schema().type_name(),
        ?mode,
        fields = raw.len(),
        "encoded document"
    );

    raw
}

fn encode_attributes(bag: &AttributeBag) -> Document {
    bag.attributes
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

fn encode_changes(bag: &mut AttributeBag, bootstrapped: &[&str]) -> Document {
    let mut diff = Document::new();

    for field in bootstrapped
        .iter()
        .filter(|field| **field != PRIMARY_KEY)
    {
        if let Some(value) = bag.attributes.get(*field) {
            diff.insert(*field, encode_value(value));
        }
    }

    let dirty: Vec<(String, DirtyKind)> = bag
        .tracker
        .dirty()
        .filter(|(field, _)| *field != PRIMARY_KEY)
        .map(|(field, kind)| (field.to_string(), kind))
        .collect();

    for (field, kind) in &dirty {
        let Some(value) = bag.attributes.get(field) else {
            continue;
        };

        match (kind, value) {
            (DirtyKind::Nested, Value::Embedded(child)) => encode_nested(&mut diff, field, child),
            _ => {
                diff.insert(field.clone(), encode_value(value));
            }
        }
    }

    if !dirty.is_empty() {
        let now = DateTime::now();
        bag.stamp(UPDATED_DATE, Value::Timestamp(now));
        diff.insert(UPDATED_DATE, Bson::DateTime(now));
    }

    diff
}

/// Writes the dirty leaves of `child` under `prefix.<field>`.
fn encode_nested(diff: &mut Document, prefix: &str, child: &DocumentRef) {
    let Ok(bag) = child.0.try_borrow() else {
        return;
    };

    // The child's own baseline was reset independently, so its leaves are unknown.
    if !bag.tracker.is_dirty() {
        diff.insert(prefix, encode_value(&Value::Embedded(child.clone())));
        return;
    }

    for (field, kind) in bag.tracker.dirty() {
        let path = format!("{prefix}.{field}");
        let value = bag
            .attributes
            .get(field)
            .unwrap_or(&Value::Null);

        match (kind, value) {
            (DirtyKind::Nested, Value::Embedded(grandchild)) => encode_nested(diff, &path, grandchild),
            _ => {
                diff.insert(path, encode_value(value));
            }
        }
    }
}

/// Encodes a single value into its wire form.
pub fn encode_value(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::String(value) => Bson::String(value.clone()),
        Value::Int32(value) => Bson::Int32(*value),
        Value::Int64(value) => Bson::Int64(*value),
        Value::Double(value) => Bson::Double(*value),
        Value::Bool(value) => Bson::Boolean(*value),
        Value::Id(id) => id.to_bson(),
        Value::Timestamp(value) => Bson::DateTime(*value),
        Value::Embedded(document) => encode_embedded(document),
        Value::Sequence(items) => Bson::Array(items.iter().map(encode_value).collect()),
        Value::Keyed(map) => Bson::Document(
            map.iter()
                .map(|(key, value)| (key.clone(), encode_value(value)))
                .collect(),
        ),
        Value::Association(association) => Bson::Document(encode_association(association)),
        Value::Other(raw) => raw.clone(),
    }
}

fn encode_embedded(document: &DocumentRef) -> Bson {
    let Ok(bag) = document.0.try_borrow() else {
        return Bson::Null;
    };

    let mut raw = Document::new();
    raw.insert(DISCRIMINATOR, bag.schema().type_name());

    for (name, value) in bag.attributes() {
        raw.insert(name, encode_value(value));
    }

    Bson::Document(raw)
}

fn encode_association(association: &AssociationRef) -> Document {
    let mut raw = Document::new();
    raw.insert(DISCRIMINATOR, ASSOCIATION_MARKER);
    raw.insert("className", association.target_type());
    raw.insert("localKey", association.local_field());
    raw.insert("foreignKey", association.foreign_key());
    raw.insert("foreignKeyValue", encode_value(&association.foreign_key_value()));
    raw
}

/// Decodes a stored document into a new, pristine bag of `schema`.
///
/// Undeclared fields in `raw` are ignored.
///
/// # Errors
///
/// Returns [`DocumentStoreError::UnregisteredType`] if an embedded discriminator names a
/// type missing from `registry`.
pub fn decode(raw: &Document, schema: Arc<Schema>, registry: &TypeRegistry) -> DocumentStoreResult<DocumentRef> {
    let document = DocumentRef::new(schema);
    populate(&document, raw, registry)?;
    document.0.borrow_mut().mark_persisted();

    Ok(document)
}

/// Loads `raw` into an existing document and resets its baseline.
pub(crate) fn populate(document: &DocumentRef, raw: &Document, registry: &TypeRegistry) -> DocumentStoreResult<()> {
    let schema = document.schema();

    for (name, raw_value) in raw {
        if !schema.declares(name) {
            tracing::trace!(field = %name, type_name = %schema.type_name(), "skipping undeclared field");
            continue;
        }

        let value = decode_value(raw_value, registry)?;
        document.0.borrow_mut().assign(name, value)?;
    }

    document.clear_changes();

    Ok(())
}

/// Decodes a single wire value.
pub fn decode_value(raw: &Bson, registry: &TypeRegistry) -> DocumentStoreResult<Value> {
    let value = match raw {
        Bson::Null => Value::Null,
        Bson::String(value) => Value::String(value.clone()),
        Bson::Int32(value) => Value::Int32(*value),
        Bson::Int64(value) => Value::Int64(*value),
        Bson::Double(value) => Value::Double(*value),
        Bson::Boolean(value) => Value::Bool(*value),
        Bson::ObjectId(oid) => Value::Id(DocumentId::ObjectId(*oid)),
        Bson::Binary(_) => DocumentId::from_bson(raw)
            .map(Value::Id)
            .unwrap_or_else(|| Value::Other(raw.clone())),
        Bson::DateTime(value) => Value::Timestamp(*value),
        Bson::Array(items) => Value::Sequence(
            items
                .iter()
                .map(|item| decode_value(item, registry))
                .collect::<DocumentStoreResult<_>>()?,
        ),
        Bson::Document(document) => decode_document(document, registry)?,
        other => Value::Other(other.clone()),
    };

    Ok(value)
}

fn decode_document(raw: &Document, registry: &TypeRegistry) -> DocumentStoreResult<Value> {
    match raw.get_str(DISCRIMINATOR) {
        Ok(ASSOCIATION_MARKER) => decode_association(raw, registry),
        Ok(type_name) => {
            let schema = registry
                .resolve(type_name)
                .inspect_err(|_| tracing::error!(type_name = %type_name, "embedded type is not registered"))?;

            let child = DocumentRef::new(schema);
            populate(&child, raw, registry)?;

            Ok(Value::Embedded(child))
        }
        Err(_) => {
            let map = raw
                .iter()
                .map(|(key, value)| Ok((key.clone(), decode_value(value, registry)?)))
                .collect::<DocumentStoreResult<IndexMap<_, _>>>()?;

            Ok(Value::Keyed(map))
        }
    }
}

fn decode_association(raw: &Document, registry: &TypeRegistry) -> DocumentStoreResult<Value> {
    let target_type = raw
        .get_str("className")
        .map_err(|_| DocumentStoreError::InvalidDocument("association without className".to_string()))?;

    let local_field = raw
        .get_str("localKey")
        .ok()
        .map(str::to_string);

    let foreign_key = raw
        .get_str("foreignKey")
        .unwrap_or(PRIMARY_KEY);

    let foreign_key_value = match raw.get("foreignKeyValue") {
        Some(value) => decode_value(value, registry)?,
        None => Value::Null,
    };

    Ok(Value::Association(AssociationRef::from_parts(
        target_type.to_string(),
        local_field,
        foreign_key.to_string(),
        foreign_key_value,
    )))
}
