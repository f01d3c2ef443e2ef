//! Per-type document declarations.
//!
//! A [`Schema`] fixes the set of fields a document type may hold, the collection it is
//! stored in and the discriminator written on embedded copies of it. Schemas are usually
//! produced from a [`DocumentType`] implementation, either written by hand or generated
//! with `#[derive(DocumentType)]`.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Wire name of the primary key.
pub const PRIMARY_KEY: &str = "_id";
/// Wire name of the created timestamp.
pub const CREATED_DATE: &str = "createdDate";
/// Wire name of the updated timestamp.
pub const UPDATED_DATE: &str = "updatedDate";
/// Key naming the concrete type of an embedded sub-document.
pub const DISCRIMINATOR: &str = "embeddedClass";

/// Fields every schema declares in addition to its own.
pub const RESERVED_FIELDS: [&str; 3] = [PRIMARY_KEY, CREATED_DATE, UPDATED_DATE];

/// How a primary key is generated when a document is first encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// A 12-byte BSON ObjectId.
    #[default]
    ObjectId,
    /// A random (v4) UUID stored as BSON binary subtype 4.
    Uuid,
}

/// Static declaration of a document type.
///
/// Only [`fields`](DocumentType::fields) is required. The discriminator defaults to the
/// fully-qualified Rust type name and the collection name to the lower-cased short name
/// followed by `s`.
///
/// # Example
///
/// ```ignore
/// use docmapper::schema::DocumentType;
///
/// pub struct Address;
///
/// impl DocumentType for Address {
///     fn fields() -> &'static [&'static str] {
///         &["line1", "line2", "state", "city", "zip"]
///     }
/// }
///
/// assert_eq!(Address::collection_name(), "addresss");
/// ```
pub trait DocumentType: 'static {
    /// Names of the fields this type declares, without the reserved ones.
    fn fields() -> &'static [&'static str];

    /// Discriminator written on embedded copies of this type.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Collection holding top-level documents of this type.
    fn collection_name() -> String {
        default_collection_name(Self::type_name())
    }

    /// Strategy used to generate a missing primary key.
    fn id_strategy() -> IdStrategy {
        IdStrategy::default()
    }

    /// Builds the runtime schema for this type.
    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(Self::type_name(), Self::collection_name(), Self::fields().iter().copied())
                .with_id_strategy(Self::id_strategy()),
        )
    }
}

/// Derives the default collection name from a (possibly path-qualified) type name.
pub fn default_collection_name(type_name: &str) -> String {
    let short = type_name
        .rsplit("::")
        .next()
        .unwrap_or(type_name);

    format!("{}s", short.to_lowercase())
}

/// Runtime description of a document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    type_name: String,
    collection: String,
    fields: IndexSet<String>,
    id_strategy: IdStrategy,
}

impl Schema {
    /// Creates a schema. The reserved fields are appended after the declared ones.
    pub fn new<I, S>(type_name: impl Into<String>, collection: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut declared: IndexSet<String> = fields
            .into_iter()
            .map(Into::into)
            .collect();
        declared.extend(RESERVED_FIELDS.iter().map(|f| f.to_string()));

        Self {
            type_name: type_name.into(),
            collection: collection.into(),
            fields: declared,
            id_strategy: IdStrategy::default(),
        }
    }

    /// Replaces the primary key strategy.
    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id_strategy(&self) -> IdStrategy {
        self.id_strategy
    }

    /// Declared fields in declaration order, reserved fields last.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Whether `field` may be stored on documents of this type.
    pub fn declares(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Address;

    impl DocumentType for Address {
        fn fields() -> &'static [&'static str] {
            &["line1", "city"]
        }
    }

    struct Invoice;

    impl DocumentType for Invoice {
        fn fields() -> &'static [&'static str] {
            &["total"]
        }

        fn collection_name() -> String {
            "billing".to_string()
        }

        fn id_strategy() -> IdStrategy {
            IdStrategy::Uuid
        }
    }

    #[test]
    fn reserved_fields_are_always_declared() {
        let schema = Address::schema();

        assert!(schema.declares("line1"));
        assert!(schema.declares(PRIMARY_KEY));
        assert!(schema.declares(CREATED_DATE));
        assert!(schema.declares(UPDATED_DATE));
        assert!(!schema.declares("zip"));
        assert_eq!(
            schema.fields().collect::<Vec<_>>(),
            vec!["line1", "city", "_id", "createdDate", "updatedDate"],
        );
    }

    #[test]
    fn collection_name_defaults_to_lowercase_plural() {
        assert_eq!(Address::collection_name(), "addresss");
        assert_eq!(default_collection_name("app::models::UserDoc"), "userdocs");
        assert!(Address::type_name().ends_with("::Address"));
    }

    #[test]
    fn overrides_are_carried_into_the_schema() {
        let schema = Invoice::schema();

        assert_eq!(schema.collection(), "billing");
        assert_eq!(schema.id_strategy(), IdStrategy::Uuid);
    }
}
