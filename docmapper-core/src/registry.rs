//! Discriminator to schema lookup used when decoding embedded documents and resolving
//! associations.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    schema::{DocumentType, Schema},
};

/// Maps type names (as written in the discriminator) to their schemas.
///
/// The registry is filled once at startup and then only read.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    schemas: HashMap<String, Arc<Schema>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its type name.
    pub fn register<T: DocumentType>(&mut self) -> &mut Self {
        self.register_schema(T::schema())
    }

    /// Registers a schema under its type name, replacing any previous entry.
    pub fn register_schema(&mut self, schema: Arc<Schema>) -> &mut Self {
        self.schemas
            .insert(schema.type_name().to_string(), schema);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(type_name)
    }

    /// Like [`get`](Self::get) but fails with [`DocumentStoreError::UnregisteredType`].
    pub fn resolve(&self, type_name: &str) -> DocumentStoreResult<Arc<Schema>> {
        self.schemas
            .get(type_name)
            .cloned()
            .ok_or_else(|| DocumentStoreError::UnregisteredType(type_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag;

    impl DocumentType for Tag {
        fn fields() -> &'static [&'static str] {
            &["label"]
        }

        fn type_name() -> &'static str {
            "app::Tag"
        }
    }

    #[test]
    fn registered_types_resolve_by_name() {
        let mut registry = TypeRegistry::new();
        registry.register::<Tag>();

        let schema = registry.resolve("app::Tag").unwrap();

        assert_eq!(schema.collection(), "tags");
        assert_eq!(
            registry.resolve("app::Missing").unwrap_err(),
            DocumentStoreError::UnregisteredType("app::Missing".to_string()),
        );
    }
}
