//! Main document store interface.
//!
//! A [`DocumentStore`] owns the storage backend and the [`TypeRegistry`]. Per-type
//! operations go through the [`Collection`] handles it hands out.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::store::DocumentStore;
//!
//! let store = DocumentStore::builder()
//!     .backend(backend)
//!     .register::<Address>()
//!     .build();
//!
//! let users = store.collection::<User>();
//! ```

use std::sync::Arc;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
    registry::TypeRegistry,
    schema::{DocumentType, Schema},
};

/// Entry point for storing and loading documents.
///
/// A store built without a backend is usable for registry lookups only. Every storage
/// operation on it fails with [`DocumentStoreError::StorageNotConfigured`].
#[derive(Debug, Default)]
pub struct DocumentStore {
    backend: Option<Box<dyn DynStoreBackend>>,
    registry: TypeRegistry,
}

impl DocumentStore {
    /// Creates a new document store with the given backend and an empty registry.
    pub fn new<B: StoreBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Some(Box::new(backend)),
            registry: TypeRegistry::new(),
        }
    }

    pub fn builder() -> DocumentStoreBuilder {
        DocumentStoreBuilder::default()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Registers `T` so that embedded copies and associations of it can be decoded.
    pub fn register<T: DocumentType>(&mut self) -> &mut Self {
        self.registry.register::<T>();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub(crate) fn backend(&self) -> DocumentStoreResult<&dyn DynStoreBackend> {
        self.backend
            .as_deref()
            .ok_or(DocumentStoreError::StorageNotConfigured)
    }

    /// Gets the collection of documents of type `T`.
    pub fn collection<T: DocumentType>(&self) -> Collection<'_> {
        Collection::new(T::schema(), self)
    }

    /// Gets the collection for a runtime schema.
    pub fn collection_for(&self, schema: Arc<Schema>) -> Collection<'_> {
        Collection::new(schema, self)
    }

    /// Drops (deletes) a collection with the given name.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        tracing::debug!(collection = %name, "dropping collection");

        self.backend()?
            .drop_collection(name)
            .await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend()?
            .list_collections()
            .await
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// This consumes the store. A store without a backend shuts down trivially.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        match self.backend {
            Some(backend) => backend.shutdown_boxed().await,
            None => Ok(()),
        }
    }
}

/// Builder for [`DocumentStore`].
#[derive(Debug, Default)]
pub struct DocumentStoreBuilder {
    backend: Option<Box<dyn DynStoreBackend>>,
    registry: TypeRegistry,
}

impl DocumentStoreBuilder {
    /// Wires the storage backend.
    pub fn backend<B: StoreBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Registers a document type.
    pub fn register<T: DocumentType>(mut self) -> Self {
        self.registry.register::<T>();
        self
    }

    /// Registers a runtime schema.
    pub fn register_schema(mut self, schema: Arc<Schema>) -> Self {
        self.registry.register_schema(schema);
        self
    }

    pub fn build(self) -> DocumentStore {
        DocumentStore {
            backend: self.backend,
            registry: self.registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note;

    impl DocumentType for Note {
        fn fields() -> &'static [&'static str] {
            &["body"]
        }
    }

    #[test]
    fn builder_without_backend_is_unconfigured() {
        let store = DocumentStore::builder()
            .register::<Note>()
            .build();

        assert!(!store.is_configured());
        assert!(store.registry().get(Note::type_name()).is_some());
        assert_eq!(store.backend().unwrap_err(), DocumentStoreError::StorageNotConfigured);
        assert_eq!(store.collection::<Note>().name(), "notes");
    }
}
