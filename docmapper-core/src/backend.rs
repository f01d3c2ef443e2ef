//! Storage backend abstraction for the document store.
//!
//! This module defines the storage collaborator the [`DocumentStore`](crate::store::DocumentStore)
//! delegates all I/O to. Backends deal in raw BSON documents only: they know nothing about
//! schemas, attribute bags or change tracking.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docmapper::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = backend.insert_one("users", doc! { "name": "Alice", "age": 30 }).await?;
//! backend
//!     .update_one("users", doc! { "_id": id }, doc! { "$set": { "age": 31 } })
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::FindOptions};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. The exact concurrency model is implementation-specific but should be
/// documented by the implementer.
///
/// # Criteria
///
/// Criteria documents are equality matches: every key (dotted paths allowed) must equal
/// the given value. A key naming an array field also matches when the array contains
/// the value.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Implementers should document which error variants may be returned by each operation.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns the first document of `collection` matching `criteria`, if any.
    ///
    /// A missing collection yields `Ok(None)`.
    async fn find_one(&self, collection: &str, criteria: Document) -> DocumentStoreResult<Option<Document>>;

    /// Returns every document of `collection` matching `criteria`, shaped by `options`.
    ///
    /// A missing collection yields an empty result.
    async fn find(
        &self,
        collection: &str,
        criteria: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Inserts a document and returns its primary key.
    ///
    /// The collection is created on first insert. A document without `_id` is given one.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists)
    /// if the primary key is taken.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson>;

    /// Applies `update` to the first document matching `filter`.
    ///
    /// `update` is an operator document. Every backend supports `$set` with dotted paths.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) if
    /// nothing matches.
    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> DocumentStoreResult<()>;

    /// Deletes the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) if
    /// nothing matches.
    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<()>;

    /// Returns the distinct values of `field` across `collection`, in first-seen order.
    ///
    /// Array values contribute their elements.
    async fn distinct(&self, collection: &str, field: &str) -> DocumentStoreResult<Vec<Bson>>;

    /// Drops (deletes) a collection and all its documents.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionNotFound`](crate::error::DocumentStoreError::CollectionNotFound)
    /// if the collection does not exist.
    ///
    /// # Warning
    ///
    /// This operation is irreversible.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with persistent storage or
    /// external connections should override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe mirror of [`StoreBackend`], implemented for every backend.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn find_one(&self, collection: &str, criteria: Document) -> DocumentStoreResult<Option<Document>>;
    async fn find(
        &self,
        collection: &str,
        criteria: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>>;
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson>;
    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> DocumentStoreResult<()>;
    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<()>;
    async fn distinct(&self, collection: &str, field: &str) -> DocumentStoreResult<Vec<Bson>>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + Send + Sync + 'static> DynStoreBackend for B {
    async fn find_one(&self, collection: &str, criteria: Document) -> DocumentStoreResult<Option<Document>> {
        StoreBackend::find_one(self, collection, criteria).await
    }

    async fn find(
        &self,
        collection: &str,
        criteria: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        StoreBackend::find(self, collection, criteria, options).await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        StoreBackend::insert_one(self, collection, document).await
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> DocumentStoreResult<()> {
        StoreBackend::update_one(self, collection, filter, update).await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<()> {
        StoreBackend::delete_one(self, collection, filter).await
    }

    async fn distinct(&self, collection: &str, field: &str) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::distinct(self, collection, field).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
