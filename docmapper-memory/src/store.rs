//! In-memory storage implementation for document stores.
//!
//! This module provides a simple in-memory backend that keeps raw BSON documents in
//! per-collection vectors behind async-safe read-write locks.

use std::{collections::HashMap, sync::Arc, cmp::Ordering};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};

use docmapper_core::{
    query::{FindOptions, SortDirection},
    error::{DocumentStoreError, DocumentStoreResult},
    backend::{StoreBackend, StoreBackendBuilder},
    schema::PRIMARY_KEY,
};

use crate::evaluator::{self, DocumentEvaluator, Comparable};

/// Documents of one collection, in insertion order.
type CollectionDocs = Vec<Document>;
type StoreMap = HashMap<String, CollectionDocs>;


/// Thread-safe in-memory document storage backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Supported Operations
///
/// Criteria are equality matches on (dotted) paths. Updates support the `$set`
/// operator only. Queries scan the whole collection.
///
/// # Example
///
/// ```ignore
/// use docmapper_memory::InMemoryStore;
/// use docmapper::backend::StoreBackend;
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let id = store.insert_one("users", doc! { "name": "Alice", "age": 30 }).await?;
///
///     let found = store.find_one("users", doc! { "_id": id }).await?;
///     assert!(found.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: collection_name -> documents
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use docmapper_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().build().await.unwrap();
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

fn position(documents: &[Document], filter: &Document) -> DocumentStoreResult<Option<usize>> {
    for (index, document) in documents.iter().enumerate() {
        if DocumentEvaluator::new(document).matches(filter)? {
            return Ok(Some(index));
        }
    }

    Ok(None)
}

fn compare(a: &Document, b: &Document, field: &str) -> Ordering {
    let left = evaluator::lookup(a, field)
        .map(Comparable::from)
        .unwrap_or(Comparable::Null);
    let right = evaluator::lookup(b, field)
        .map(Comparable::from)
        .unwrap_or(Comparable::Null);

    left.partial_cmp(&right)
        .unwrap_or(Ordering::Equal)
}

fn apply_update(document: &Document, update: &Document) -> DocumentStoreResult<Document> {
    let mut updated = Bson::Document(document.clone());

    for (operator, argument) in update {
        match (operator.as_str(), argument) {
            ("$set", Bson::Document(fields)) => {
                for (path, value) in fields {
                    evaluator::assign(&mut updated, path, value.clone())?;
                }
            }
            ("$set", _) => {
                return Err(DocumentStoreError::InvalidDocument("$set expects a document".to_string()));
            }
            (operator, _) => {
                return Err(DocumentStoreError::InvalidDocument(format!("unsupported update operator {operator}")));
            }
        }
    }

    match updated {
        Bson::Document(updated) => Ok(updated),
        _ => Err(DocumentStoreError::InvalidDocument("update replaced the document".to_string())),
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find_one(&self, collection: &str, criteria: Document) -> DocumentStoreResult<Option<Document>> {
        let store = self.store.read().await;
        let documents = match store.get(collection) {
            Some(col) => col,
            None => return Ok(None),
        };

        Ok(
            position(documents, &criteria)?
                .map(|index| documents[index].clone())
        )
    }

    async fn find(&self, collection: &str, criteria: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let documents = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut matched = DocumentEvaluator::filter_documents(documents, &criteria)?;

        if let Some(sort) = &options.sort {
            matched.sort_by(|a, b| match sort.direction {
                SortDirection::Asc => compare(a, b, &sort.field),
                SortDirection::Desc => compare(b, a, &sort.field),
            });
        }

        Ok(
            matched
                .into_iter()
                .skip(options.skip.unwrap_or(0))
                .take(options.limit.unwrap_or(usize::MAX))
                .collect()
        )
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> DocumentStoreResult<Bson> {
        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        let id = match document.get(PRIMARY_KEY) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                document.insert(PRIMARY_KEY, id.clone());
                id
            }
        };

        let mut criteria = Document::new();
        criteria.insert(PRIMARY_KEY, id.clone());

        if position(documents, &criteria)?.is_some() {
            return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
        }

        documents.push(document);

        tracing::trace!(collection = %collection, %id, "stored document");

        Ok(id)
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let not_found = || DocumentStoreError::DocumentNotFound(filter.to_string(), collection.to_string());

        let documents = store
            .get_mut(collection)
            .ok_or_else(not_found)?;
        let index = position(documents, &filter)?.ok_or_else(not_found)?;

        let updated = apply_update(&documents[index], &update)?;
        documents[index] = updated;

        Ok(())
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let not_found = || DocumentStoreError::DocumentNotFound(filter.to_string(), collection.to_string());

        let documents = store
            .get_mut(collection)
            .ok_or_else(not_found)?;
        let index = position(documents, &filter)?.ok_or_else(not_found)?;

        documents.remove(index);

        Ok(())
    }

    async fn distinct(&self, collection: &str, field: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let documents = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut values: Vec<Bson> = Vec::new();

        for value in documents
            .iter()
            .filter_map(|document| evaluator::lookup(document, field))
        {
            let candidates = match value {
                Bson::Array(items) => items.iter().collect::<Vec<_>>(),
                single => vec![single],
            };

            for candidate in candidates {
                let seen = values
                    .iter()
                    .any(|existing| Comparable::from(existing) == Comparable::from(candidate));

                if !seen {
                    values.push(candidate.clone());
                }
            }
        }

        Ok(values)
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect();

        names.sort();

        Ok(names)
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docmapper_memory::InMemoryStore;
/// use docmapper::backend::StoreBackendBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder().build().await.unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
