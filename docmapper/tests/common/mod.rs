#![allow(dead_code)]

use async_trait::async_trait;
use docmapper::{memory::InMemoryStore, prelude::*};
use docmapper::bson::{Bson, Document};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Wraps an [`InMemoryStore`], counting lookups and recording update bodies.
#[derive(Debug, Clone, Default)]
pub struct SpyBackend {
    pub inner: InMemoryStore,
    pub lookups: Arc<AtomicUsize>,
    pub updates: Arc<Mutex<Vec<Document>>>,
}

impl SpyBackend {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<Document> {
        self.updates.lock().unwrap().clone()
    }

    /// Keys of the `$set` body of every recorded update.
    pub fn updated_paths(&self) -> Vec<Vec<String>> {
        self.updates()
            .iter()
            .map(|update| {
                update
                    .get_document("$set")
                    .unwrap()
                    .keys()
                    .cloned()
                    .collect()
            })
            .collect()
    }
}

#[async_trait]
impl StoreBackend for SpyBackend {
    async fn find_one(&self, collection: &str, criteria: Document) -> DocumentStoreResult<Option<Document>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(collection, criteria).await
    }

    async fn find(&self, collection: &str, criteria: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>> {
        self.inner.find(collection, criteria, options).await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        self.inner.insert_one(collection, document).await
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> DocumentStoreResult<()> {
        self.updates.lock().unwrap().push(update.clone());
        self.inner.update_one(collection, filter, update).await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<()> {
        self.inner.delete_one(collection, filter).await
    }

    async fn distinct(&self, collection: &str, field: &str) -> DocumentStoreResult<Vec<Bson>> {
        self.inner.distinct(collection, field).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.inner.drop_collection(name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.inner.list_collections().await
    }
}
