//! Per-type collection handles.
//!
//! A [`Collection`] binds a [`Schema`] to its backing collection and translates between
//! attribute bags and the raw documents the backend stores.
//!
//! # Example
//!
//! ```ignore
//! let users = store.collection::<User>();
//!
//! let user = users.create();
//! user.set("name", "Alice")?;
//! let id = users.insert(&user).await?;
//!
//! user.set("name", "Alicia")?;
//! users.update(&user).await?; // sends {"$set": {"name": "Alicia", "updatedDate": ...}}
//!
//! let found = users.find_one(doc! { "_id": codec::encode_value(&id) }).await?;
//! ```

use bson::{Document, doc};
use std::sync::Arc;

use crate::{
    bag::DocumentRef,
    codec::{self, EncodeMode},
    error::{DocumentStoreError, DocumentStoreResult},
    query::FindOptions,
    schema::{PRIMARY_KEY, Schema},
    store::DocumentStore,
    value::Value,
};

/// A collection of documents of one type.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the store reference
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    schema: Arc<Schema>,
    store: &'a DocumentStore,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(schema: Arc<Schema>, store: &'a DocumentStore) -> Self {
        Self { schema, store }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.schema.collection()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Creates a fresh, unstored document of this collection's type.
    pub fn create(&self) -> DocumentRef {
        DocumentRef::new(self.schema.clone())
    }

    /// Finds every document matching `criteria`.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`] if the backend fails or a stored document cannot
    /// be decoded.
    pub async fn find(&self, criteria: Document, options: FindOptions) -> DocumentStoreResult<Vec<DocumentRef>> {
        let backend = self.store.backend()?;

        tracing::debug!(collection = %self.name(), %criteria, "find");

        let raws = backend
            .find(self.name(), criteria, options)
            .await?;

        raws.iter()
            .map(|raw| self.decode(raw))
            .collect()
    }

    /// Finds the first document matching `criteria`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NotFound`] if nothing matches.
    pub async fn find_one(&self, criteria: Document) -> DocumentStoreResult<DocumentRef> {
        let backend = self.store.backend()?;

        tracing::debug!(collection = %self.name(), %criteria, "find one");

        let label = criteria.to_string();
        let raw = backend
            .find_one(self.name(), criteria)
            .await?
            .ok_or_else(|| DocumentStoreError::NotFound(label, self.name().to_string()))?;

        self.decode(&raw)
    }

    /// Stores a new document and returns its primary key.
    ///
    /// The document is fully encoded (assigning its primary key and created date if
    /// missing). On success its change baseline is reset.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::InvalidDocument`] if the document is of another type
    /// - [`DocumentStoreError::DocumentAlreadyExists`] if the primary key is taken
    pub async fn insert(&self, document: &DocumentRef) -> DocumentStoreResult<Value> {
        let backend = self.store.backend()?;
        self.ensure_member(document)?;

        let raw = document.encode(EncodeMode::Full);
        let id = backend
            .insert_one(self.name(), raw)
            .await?;

        tracing::debug!(collection = %self.name(), %id, "inserted document");

        document.0.borrow_mut().mark_persisted();
        document.clear_changes();

        codec::decode_value(&id, self.store.registry())
    }

    /// Writes the changes made since the last baseline as a `$set` update.
    ///
    /// An unchanged document is not sent to the backend. On success the baseline is reset,
    /// so a later update only carries newer changes.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::MissingPrimaryKey`] if the document was never stored
    /// - [`DocumentStoreError::DocumentNotFound`] if no stored document has its primary key
    pub async fn update(&self, document: &DocumentRef) -> DocumentStoreResult<()> {
        let backend = self.store.backend()?;
        self.ensure_member(document)?;
        let filter = self.primary_key_filter(document)?;

        let diff = document.encode(EncodeMode::Partial);
        if diff.is_empty() {
            tracing::debug!(collection = %self.name(), %filter, "document unchanged, skipping update");
            return Ok(());
        }

        tracing::debug!(collection = %self.name(), %filter, fields = diff.len(), "updating document");

        backend
            .update_one(self.name(), filter, doc! { "$set": diff })
            .await?;

        document.clear_changes();

        Ok(())
    }

    /// Deletes the stored copy of `document`. The instance rejects further use.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::MissingPrimaryKey`] if the document was never stored
    /// - [`DocumentStoreError::DocumentNotFound`] if no stored document has its primary key
    pub async fn delete(&self, document: &DocumentRef) -> DocumentStoreResult<()> {
        let backend = self.store.backend()?;
        self.ensure_member(document)?;
        let filter = self.primary_key_filter(document)?;

        tracing::debug!(collection = %self.name(), %filter, "deleting document");

        backend
            .delete_one(self.name(), filter)
            .await?;

        document.0.borrow_mut().mark_deleted();

        Ok(())
    }

    /// Returns the distinct values stored under `field`.
    pub async fn distinct(&self, field: &str) -> DocumentStoreResult<Vec<Value>> {
        let backend = self.store.backend()?;

        backend
            .distinct(self.name(), field)
            .await?
            .iter()
            .map(|value| codec::decode_value(value, self.store.registry()))
            .collect()
    }

    fn decode(&self, raw: &Document) -> DocumentStoreResult<DocumentRef> {
        codec::decode(raw, self.schema.clone(), self.store.registry())
    }

    fn ensure_member(&self, document: &DocumentRef) -> DocumentStoreResult<()> {
        document.inspect(|bag| {
            bag.ensure_live()?;

            if bag.schema().type_name() != self.schema.type_name() {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "{} does not belong in collection {}",
                    bag.schema().type_name(),
                    self.name(),
                )));
            }

            Ok(())
        })
    }

    fn primary_key_filter(&self, document: &DocumentRef) -> DocumentStoreResult<Document> {
        let primary_key = document
            .primary_key()
            .ok_or_else(|| DocumentStoreError::MissingPrimaryKey(document.type_name()))?;

        let mut filter = Document::new();
        filter.insert(PRIMARY_KEY, codec::encode_value(&primary_key));

        Ok(filter)
    }
}
