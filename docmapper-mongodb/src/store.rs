use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions as MongoFindOptions},
};
use docmapper_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{FindOptions, SortDirection},
    schema::PRIMARY_KEY,
};

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

fn backend_error(error: MongoError) -> DocumentStoreError {
    DocumentStoreError::Backend(error.to_string())
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == DUPLICATE_KEY
    )
}

fn find_options(options: &FindOptions) -> MongoFindOptions {
    let mut translated = MongoFindOptions::default();

    if let Some(limit) = options.limit {
        translated.limit = Some(limit as i64);
    }
    if let Some(skip) = options.skip {
        translated.skip = Some(skip as u64);
    }
    if let Some(sort) = &options.sort {
        translated.sort = Some(doc! {
            sort.field.clone(): match sort.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            }
        });
    }

    translated
}

fn ensure_listed(existing: &[String], name: &str) -> DocumentStoreResult<()> {
    if existing.iter().any(|collection| collection == name) {
        Ok(())
    } else {
        Err(DocumentStoreError::CollectionNotFound(name.to_string()))
    }
}

/// MongoDB storage backend. One store maps to one database.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find_one(&self, collection: &str, criteria: Document) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(criteria)
            .await
            .map_err(backend_error)
    }

    async fn find(&self, collection: &str, criteria: Document, options: FindOptions) -> DocumentStoreResult<Vec<Document>> {
        self.get_collection(collection)
            .find(criteria)
            .with_options(find_options(&options))
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        let label = document
            .get(PRIMARY_KEY)
            .map(ToString::to_string)
            .unwrap_or_default();

        let result = self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    DocumentStoreError::DocumentAlreadyExists(label, collection.to_string())
                } else {
                    backend_error(e)
                }
            })?;

        Ok(result.inserted_id)
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> DocumentStoreResult<()> {
        let label = filter.to_string();

        let result = self.get_collection(collection)
            .update_one(filter, update)
            .await
            .map_err(backend_error)?;

        if result.matched_count == 0 {
            return Err(DocumentStoreError::DocumentNotFound(label, collection.to_string()));
        }

        Ok(())
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentStoreResult<()> {
        let label = filter.to_string();

        let result = self.get_collection(collection)
            .delete_one(filter)
            .await
            .map_err(backend_error)?;

        if result.deleted_count == 0 {
            return Err(DocumentStoreError::DocumentNotFound(label, collection.to_string()));
        }

        Ok(())
    }

    async fn distinct(&self, collection: &str, field: &str) -> DocumentStoreResult<Vec<Bson>> {
        self.get_collection(collection)
            .distinct(field, doc! {})
            .await
            .map_err(backend_error)
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        // The server silently ignores dropping a missing namespace.
        let existing = self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)?;
        ensure_listed(&existing, name)?;

        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)?;

        names.sort();

        Ok(names)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        tracing::debug!(database = %self.database, "shutting down MongoDB client");

        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        tracing::debug!(database = %self.database, "connecting to MongoDB");

        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_options_translate_sort_skip_and_limit() {
        let options = FindOptions::builder()
            .sort("createdDate", SortDirection::Desc)
            .skip(5)
            .limit(10)
            .build();

        let translated = find_options(&options);

        assert_eq!(translated.sort, Some(doc! { "createdDate": -1 }));
        assert_eq!(translated.skip, Some(5));
        assert_eq!(translated.limit, Some(10));
    }

    #[test]
    fn dropping_requires_a_listed_collection() {
        let existing = vec!["posts".to_string(), "users".to_string()];

        assert!(ensure_listed(&existing, "users").is_ok());
        assert_eq!(
            ensure_listed(&existing, "comments").unwrap_err(),
            DocumentStoreError::CollectionNotFound("comments".to_string()),
        );
    }

    #[test]
    fn empty_options_translate_to_driver_defaults() {
        let translated = find_options(&FindOptions::new());

        assert!(translated.sort.is_none());
        assert!(translated.skip.is_none());
        assert!(translated.limit.is_none());
    }
}
