//! Error types and result types for document mapping and store operations.
//!
//! Every failure in the crate is surfaced as a [`DocumentStoreError`]. Use
//! [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when mapping documents or
/// interacting with a storage collaborator.
///
/// The first group of variants is raised by the attribute bag, codec and
/// association core. The second group comes from the store facade and the
/// storage backends.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// A field outside the declared schema was assigned.
    /// The first argument is the field, the second the document type.
    #[error("Field {0} is not declared on {1}")]
    UnknownField(String, String),
    /// A write-once field (primary key, created date) would be overwritten.
    #[error("Field {0} is immutable once assigned")]
    ImmutableField(String),
    /// Assigning the value would make a document embed itself.
    #[error("Field {0} would create a cyclic embedding")]
    CyclicEmbedding(String),
    /// The value holds a document or association that is borrowed elsewhere.
    #[error("Field {0} holds a document that is currently in use")]
    DocumentInUse(String),
    /// The document has been deleted and no longer accepts operations.
    #[error("Document of type {0} has been deleted")]
    DocumentDeleted(String),
    /// An operation needed a primary key that was never assigned.
    #[error("Document of type {0} has no primary key")]
    MissingPrimaryKey(String),
    /// A field was resolved as an association but holds another kind of value.
    #[error("Field {0} does not hold an association")]
    NotAReference(String),
    /// A discriminator names a type that was never registered.
    #[error("Type {0} is not registered")]
    UnregisteredType(String),
    /// A single-document lookup matched nothing.
    #[error("No document matching {0} in collection {1}")]
    NotFound(String, String),
    /// A store operation ran before a storage backend was wired.
    #[error("Storage backend is not configured")]
    StorageNotConfigured,
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The targeted document was not found in the collection.
    /// The first argument is the filter, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document has an invalid structure for the requested operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
