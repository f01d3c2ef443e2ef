//! Main docmapper crate providing a unified interface for mapping documents to BSON stores.
//!
//! This crate is the primary entry point for users of the docmapper framework.
//! It re-exports the core types and functionality from the sub-crates, the
//! `#[derive(DocumentType)]` macro and convenient access to the storage backends.
//!
//! # Features
//!
//! - **Schema-constrained documents** - Attribute bags that only accept declared fields
//! - **Change tracking** - Partial updates written as dotted-path `$set` diffs
//! - **Embedding and associations** - Sub-documents with discriminators, lazy references
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(DocumentType)]
//! #[document(fields = ["line1", "line2", "state", "city", "zip"])]
//! pub struct Address;
//!
//! #[derive(DocumentType)]
//! #[document(fields = ["name", "address"])]
//! pub struct User;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     store.register::<Address>().register::<User>();
//!
//!     let users = store.collection::<User>();
//!
//!     let address = DocumentRef::of::<Address>();
//!     address.set("city", "Cambridge")?;
//!
//!     let user = users.create();
//!     user.set("name", "Alice")?;
//!     user.set("address", address.clone())?;
//!     users.insert(&user).await?;
//!
//!     // Writes `{"$set": {"address.zip": "02139", "updatedDate": ..}}`
//!     address.set("zip", "02139")?;
//!     users.update(&user).await?;
//!
//!     let found = users.find_one(doc! { "name": "Alice" }).await?;
//!     assert_eq!(found, user);
//!
//!     store.shutdown().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docmapper;

pub mod prelude;

pub use docmapper_core::{
    association, backend, bag, codec, collection, error, query, registry, schema, store, tracker,
    value,
};
pub use docmapper_macros::DocumentType;

// Re-export BSON types for convenience
pub use bson;
// `Value::Keyed` holds an `IndexMap`
pub use indexmap;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmapper_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmapper_mongodb::{MongoDbConfig, MongoDbStore, MongoDbStoreBuilder};
}
