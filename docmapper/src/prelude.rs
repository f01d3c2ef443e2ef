//! Convenient re-exports of commonly used types from docmapper.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmapper::prelude::*;
//! ```
//!
//! `DynStoreBackend` is left out on purpose: with both backend traits in scope, calls on a
//! concrete backend are ambiguous. Import it from [`backend`](crate::backend) when needed.

pub use docmapper_core::{
    association::AssociationRef,
    backend::{StoreBackend, StoreBackendBuilder},
    bag::{AttributeBag, DocumentRef},
    codec::EncodeMode,
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{FindOptions, Sort, SortDirection},
    registry::TypeRegistry,
    schema::{DocumentType, IdStrategy, Schema},
    store::{DocumentStore, DocumentStoreBuilder},
    value::{DocumentId, Value},
};
pub use docmapper_macros::DocumentType;

pub use bson::doc;
