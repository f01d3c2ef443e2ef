//! An object-document mapper core for BSON document stores.
//!
//! This crate is the core of the docmapper project and provides:
//!
//! - **Schemas** ([`schema`]) - Declared fields, collection names and primary key strategies
//! - **Values** ([`value`]) - The shapes a document field may hold
//! - **Attribute bags** ([`bag`]) - Schema-constrained, shared, change-tracked documents
//! - **Change tracking** ([`tracker`]) - Dirty fields and propagation to embedding documents
//! - **Codec** ([`codec`]) - Full and partial (dotted-path) BSON encoding and decoding
//! - **Associations** ([`association`]) - Lazy, memoized references to stored documents
//! - **Type registry** ([`registry`]) - Discriminator to schema lookup
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Document store** ([`store`], [`collection`]) - The facade that stores and loads bags
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmapper::prelude::*;
//!
//! struct Address;
//!
//! impl DocumentType for Address {
//!     fn fields() -> &'static [&'static str] {
//!         &["line1", "line2", "state", "city", "zip"]
//!     }
//! }
//!
//! let address = DocumentRef::of::<Address>();
//! address.set("city", "Cambridge")?;
//!
//! // Only the changed fields are written.
//! let diff = address.encode(EncodeMode::Partial);
//! ```
//!
//! Documents are `!Send`: a bag and everything embedded in it belong to one task.

#[allow(unused_extern_crates)]
extern crate self as docmapper_core;

pub mod association;
pub mod backend;
pub mod bag;
pub mod codec;
pub mod collection;
pub mod error;
pub mod query;
pub mod registry;
pub mod schema;
pub mod store;
pub mod tracker;
pub mod value;
