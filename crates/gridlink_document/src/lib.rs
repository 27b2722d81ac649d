//! # Gridlink Document
//!
//! A document-store dialect for gridlink over any byte-oriented
//! [`KvStore`](gridlink_storage::KvStore).
//!
//! Entities are stored as CBOR documents. Associations follow the resolved
//! storage strategy: embedded in the owning document, one dedicated document
//! per association, or one record per row in a shared collection. Writes to a
//! single document are compare-and-swap loops, ids come from atomic counters
//! and native queries are small JSON filters (see [`parse_native_query`]).
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use gridlink_core::{DialectHandle, EntityKey, Tuple};
//! use gridlink_document::DocumentDialect;
//! use gridlink_storage::InMemoryKvStore;
//!
//! let handle = DialectHandle::new(Arc::new(DocumentDialect::new(InMemoryKvStore::new())));
//! assert!(handle.capabilities().criteria);
//! assert!(!handle.capabilities().batch);
//!
//! let key = EntityKey::single("users", "id", 1);
//! let context = handle.tuple_context("users");
//! let mut tuple = Tuple::new();
//! tuple.put("name", "ada");
//! handle.dialect().insert_or_update_tuple(&key, &tuple, &context).unwrap();
//!
//! let stored = handle.dialect().get_tuple(&key, &context).unwrap().unwrap();
//! assert_eq!(stored.get("name").and_then(|v| v.as_text()), Some("ada"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dialect;
mod document;
mod embedded;
mod error;
mod keyspace;
mod query;
mod types;

pub use dialect::DocumentDialect;
pub use document::{AssociationDocument, EntityDocument, Revisioned};
pub use error::DocumentError;
pub use keyspace::KeySpace;
pub use query::parse_native_query;
pub use types::document_types;
