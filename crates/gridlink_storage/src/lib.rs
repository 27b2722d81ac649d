//! # Gridlink Storage
//!
//! Key-value client abstraction used by byte-oriented gridlink dialects.
//!
//! A [`KvStore`] is the injected backend client a dialect is constructed
//! with. Stores are **opaque byte maps**: they know nothing about tuples,
//! documents or keys beyond raw bytes, and they only guarantee atomicity for
//! single-key operations.
//!
//! ## Design Principles
//!
//! - Every method takes `&self`; the store owns its synchronization
//! - Must be `Send + Sync` so one client can serve many threads
//! - `put_if_absent` and `compare_and_swap` are the atomic primitives that
//!   id generation and optimistic locking are built on
//!
//! ## Example
//!
//! ```rust
//! use gridlink_storage::{InMemoryKvStore, KvStore};
//!
//! let store = InMemoryKvStore::new();
//! assert!(store.put_if_absent(b"seq", b"1".to_vec()).unwrap());
//! assert!(!store.put_if_absent(b"seq", b"2".to_vec()).unwrap());
//! assert!(store.compare_and_swap(b"seq", Some(b"1"), Some(b"2".to_vec())).unwrap());
//! assert_eq!(store.get(b"seq").unwrap(), Some(b"2".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod kv;
mod memory;

pub use error::{StorageError, StorageResult};
pub use kv::KvStore;
pub use memory::InMemoryKvStore;
