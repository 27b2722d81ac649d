//! # Gridlink Core
//!
//! Storage-dialect core for persisting entity state in NoSQL backends.
//!
//! This crate provides:
//! - Structural keys for records, association rows and id generators
//! - [`Tuple`] and [`Association`] change tracking over backend snapshots
//! - The [`GridDialect`] contract plus optional facets (optimistic locking,
//!   stored procedures, batch execution, criteria queries)
//! - Layered storage options and association storage-strategy resolution
//! - Atomic id generation
//! - An in-memory reference dialect and batching/logging delegators
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use gridlink_core::{DialectHandle, EntityKey, MapDialect, Tuple};
//!
//! let handle = DialectHandle::new(Arc::new(MapDialect::new()));
//! assert!(handle.capabilities().optimistic_locking);
//!
//! let key = EntityKey::single("users", "id", 42);
//! let context = handle.tuple_context("users");
//! let mut tuple = Tuple::new();
//! tuple.put("name", "ada");
//! tuple.put_null("nickname");
//! handle.dialect().insert_or_update_tuple(&key, &tuple, &context).unwrap();
//!
//! let stored = handle.dialect().get_tuple(&key, &context).unwrap().unwrap();
//! assert!(stored.get("nickname").unwrap().is_null());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod association;
mod batch;
mod config;
pub mod datastore;
pub mod dialect;
mod error;
mod idgen;
pub mod key;
mod logging;
pub mod options;
mod strategy;
mod tuple;
mod unit_of_work;

pub use association::{
    Association, AssociationOperation, AssociationSnapshot, MapAssociationSnapshot,
};
pub use batch::{BatchingDialect, Operation, OperationsQueue};
pub use config::{Config, DEFAULT_MAX_ID_GENERATION_ATTEMPTS};
pub use datastore::{MapDatastore, MapDialect};
pub use dialect::{
    AssociationContext, BatchableDialect, Capabilities, Criteria, CriteriaDialect, DialectHandle,
    Facet, GridDialect, NativeQuery, OptimisticLockingDialect, Predicate, ProcedureParameters,
    QueryParameters, StoredProcedureDialect, TupleContext, TupleIter, UniqueConstraint,
};
pub use error::{BoxError, DialectError, DialectResult};
pub use idgen::{backoff, next_value_with_cas, CounterStore, NextValueRequest};
pub use key::{
    AssociationKey, AssociationKeyMetadata, AssociationKind, AssociationType, EntityKey,
    EntityKeyMetadata, IdSourceKey, IdSourceKeyMetadata, IdSourceType, RowKey,
};
pub use logging::LoggingDialect;
pub use options::{
    AssociationDocumentStorageType, AssociationStorageType, CacheMappingType, EffectiveOptions,
    MapStorageType, OptionsConfig, OptionsLayer,
};
pub use strategy::{
    resolve_strategy, AssociationStorageStrategy, AssociationTypeContext, BackendProfile,
    RowLayout, StrategyCache,
};
pub use tuple::{MapTupleSnapshot, SnapshotType, Tuple, TupleOperation, TupleSnapshot};
pub use unit_of_work::{ManagedTuple, TupleState};

pub use gridlink_codec::{ScalarType, TypeRegistry, Value};
