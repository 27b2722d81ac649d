//! The storage dialect contract.
//!
//! A dialect translates key/tuple operations into native calls of one
//! backend. Only single-key operations are atomic; nothing here spans keys.
//! Dialects are stateless per call and must be safe to share across threads;
//! the backend client they are constructed with owns synchronization.

mod context;
mod facets;
mod handle;
mod query;

pub use context::{AssociationContext, TupleContext};
pub use facets::{
    BatchableDialect, CriteriaDialect, Facet, OptimisticLockingDialect, ProcedureParameters,
    StoredProcedureDialect,
};
pub use handle::{Capabilities, DialectHandle};
pub use query::{Criteria, NativeQuery, Predicate, QueryParameters, TupleIter};

use crate::association::Association;
use crate::error::DialectResult;
use crate::idgen::NextValueRequest;
use crate::key::{AssociationKey, AssociationKeyMetadata, EntityKey, EntityKeyMetadata};
use crate::strategy::{AssociationTypeContext, BackendProfile};
use crate::tuple::Tuple;
use gridlink_codec::TypeRegistry;

/// A uniqueness requirement over one or more columns of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    /// Constraint name.
    pub name: String,
    /// Table the constraint applies to.
    pub table: String,
    /// Constrained columns, in declaration order.
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    /// Creates a constraint.
    #[must_use]
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Operations every backend implements.
pub trait GridDialect: Send + Sync {
    /// Describes what the backend can do with association rows.
    fn profile(&self) -> BackendProfile;

    /// Scalar codecs replacing the standard ones for this backend.
    fn type_overrides(&self) -> TypeRegistry {
        TypeRegistry::empty()
    }

    /// Reads one record.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the backend call fails.
    fn get_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<Option<Tuple>>;

    /// Reads several records; the result is parallel to `keys`.
    ///
    /// # Errors
    ///
    /// Returns the first failing read's error.
    fn get_tuples(
        &self,
        keys: &[EntityKey],
        context: &TupleContext,
    ) -> DialectResult<Vec<Option<Tuple>>> {
        keys.iter().map(|key| self.get_tuple(key, context)).collect()
    }

    /// Creates a transient tuple for a new record without touching storage.
    ///
    /// # Errors
    ///
    /// Dialects that need a round-trip may fail with an operation error.
    fn create_tuple(&self, _key: &EntityKey, _context: &TupleContext) -> DialectResult<Tuple> {
        Ok(Tuple::new())
    }

    /// Persists the tuple's pending operations.
    ///
    /// An insert tuple whose key already holds a record fails with
    /// [`crate::DialectError::TupleAlreadyExists`].
    ///
    /// # Errors
    ///
    /// Returns an operation error if the backend call fails.
    fn insert_or_update_tuple(
        &self,
        key: &EntityKey,
        tuple: &Tuple,
        context: &TupleContext,
    ) -> DialectResult<()>;

    /// Deletes a record. Deleting an absent record is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the backend call fails.
    fn remove_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<()>;

    /// Reads an association.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the backend call fails.
    fn get_association(
        &self,
        key: &AssociationKey,
        context: &AssociationContext,
    ) -> DialectResult<Option<Association>>;

    /// Creates an empty association without touching storage.
    ///
    /// # Errors
    ///
    /// Dialects that need a round-trip may fail with an operation error.
    fn create_association(
        &self,
        _key: &AssociationKey,
        _context: &AssociationContext,
    ) -> DialectResult<Association> {
        Ok(Association::new())
    }

    /// Persists the association's pending row operations.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the backend call fails.
    fn insert_or_update_association(
        &self,
        key: &AssociationKey,
        association: &Association,
        context: &AssociationContext,
    ) -> DialectResult<()>;

    /// Deletes every row of an association. Absent associations are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the backend call fails.
    fn remove_association(&self, key: &AssociationKey, context: &AssociationContext) -> DialectResult<()>;

    /// Whether rows of this association type live inside the owning record.
    fn is_stored_in_entity_structure(
        &self,
        _metadata: &AssociationKeyMetadata,
        context: &AssociationTypeContext,
    ) -> bool {
        context.strategy().is_in_entity()
    }

    /// Returns the next value of a counter, atomically across all callers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DialectError::IdGeneration`] if no value could be
    /// produced. No fallback value is ever returned.
    fn next_value(&self, request: &NextValueRequest) -> DialectResult<i64>;

    /// Whether the backend has native sequences.
    fn supports_sequences(&self) -> bool {
        false
    }

    /// Runs a query in the backend's own language.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DialectError::InvalidQuery`] if the query cannot be
    /// parsed, or an operation error if it fails.
    fn execute_native_query(&self, query: &NativeQuery, parameters: &QueryParameters) -> DialectResult<TupleIter>;

    /// Feeds every record of the table described by `metadata` to `consumer`.
    ///
    /// # Errors
    ///
    /// Returns an operation error if the backend call fails.
    fn for_each_tuple(
        &self,
        metadata: &EntityKeyMetadata,
        context: &TupleContext,
        consumer: &mut dyn FnMut(Tuple),
    ) -> DialectResult<()>;

    /// Registers unique constraints. Backends unable to honor a constraint
    /// fully degrade it and log a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the definition.
    fn define_unique_constraints(&self, _constraints: &[UniqueConstraint]) -> DialectResult<()> {
        Ok(())
    }

    /// The optimistic locking facet, if supported.
    fn optimistic_locking(&self) -> Option<&dyn OptimisticLockingDialect> {
        None
    }

    /// The stored procedure facet, if supported.
    fn stored_procedures(&self) -> Option<&dyn StoredProcedureDialect> {
        None
    }

    /// The batch execution facet, if supported.
    fn batchable(&self) -> Option<&dyn BatchableDialect> {
        None
    }

    /// The criteria facet, if supported.
    fn criteria(&self) -> Option<&dyn CriteriaDialect> {
        None
    }
}
