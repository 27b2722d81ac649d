//! Invocation logging around a dialect.

use crate::association::Association;
use crate::dialect::{
    AssociationContext, BatchableDialect, CriteriaDialect, GridDialect, NativeQuery,
    OptimisticLockingDialect, QueryParameters, StoredProcedureDialect, TupleContext, TupleIter,
    UniqueConstraint,
};
use crate::error::DialectResult;
use crate::idgen::NextValueRequest;
use crate::key::{AssociationKey, AssociationKeyMetadata, EntityKey, EntityKeyMetadata};
use crate::strategy::{AssociationTypeContext, BackendProfile};
use crate::tuple::Tuple;
use gridlink_codec::TypeRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, Span};

/// Emits a `trace!` event for every dialect call, inside a span supplied by
/// the caller.
///
/// The span is injected at construction; the wrapper never looks up who is
/// calling it.
///
/// ```
/// use std::sync::Arc;
/// use gridlink_core::{GridDialect, LoggingDialect, MapDialect};
///
/// let dialect = LoggingDialect::new(
///     Arc::new(MapDialect::new()),
///     tracing::info_span!("dialect", backend = "map"),
/// );
/// assert!(dialect.optimistic_locking().is_some());
/// ```
pub struct LoggingDialect {
    delegate: Arc<dyn GridDialect>,
    span: Span,
}

impl LoggingDialect {
    /// Wraps `delegate`; events are recorded inside `span`.
    #[must_use]
    pub fn new(delegate: Arc<dyn GridDialect>, span: Span) -> Self {
        Self { delegate, span }
    }

    /// Returns the wrapped dialect.
    #[must_use]
    pub fn delegate(&self) -> &dyn GridDialect {
        self.delegate.as_ref()
    }

    /// Returns the span events are recorded in.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl fmt::Debug for LoggingDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingDialect")
            .field("span", &self.span)
            .finish_non_exhaustive()
    }
}

impl GridDialect for LoggingDialect {
    fn profile(&self) -> BackendProfile {
        self.delegate.profile()
    }

    fn type_overrides(&self) -> TypeRegistry {
        self.delegate.type_overrides()
    }

    fn get_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<Option<Tuple>> {
        let _guard = self.span.enter();
        trace!(%key, "get_tuple");
        self.delegate.get_tuple(key, context)
    }

    fn get_tuples(&self, keys: &[EntityKey], context: &TupleContext) -> DialectResult<Vec<Option<Tuple>>> {
        let _guard = self.span.enter();
        trace!(count = keys.len(), "get_tuples");
        self.delegate.get_tuples(keys, context)
    }

    fn create_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<Tuple> {
        let _guard = self.span.enter();
        trace!(%key, "create_tuple");
        self.delegate.create_tuple(key, context)
    }

    fn insert_or_update_tuple(&self, key: &EntityKey, tuple: &Tuple, context: &TupleContext) -> DialectResult<()> {
        let _guard = self.span.enter();
        trace!(%key, operations = tuple.operations().len(), "insert_or_update_tuple");
        self.delegate.insert_or_update_tuple(key, tuple, context)
    }

    fn remove_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<()> {
        let _guard = self.span.enter();
        trace!(%key, "remove_tuple");
        self.delegate.remove_tuple(key, context)
    }

    fn get_association(
        &self,
        key: &AssociationKey,
        context: &AssociationContext,
    ) -> DialectResult<Option<Association>> {
        let _guard = self.span.enter();
        trace!(%key, strategy = %context.strategy(), "get_association");
        self.delegate.get_association(key, context)
    }

    fn create_association(&self, key: &AssociationKey, context: &AssociationContext) -> DialectResult<Association> {
        let _guard = self.span.enter();
        trace!(%key, "create_association");
        self.delegate.create_association(key, context)
    }

    fn insert_or_update_association(
        &self,
        key: &AssociationKey,
        association: &Association,
        context: &AssociationContext,
    ) -> DialectResult<()> {
        let _guard = self.span.enter();
        trace!(
            %key,
            operations = association.operations().len(),
            cleared = association.is_cleared(),
            "insert_or_update_association"
        );
        self.delegate.insert_or_update_association(key, association, context)
    }

    fn remove_association(&self, key: &AssociationKey, context: &AssociationContext) -> DialectResult<()> {
        let _guard = self.span.enter();
        trace!(%key, "remove_association");
        self.delegate.remove_association(key, context)
    }

    fn is_stored_in_entity_structure(
        &self,
        metadata: &AssociationKeyMetadata,
        context: &AssociationTypeContext,
    ) -> bool {
        self.delegate.is_stored_in_entity_structure(metadata, context)
    }

    fn next_value(&self, request: &NextValueRequest) -> DialectResult<i64> {
        let _guard = self.span.enter();
        trace!(key = %request.key(), increment = request.increment(), "next_value");
        self.delegate.next_value(request)
    }

    fn supports_sequences(&self) -> bool {
        self.delegate.supports_sequences()
    }

    fn execute_native_query(&self, query: &NativeQuery, parameters: &QueryParameters) -> DialectResult<TupleIter> {
        let _guard = self.span.enter();
        trace!(query = query.text(), "execute_native_query");
        self.delegate.execute_native_query(query, parameters)
    }

    fn for_each_tuple(
        &self,
        metadata: &EntityKeyMetadata,
        context: &TupleContext,
        consumer: &mut dyn FnMut(Tuple),
    ) -> DialectResult<()> {
        let _guard = self.span.enter();
        trace!(table = metadata.table(), "for_each_tuple");
        self.delegate.for_each_tuple(metadata, context, consumer)
    }

    fn define_unique_constraints(&self, constraints: &[UniqueConstraint]) -> DialectResult<()> {
        let _guard = self.span.enter();
        trace!(count = constraints.len(), "define_unique_constraints");
        self.delegate.define_unique_constraints(constraints)
    }

    fn optimistic_locking(&self) -> Option<&dyn OptimisticLockingDialect> {
        self.delegate.optimistic_locking()
    }

    fn stored_procedures(&self) -> Option<&dyn StoredProcedureDialect> {
        self.delegate.stored_procedures()
    }

    fn batchable(&self) -> Option<&dyn BatchableDialect> {
        self.delegate.batchable()
    }

    fn criteria(&self) -> Option<&dyn CriteriaDialect> {
        self.delegate.criteria()
    }
}
