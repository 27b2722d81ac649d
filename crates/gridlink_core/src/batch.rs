//! Queued writes and the batching delegator.

use crate::association::Association;
use crate::dialect::{
    AssociationContext, BatchableDialect, CriteriaDialect, GridDialect, NativeQuery,
    OptimisticLockingDialect, QueryParameters, StoredProcedureDialect, TupleContext, TupleIter,
    UniqueConstraint,
};
use crate::error::{DialectError, DialectResult};
use crate::idgen::NextValueRequest;
use crate::key::{AssociationKey, AssociationKeyMetadata, EntityKey, EntityKeyMetadata};
use crate::strategy::{AssociationTypeContext, BackendProfile};
use crate::tuple::Tuple;
use gridlink_codec::TypeRegistry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A write waiting in a batch.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Insert or update a record.
    InsertOrUpdateTuple {
        /// Record key.
        key: EntityKey,
        /// Tuple with pending operations.
        tuple: Tuple,
        /// Operation context.
        context: TupleContext,
    },
    /// Delete a record.
    RemoveTuple {
        /// Record key.
        key: EntityKey,
        /// Operation context.
        context: TupleContext,
    },
    /// Insert or update an association.
    InsertOrUpdateAssociation {
        /// Association key.
        key: AssociationKey,
        /// Association with pending row operations.
        association: Association,
        /// Operation context.
        context: AssociationContext,
    },
    /// Delete an association.
    RemoveAssociation {
        /// Association key.
        key: AssociationKey,
        /// Operation context.
        context: AssociationContext,
    },
}

impl Operation {
    /// Short name of the operation kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InsertOrUpdateTuple { .. } => "insert_or_update_tuple",
            Self::RemoveTuple { .. } => "remove_tuple",
            Self::InsertOrUpdateAssociation { .. } => "insert_or_update_association",
            Self::RemoveAssociation { .. } => "remove_association",
        }
    }

    /// Executes this operation directly against `dialect`.
    ///
    /// # Errors
    ///
    /// Propagates the dialect's error.
    pub fn apply(self, dialect: &dyn GridDialect) -> DialectResult<()> {
        match self {
            Self::InsertOrUpdateTuple {
                key,
                tuple,
                context,
            } => dialect.insert_or_update_tuple(&key, &tuple, &context),
            Self::RemoveTuple { key, context } => dialect.remove_tuple(&key, &context),
            Self::InsertOrUpdateAssociation {
                key,
                association,
                context,
            } => dialect.insert_or_update_association(&key, &association, &context),
            Self::RemoveAssociation { key, context } => dialect.remove_association(&key, &context),
        }
    }
}

/// An ordered queue of writes.
#[derive(Debug, Default)]
pub struct OperationsQueue {
    operations: VecDeque<Operation>,
    closed: bool,
}

impl OperationsQueue {
    /// Creates an empty open queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidOperation`] if the queue is closed.
    pub fn add(&mut self, operation: Operation) -> DialectResult<()> {
        if self.closed {
            return Err(DialectError::invalid_operation(
                "operations queue is closed",
            ));
        }
        self.operations.push_back(operation);
        Ok(())
    }

    /// Takes the oldest operation.
    pub fn poll(&mut self) -> Option<Operation> {
        self.operations.pop_front()
    }

    /// Closes the queue; further additions fail.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether the queue is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates queued operations in order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// Executes and drains every operation one by one against `dialect`.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failure.
    pub fn replay(&mut self, dialect: &dyn GridDialect) -> DialectResult<()> {
        while let Some(operation) = self.poll() {
            operation.apply(dialect)?;
        }
        Ok(())
    }
}

/// Queues writes while a batch is open.
///
/// Reads, id generation and queries always go straight to the delegate, so
/// they do not observe queued writes. A flush hands the queue to the
/// delegate's batch facet when it has one and replays it in order otherwise.
/// The batch belongs to the whole instance, not to a thread.
pub struct BatchingDialect {
    delegate: Arc<dyn GridDialect>,
    queue: Mutex<Option<OperationsQueue>>,
}

impl BatchingDialect {
    /// Wraps `delegate`.
    #[must_use]
    pub fn new(delegate: Arc<dyn GridDialect>) -> Self {
        Self {
            delegate,
            queue: Mutex::new(None),
        }
    }

    /// Returns the wrapped dialect.
    #[must_use]
    pub fn delegate(&self) -> &dyn GridDialect {
        self.delegate.as_ref()
    }

    /// Opens a batch.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidOperation`] if a batch is already open.
    pub fn begin_batch(&self) -> DialectResult<()> {
        let mut queue = self.queue.lock();
        if queue.is_some() {
            return Err(DialectError::invalid_operation("a batch is already open"));
        }
        *queue = Some(OperationsQueue::new());
        Ok(())
    }

    /// Whether a batch is open.
    #[must_use]
    pub fn is_batch_open(&self) -> bool {
        self.queue.lock().is_some()
    }

    /// Number of queued writes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().as_ref().map_or(0, OperationsQueue::len)
    }

    /// Closes the batch and executes its writes in order.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidOperation`] if no batch is open, or the
    /// first failing write's error.
    pub fn execute_batch(&self) -> DialectResult<()> {
        let mut queue = self
            .queue
            .lock()
            .take()
            .ok_or_else(|| DialectError::invalid_operation("no batch is open"))?;
        queue.close();
        debug!(operations = queue.len(), "flushing batch");
        match self.delegate.batchable() {
            Some(batchable) => batchable.execute_batch(&mut queue),
            None => queue.replay(self.delegate.as_ref()),
        }
    }

    /// Drops the open batch without executing it. Returns the number of
    /// discarded writes.
    pub fn abort_batch(&self) -> usize {
        self.queue.lock().take().map_or(0, |q| q.len())
    }

    fn queue_or_run(&self, operation: Operation) -> DialectResult<()> {
        {
            let mut queue = self.queue.lock();
            if let Some(queue) = queue.as_mut() {
                return queue.add(operation);
            }
        }
        operation.apply(self.delegate.as_ref())
    }
}

impl fmt::Debug for BatchingDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchingDialect")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl GridDialect for BatchingDialect {
    fn profile(&self) -> BackendProfile {
        self.delegate.profile()
    }

    fn type_overrides(&self) -> TypeRegistry {
        self.delegate.type_overrides()
    }

    fn get_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<Option<Tuple>> {
        self.delegate.get_tuple(key, context)
    }

    fn get_tuples(&self, keys: &[EntityKey], context: &TupleContext) -> DialectResult<Vec<Option<Tuple>>> {
        self.delegate.get_tuples(keys, context)
    }

    fn create_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<Tuple> {
        self.delegate.create_tuple(key, context)
    }

    fn insert_or_update_tuple(&self, key: &EntityKey, tuple: &Tuple, context: &TupleContext) -> DialectResult<()> {
        self.queue_or_run(Operation::InsertOrUpdateTuple {
            key: key.clone(),
            tuple: tuple.clone(),
            context: context.clone(),
        })
    }

    fn remove_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<()> {
        self.queue_or_run(Operation::RemoveTuple {
            key: key.clone(),
            context: context.clone(),
        })
    }

    fn get_association(
        &self,
        key: &AssociationKey,
        context: &AssociationContext,
    ) -> DialectResult<Option<Association>> {
        self.delegate.get_association(key, context)
    }

    fn create_association(&self, key: &AssociationKey, context: &AssociationContext) -> DialectResult<Association> {
        self.delegate.create_association(key, context)
    }

    fn insert_or_update_association(
        &self,
        key: &AssociationKey,
        association: &Association,
        context: &AssociationContext,
    ) -> DialectResult<()> {
        self.queue_or_run(Operation::InsertOrUpdateAssociation {
            key: key.clone(),
            association: association.clone(),
            context: context.clone(),
        })
    }

    fn remove_association(&self, key: &AssociationKey, context: &AssociationContext) -> DialectResult<()> {
        self.queue_or_run(Operation::RemoveAssociation {
            key: key.clone(),
            context: context.clone(),
        })
    }

    fn is_stored_in_entity_structure(
        &self,
        metadata: &AssociationKeyMetadata,
        context: &AssociationTypeContext,
    ) -> bool {
        self.delegate.is_stored_in_entity_structure(metadata, context)
    }

    fn next_value(&self, request: &NextValueRequest) -> DialectResult<i64> {
        self.delegate.next_value(request)
    }

    fn supports_sequences(&self) -> bool {
        self.delegate.supports_sequences()
    }

    fn execute_native_query(&self, query: &NativeQuery, parameters: &QueryParameters) -> DialectResult<TupleIter> {
        self.delegate.execute_native_query(query, parameters)
    }

    fn for_each_tuple(
        &self,
        metadata: &EntityKeyMetadata,
        context: &TupleContext,
        consumer: &mut dyn FnMut(Tuple),
    ) -> DialectResult<()> {
        self.delegate.for_each_tuple(metadata, context, consumer)
    }

    fn define_unique_constraints(&self, constraints: &[UniqueConstraint]) -> DialectResult<()> {
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
