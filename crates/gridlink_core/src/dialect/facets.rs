//! Optional capability facets.
//!
//! A dialect exposes a facet by returning `Some(self)` from the matching
//! accessor on [`super::GridDialect`]. Callers never probe types at runtime;
//! they consult the [`super::Capabilities`] computed once by
//! [`super::DialectHandle`].

use super::context::TupleContext;
use super::query::{Criteria, TupleIter};
use crate::batch::OperationsQueue;
use crate::error::DialectResult;
use crate::key::EntityKey;
use crate::tuple::Tuple;
use gridlink_codec::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Names of the optional facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    /// Compare-and-swap tuple writes.
    OptimisticLocking,
    /// Named backend routines.
    StoredProcedures,
    /// Native batch submission.
    Batch,
    /// Structured criteria queries.
    Criteria,
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OptimisticLocking => "optimistic locking",
            Self::StoredProcedures => "stored procedures",
            Self::Batch => "batch execution",
            Self::Criteria => "criteria queries",
        };
        f.write_str(name)
    }
}

/// Compare-and-swap writes against a caller-supplied prior state.
pub trait OptimisticLockingDialect: Send + Sync {
    /// Applies `tuple` only if every column of `old_lock_state` still holds
    /// the same value in storage.
    ///
    /// Returns `false` if a concurrent writer changed the record or it no
    /// longer exists. A miss is never an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend call itself fails.
    fn update_tuple_with_optimistic_lock(
        &self,
        key: &EntityKey,
        old_lock_state: &Tuple,
        tuple: &Tuple,
        context: &TupleContext,
    ) -> DialectResult<bool>;

    /// Removes the record only if it still matches `old_lock_state`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend call itself fails.
    fn remove_tuple_with_optimistic_lock(
        &self,
        key: &EntityKey,
        old_lock_state: &Tuple,
        context: &TupleContext,
    ) -> DialectResult<bool>;
}

/// Parameters of a stored procedure call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureParameters {
    /// Parameters by position.
    Positional(Vec<Value>),
    /// Parameters by name.
    Named(BTreeMap<String, Value>),
}

impl ProcedureParameters {
    /// No parameters.
    #[must_use]
    pub fn none() -> Self {
        Self::Positional(Vec::new())
    }

    /// Returns a positional parameter.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&Value> {
        match self {
            Self::Positional(values) => values.get(index),
            Self::Named(_) => None,
        }
    }

    /// Returns a named parameter.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Named(values) => values.get(name),
            Self::Positional(_) => None,
        }
    }
}

/// Execution of named backend routines.
pub trait StoredProcedureDialect: Send + Sync {
    /// Calls `name`, returning zero, one or many result tuples.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DialectError::InvalidQuery`] if the procedure does not
    /// exist, or an operation error if it fails.
    fn call_stored_procedure(
        &self,
        name: &str,
        parameters: &ProcedureParameters,
        context: &TupleContext,
    ) -> DialectResult<TupleIter>;
}

/// Native submission of queued writes.
pub trait BatchableDialect: Send + Sync {
    /// Executes and drains every operation in `queue`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first failing operation's error; later operations are not
    /// executed.
    fn execute_batch(&self, queue: &mut OperationsQueue) -> DialectResult<()>;
}

/// Execution of structured criteria.
pub trait CriteriaDialect: Send + Sync {
    /// Returns every tuple of the criteria's table matching all predicates.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn execute_criteria(&self, criteria: &Criteria, context: &TupleContext) -> DialectResult<TupleIter>;
}
