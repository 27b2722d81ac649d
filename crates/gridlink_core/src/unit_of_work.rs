//! Tuple lifecycle across one unit of work.
//!
//! ```text
//! Absent ──load──▶ Loaded ──put──▶ Modified ──save──▶ Committed
//!    │                │               │  ▲
//!    └──put───────────┼──────────────▶│  └── lock miss
//!                     └── discard ────┴──▶ Discarded
//! ```

use crate::dialect::{GridDialect, OptimisticLockingDialect, TupleContext};
use crate::error::{DialectError, DialectResult};
use crate::key::EntityKey;
use crate::tuple::{SnapshotType, Tuple};
use gridlink_codec::Value;
use tracing::debug;

/// Lifecycle state of a managed tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TupleState {
    /// No record exists yet.
    Absent,
    /// The record was read and is unchanged.
    Loaded,
    /// Changes are pending.
    Modified,
    /// A write succeeded. Terminal.
    Committed,
    /// The unit of work gave up on the tuple. Terminal.
    Discarded,
}

impl TupleState {
    /// Whether the lifecycle allows moving from `self` to `to`.
    #[must_use]
    pub const fn can_transition_to(self, to: TupleState) -> bool {
        matches!(
            (self, to),
            (TupleState::Absent, TupleState::Loaded)
                | (TupleState::Absent | TupleState::Loaded | TupleState::Modified, TupleState::Modified)
                | (TupleState::Absent | TupleState::Loaded | TupleState::Modified, TupleState::Discarded)
                | (TupleState::Loaded | TupleState::Modified, TupleState::Committed)
        )
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, TupleState::Committed | TupleState::Discarded)
    }
}

/// A tuple tracked through one unit of work.
#[derive(Debug, Clone)]
pub struct ManagedTuple {
    key: EntityKey,
    tuple: Tuple,
    state: TupleState,
}

impl ManagedTuple {
    /// Starts tracking a key with no stored record.
    #[must_use]
    pub fn absent(key: EntityKey) -> Self {
        Self {
            key,
            tuple: Tuple::new(),
            state: TupleState::Absent,
        }
    }

    /// Reads `key` through `dialect`. Missing records start out `Absent`
    /// with a transient tuple from [`GridDialect::create_tuple`].
    ///
    /// # Errors
    ///
    /// Propagates dialect errors.
    pub fn load(dialect: &dyn GridDialect, key: EntityKey, context: &TupleContext) -> DialectResult<Self> {
        match dialect.get_tuple(&key, context)? {
            Some(tuple) => {
                let mut managed = Self::absent(key);
                managed.tuple = tuple;
                managed.transition(TupleState::Loaded)?;
                Ok(managed)
            }
            None => {
                let tuple = dialect.create_tuple(&key, context)?;
                Ok(Self {
                    key,
                    tuple,
                    state: TupleState::Absent,
                })
            }
        }
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Returns the tuple.
    #[must_use]
    pub fn tuple(&self) -> &Tuple {
        &self.tuple
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TupleState {
        self.state
    }

    fn transition(&mut self, to: TupleState) -> DialectResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(DialectError::InvalidStateTransition {
                from: self.state,
                to,
            });
        }
        debug!(key = %self.key, from = ?self.state, ?to, "tuple state change");
        self.state = to;
        Ok(())
    }

    /// Sets a column.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidStateTransition`] once committed or discarded.
    pub fn put(&mut self, column: impl Into<String>, value: impl Into<Value>) -> DialectResult<()> {
        self.transition(TupleState::Modified)?;
        self.tuple.put(column, value);
        Ok(())
    }

    /// Sets a column to an explicit null.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidStateTransition`] once committed or discarded.
    pub fn put_null(&mut self, column: impl Into<String>) -> DialectResult<()> {
        self.transition(TupleState::Modified)?;
        self.tuple.put_null(column);
        Ok(())
    }

    /// Deletes a column.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidStateTransition`] once committed or discarded.
    pub fn remove(&mut self, column: impl Into<String>) -> DialectResult<()> {
        self.transition(TupleState::Modified)?;
        self.tuple.remove(column);
        Ok(())
    }

    /// Writes pending changes. Moves to `Committed`.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidStateTransition`] unless `Modified`, or
    /// the dialect's error; a failed write leaves the state unchanged.
    pub fn save(&mut self, dialect: &dyn GridDialect, context: &TupleContext) -> DialectResult<()> {
        self.require(TupleState::Modified, TupleState::Committed)?;
        dialect.insert_or_update_tuple(&self.key, &self.tuple, context)?;
        self.tuple.consolidate();
        self.transition(TupleState::Committed)
    }

    /// Writes pending changes only if the stored record still matches the
    /// state this tuple was loaded from.
    ///
    /// Returns `false` on a lock miss; the tuple stays `Modified` and the
    /// caller decides whether to reload and retry or discard.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidStateTransition`] unless `Modified`,
    /// [`DialectError::InvalidOperation`] if the tuple was never stored (use
    /// [`ManagedTuple::save`] for those), or the dialect's error.
    pub fn save_with_lock(
        &mut self,
        locking: &dyn OptimisticLockingDialect,
        context: &TupleContext,
    ) -> DialectResult<bool> {
        self.require(TupleState::Modified, TupleState::Committed)?;
        if self.tuple.snapshot_type() == SnapshotType::Insert {
            return Err(DialectError::invalid_operation(format!(
                "{} has no stored record to lock against",
                self.key
            )));
        }
        let old_lock_state = self.tuple.snapshot_only();
        if !locking.update_tuple_with_optimistic_lock(&self.key, &old_lock_state, &self.tuple, context)? {
            debug!(key = %self.key, "optimistic lock miss");
            return Ok(false);
        }
        self.tuple.consolidate();
        self.transition(TupleState::Committed)?;
        Ok(true)
    }

    /// Deletes the stored record. Moves to `Committed`.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidStateTransition`] unless `Loaded` or
    /// `Modified`, or the dialect's error.
    pub fn delete(&mut self, dialect: &dyn GridDialect, context: &TupleContext) -> DialectResult<()> {
        self.require_any(&[TupleState::Loaded, TupleState::Modified], TupleState::Committed)?;
        dialect.remove_tuple(&self.key, context)?;
        self.transition(TupleState::Committed)
    }

    /// Abandons the tuple. Moves to `Discarded`.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidStateTransition`] once committed or discarded.
    pub fn discard(&mut self) -> DialectResult<()> {
        self.transition(TupleState::Discarded)
    }

    fn require(&self, from: TupleState, to: TupleState) -> DialectResult<()> {
        self.require_any(&[from], to)
    }

    fn require_any(&self, from: &[TupleState], to: TupleState) -> DialectResult<()> {
        if from.contains(&self.state) {
            Ok(())
        } else {
            Err(DialectError::InvalidStateTransition {
                from: self.state,
                to,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_transitions() {
        use TupleState::*;
        assert!(Absent.can_transition_to(Loaded));
        assert!(Absent.can_transition_to(Modified));
        assert!(Loaded.can_transition_to(Modified));
        assert!(Modified.can_transition_to(Modified));
        assert!(Modified.can_transition_to(Committed));
        assert!(Modified.can_transition_to(Discarded));
        assert!(Loaded.can_transition_to(Committed));
    }

    #[test]
    fn terminal_states_go_nowhere() {
        use TupleState::*;
        for to in [Absent, Loaded, Modified, Committed, Discarded] {
            assert!(!Committed.can_transition_to(to));
            assert!(!Discarded.can_transition_to(to));
        }
        assert!(!Absent.can_transition_to(Committed));
        assert!(!Loaded.can_transition_to(Absent));
    }

    #[test]
    fn locked_save_of_a_new_tuple_is_rejected() {
        let dialect = crate::MapDialect::new();
        let context = TupleContext::default();
        let mut managed = ManagedTuple::load(&dialect, EntityKey::single("orders", "id", 1), &context).unwrap();
        managed.put("total", 10).unwrap();

        let err = managed.save_with_lock(&dialect, &context).unwrap_err();
        assert!(matches!(err, DialectError::InvalidOperation { .. }));
        assert_eq!(managed.state(), TupleState::Modified);

        managed.save(&dialect, &context).unwrap();
        assert_eq!(managed.state(), TupleState::Committed);
    }

    #[test]
    fn locked_save_of_a_loaded_tuple_commits() {
        let dialect = crate::MapDialect::new();
        let context = TupleContext::default();
        let key = EntityKey::single("orders", "id", 2);
        let mut seed = ManagedTuple::absent(key.clone());
        seed.put("total", 1).unwrap();
        seed.save(&dialect, &context).unwrap();

        let mut managed = ManagedTuple::load(&dialect, key, &context).unwrap();
        managed.put("total", 2).unwrap();
        assert!(managed.save_with_lock(&dialect, &context).unwrap());
        assert_eq!(managed.state(), TupleState::Committed);
    }

    #[test]
    fn edits_after_discard_are_rejected() {
        let mut managed = ManagedTuple::absent(EntityKey::single("orders", "id", 1));
        managed.put("total", 10).unwrap();
        assert_eq!(managed.state(), TupleState::Modified);
        managed.discard().unwrap();
        let err = managed.put("total", 11).unwrap_err();
        assert!(matches!(
            err,
            DialectError::InvalidStateTransition {
                from: TupleState::Discarded,
                to: TupleState::Modified
            }
        ));
    }
}
