//! Tuples: one record's persisted state plus pending column operations.

use gridlink_codec::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

static NULL: Value = Value::Null;

/// Read-only view of a record as the backend currently stores it.
pub trait TupleSnapshot: Send + Sync + fmt::Debug {
    /// Returns the stored value of `column`, or `None` if the column is absent.
    fn get(&self, column: &str) -> Option<&Value>;

    /// Returns the names of all stored columns.
    fn column_names(&self) -> BTreeSet<String>;

    /// Whether the snapshot holds no column at all.
    fn is_empty(&self) -> bool;
}

/// The default snapshot: a sorted column map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapTupleSnapshot {
    values: BTreeMap<String, Value>,
}

impl MapTupleSnapshot {
    /// Creates a snapshot from stored columns.
    #[must_use]
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl TupleSnapshot for MapTupleSnapshot {
    fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    fn column_names(&self) -> BTreeSet<String> {
        self.values.keys().cloned().collect()
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Whether a tuple was created for a new record or loaded from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotType {
    /// Transient tuple; persisting it inserts a new record.
    Insert,
    /// Loaded tuple; persisting it updates an existing record.
    Update,
}

/// A pending change to one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleOperation {
    /// Set the column to a non-null value.
    Put {
        /// Column name.
        column: String,
        /// New value.
        value: Value,
    },
    /// Set the column to an explicit null.
    PutNull {
        /// Column name.
        column: String,
    },
    /// Delete the column entirely.
    Remove {
        /// Column name.
        column: String,
    },
}

impl TupleOperation {
    /// Returns the column this operation targets.
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Put { column, .. } | Self::PutNull { column } | Self::Remove { column } => column,
        }
    }

    /// Returns the value a read observes after this operation.
    ///
    /// `Some(Value::Null)` for `PutNull`, `None` for `Remove`.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Put { value, .. } => Some(value),
            Self::PutNull { .. } => Some(&NULL),
            Self::Remove { .. } => None,
        }
    }

    /// Applies this operation to a stored column map.
    ///
    /// `PutNull` stores an explicit `Value::Null`, `Remove` deletes the key.
    pub fn apply_to(&self, record: &mut BTreeMap<String, Value>) {
        match self {
            Self::Put { column, value } => {
                record.insert(column.clone(), value.clone());
            }
            Self::PutNull { column } => {
                record.insert(column.clone(), Value::Null);
            }
            Self::Remove { column } => {
                record.remove(column);
            }
        }
    }
}

/// One record's current column state.
///
/// Reads consult the pending operations first and fall back to the snapshot.
/// Each column has at most one pending operation: a later operation on the
/// same column supersedes the earlier one, and nothing else is ever dropped.
#[derive(Debug, Clone)]
pub struct Tuple {
    snapshot: Arc<dyn TupleSnapshot>,
    operations: Vec<TupleOperation>,
    snapshot_type: SnapshotType,
}

impl Tuple {
    /// Creates an empty transient tuple.
    #[must_use]
    pub fn new() -> Self {
        Self::from_snapshot(Arc::new(MapTupleSnapshot::default()), SnapshotType::Insert)
    }

    /// Wraps a backend snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Arc<dyn TupleSnapshot>, snapshot_type: SnapshotType) -> Self {
        Self {
            snapshot,
            operations: Vec::new(),
            snapshot_type,
        }
    }

    /// Wraps columns loaded from the backend.
    #[must_use]
    pub fn loaded(values: BTreeMap<String, Value>) -> Self {
        Self::from_snapshot(Arc::new(MapTupleSnapshot::new(values)), SnapshotType::Update)
    }

    /// Returns the value of `column`.
    ///
    /// `Some(Value::Null)` is an explicit null; `None` means the column is absent.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        match self.operations.iter().rev().find(|op| op.column() == column) {
            Some(op) => op.value(),
            None => self.snapshot.get(column),
        }
    }

    /// Sets `column`. A `Value::Null` records an explicit null.
    pub fn put(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        let op = if value.is_null() {
            TupleOperation::PutNull { column }
        } else {
            TupleOperation::Put { column, value }
        };
        self.record(op);
    }

    /// Sets `column` to an explicit null.
    pub fn put_null(&mut self, column: impl Into<String>) {
        self.record(TupleOperation::PutNull {
            column: column.into(),
        });
    }

    /// Deletes `column`.
    pub fn remove(&mut self, column: impl Into<String>) {
        self.record(TupleOperation::Remove {
            column: column.into(),
        });
    }

    fn record(&mut self, op: TupleOperation) {
        self.operations.retain(|existing| existing.column() != op.column());
        self.operations.push(op);
    }

    /// Returns the names of all visible columns.
    #[must_use]
    pub fn column_names(&self) -> BTreeSet<String> {
        let mut names = self.snapshot.column_names();
        for op in &self.operations {
            match op {
                TupleOperation::Remove { column } => {
                    names.remove(column);
                }
                TupleOperation::Put { column, .. } | TupleOperation::PutNull { column } => {
                    names.insert(column.clone());
                }
            }
        }
        names
    }

    /// Whether no column is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        if self.operations.is_empty() {
            self.snapshot.is_empty()
        } else {
            self.column_names().is_empty()
        }
    }

    /// Returns the pending operations in the order they were recorded.
    #[must_use]
    pub fn operations(&self) -> &[TupleOperation] {
        &self.operations
    }

    /// Whether there are pending operations.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.operations.is_empty()
    }

    /// Returns the backend snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &Arc<dyn TupleSnapshot> {
        &self.snapshot
    }

    /// Returns the snapshot type.
    #[must_use]
    pub fn snapshot_type(&self) -> SnapshotType {
        self.snapshot_type
    }

    /// Overrides the snapshot type.
    pub fn set_snapshot_type(&mut self, snapshot_type: SnapshotType) {
        self.snapshot_type = snapshot_type;
    }

    /// Materializes every visible column.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.column_names()
            .into_iter()
            .filter_map(|name| {
                let value = self.get(&name)?.clone();
                Some((name, value))
            })
            .collect()
    }

    /// Returns a tuple without pending operations holding only the snapshot.
    ///
    /// Used as the prior state of an optimistic-lock write.
    #[must_use]
    pub fn snapshot_only(&self) -> Tuple {
        Self::from_snapshot(Arc::clone(&self.snapshot), self.snapshot_type)
    }

    /// Folds the pending operations into a fresh snapshot.
    ///
    /// Called after a successful write: the tuple now mirrors the persisted
    /// record and is an update tuple.
    pub fn consolidate(&mut self) {
        let values = self.to_map();
        self.snapshot = Arc::new(MapTupleSnapshot::new(values));
        self.operations.clear();
        self.snapshot_type = SnapshotType::Update;
    }
}

impl Default for Tuple {
    fn default() -> Self {
        Self::new()
    }
}
