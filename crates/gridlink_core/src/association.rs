//! Associations: the rows of one relationship plus pending row operations.

use crate::key::RowKey;
use crate::tuple::Tuple;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Read-only view of an association's rows as currently stored.
pub trait AssociationSnapshot: Send + Sync + fmt::Debug {
    /// Returns the row stored under `key`.
    fn get(&self, key: &RowKey) -> Option<&Tuple>;

    /// Whether a row is stored under `key`.
    fn contains_key(&self, key: &RowKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of stored rows.
    fn size(&self) -> usize;

    /// Row keys in storage order.
    fn row_keys(&self) -> Vec<RowKey>;
}

/// The default snapshot: rows in insertion order with a hash index.
#[derive(Debug, Clone, Default)]
pub struct MapAssociationSnapshot {
    rows: Vec<(RowKey, Tuple)>,
    index: HashMap<RowKey, usize>,
}

impl MapAssociationSnapshot {
    /// Creates a snapshot from stored rows. A repeated key keeps its first
    /// position and its last tuple.
    #[must_use]
    pub fn new(rows: impl IntoIterator<Item = (RowKey, Tuple)>) -> Self {
        let mut snapshot = Self::default();
        for (key, tuple) in rows {
            match snapshot.index.get(&key) {
                Some(&i) => snapshot.rows[i].1 = tuple,
                None => {
                    snapshot.index.insert(key.clone(), snapshot.rows.len());
                    snapshot.rows.push((key, tuple));
                }
            }
        }
        snapshot
    }

    /// Iterates the stored rows.
    pub fn rows(&self) -> impl Iterator<Item = (&RowKey, &Tuple)> {
        self.rows.iter().map(|(k, t)| (k, t))
    }
}

impl AssociationSnapshot for MapAssociationSnapshot {
    fn get(&self, key: &RowKey) -> Option<&Tuple> {
        self.index.get(key).map(|&i| &self.rows[i].1)
    }

    fn contains_key(&self, key: &RowKey) -> bool {
        self.index.contains_key(key)
    }

    fn size(&self) -> usize {
        self.rows.len()
    }

    fn row_keys(&self) -> Vec<RowKey> {
        self.rows.iter().map(|(k, _)| k.clone()).collect()
    }
}

/// A pending change to one row.
#[derive(Debug, Clone)]
pub enum AssociationOperation {
    /// Insert or replace the row.
    Put {
        /// Row key.
        key: RowKey,
        /// Row content.
        tuple: Tuple,
    },
    /// Delete the row.
    Remove {
        /// Row key.
        key: RowKey,
    },
}

impl AssociationOperation {
    /// Returns the row key this operation targets.
    #[must_use]
    pub fn key(&self) -> &RowKey {
        match self {
            Self::Put { key, .. } | Self::Remove { key } => key,
        }
    }
}

/// The current row state of one relationship.
///
/// Like [`Tuple`], each row key has at most one pending operation and a later
/// operation on the same row supersedes the earlier one. `clear` drops all
/// pending operations and hides every snapshot row; dialects see the flag via
/// [`is_cleared`](Self::is_cleared) and must delete stored rows first.
#[derive(Debug, Clone)]
pub struct Association {
    snapshot: Arc<dyn AssociationSnapshot>,
    operations: Vec<AssociationOperation>,
    cleared: bool,
}

impl Association {
    /// Creates an empty association.
    #[must_use]
    pub fn new() -> Self {
        Self::from_snapshot(Arc::new(MapAssociationSnapshot::default()))
    }

    /// Wraps a backend snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Arc<dyn AssociationSnapshot>) -> Self {
        Self {
            snapshot,
            operations: Vec::new(),
            cleared: false,
        }
    }

    /// Wraps rows loaded from the backend.
    #[must_use]
    pub fn loaded(rows: impl IntoIterator<Item = (RowKey, Tuple)>) -> Self {
        Self::from_snapshot(Arc::new(MapAssociationSnapshot::new(rows)))
    }

    /// Returns the row under `key`.
    #[must_use]
    pub fn get(&self, key: &RowKey) -> Option<&Tuple> {
        match self.operations.iter().find(|op| op.key() == key) {
            Some(AssociationOperation::Put { tuple, .. }) => Some(tuple),
            Some(AssociationOperation::Remove { .. }) => None,
            None if self.cleared => None,
            None => self.snapshot.get(key),
        }
    }

    /// Inserts or replaces a row.
    pub fn put(&mut self, key: RowKey, tuple: Tuple) {
        self.record(AssociationOperation::Put { key, tuple });
    }

    /// Deletes a row.
    pub fn remove(&mut self, key: RowKey) {
        self.record(AssociationOperation::Remove { key });
    }

    fn record(&mut self, op: AssociationOperation) {
        self.operations.retain(|existing| existing.key() != op.key());
        self.operations.push(op);
    }

    /// Deletes every row.
    pub fn clear(&mut self) {
        self.operations.clear();
        self.cleared = true;
    }

    /// Returns the visible row keys: surviving snapshot rows in storage order,
    /// then newly put rows in the order they were added.
    #[must_use]
    pub fn keys(&self) -> Vec<RowKey> {
        let mut keys = Vec::new();
        let mut seen = HashSet::new();
        if !self.cleared {
            for key in self.snapshot.row_keys() {
                if self.get(&key).is_some() {
                    seen.insert(key.clone());
                    keys.push(key);
                }
            }
        }
        for op in &self.operations {
            if let AssociationOperation::Put { key, .. } = op {
                if seen.insert(key.clone()) {
                    keys.push(key.clone());
                }
            }
        }
        keys
    }

    /// Returns visible rows in [`keys`](Self::keys) order.
    #[must_use]
    pub fn rows(&self) -> Vec<(RowKey, &Tuple)> {
        self.keys()
            .into_iter()
            .filter_map(|key| {
                let tuple = self.get(&key)?;
                Some((key, tuple))
            })
            .collect()
    }

    /// Number of visible rows.
    #[must_use]
    pub fn size(&self) -> usize {
        self.keys().len()
    }

    /// Whether no row is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns the pending row operations in order.
    #[must_use]
    pub fn operations(&self) -> &[AssociationOperation] {
        &self.operations
    }

    /// Whether `clear` was called.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Returns the backend snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &Arc<dyn AssociationSnapshot> {
        &self.snapshot
    }
}

impl Default for Association {
    fn default() -> Self {
        Self::new()
    }
}
