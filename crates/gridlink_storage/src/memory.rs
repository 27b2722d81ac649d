//! In-memory key-value store.

use crate::error::{StorageError, StorageResult};
use crate::kv::KvStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory, ordered key-value store.
///
/// This store keeps everything in a `BTreeMap` behind a single lock and is
/// suitable for:
/// - Unit and integration tests
/// - Embedded use where durability is not required
///
/// # Thread Safety
///
/// All operations take the lock for their full duration, so every
/// single-key primitive is atomic.
///
/// # Example
///
/// ```rust
/// use gridlink_storage::{InMemoryKvStore, KvStore};
///
/// let store = InMemoryKvStore::new();
/// store.put(b"a", b"1".to_vec()).unwrap();
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    closed: AtomicBool,
}

impl InMemoryKvStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing entries.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            data: RwLock::new(entries.into_iter().collect()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns a copy of all entries.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.data.read().clone()
    }

    /// Closes the store; every later call fails with [`StorageError::Closed`].
    ///
    /// Used to simulate a lost backend connection.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: Vec<u8>) -> StorageResult<()> {
        self.ensure_open()?;
        self.data.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn put_if_absent(&self, key: &[u8], value: Vec<u8>) -> StorageResult<bool> {
        self.ensure_open()?;
        let mut data = self.data.write();
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(key.to_vec(), value);
        Ok(true)
    }

    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<Vec<u8>>,
    ) -> StorageResult<bool> {
        self.ensure_open()?;
        let mut data = self.data.write();
        if data.get(key).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        match new {
            Some(value) => {
                data.insert(key.to_vec(), value);
            }
            None => {
                data.remove(key);
            }
        }
        Ok(true)
    }

    fn delete(&self, key: &[u8]) -> StorageResult<bool> {
        self.ensure_open()?;
        Ok(self.data.write().remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ensure_open()?;
        let data = self.data.read();
        Ok(data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryKvStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get(b"missing").unwrap(), None);
    }

    #[test]
    fn memory_put_overwrites() {
        let store = InMemoryKvStore::new();
        store.put(b"k", b"1".to_vec()).unwrap();
        store.put(b"k", b"2".to_vec()).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_put_if_absent_only_writes_once() {
        let store = InMemoryKvStore::new();
        assert!(store.put_if_absent(b"k", b"first".to_vec()).unwrap());
        assert!(!store.put_if_absent(b"k", b"second".to_vec()).unwrap());
        assert_eq!(store.get(b"k").unwrap(), Some(b"first".to_vec()));
    }

    #[test]
    fn memory_compare_and_swap_checks_current_value() {
        let store = InMemoryKvStore::new();
        assert!(!store.compare_and_swap(b"k", Some(b"x"), Some(b"y".to_vec())).unwrap());
        assert!(store.compare_and_swap(b"k", None, Some(b"x".to_vec())).unwrap());
        assert!(!store.compare_and_swap(b"k", None, Some(b"z".to_vec())).unwrap());
        assert!(store.compare_and_swap(b"k", Some(b"x"), Some(b"y".to_vec())).unwrap());
        assert_eq!(store.get(b"k").unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn memory_compare_and_swap_can_delete() {
        let store = InMemoryKvStore::new();
        store.put(b"k", b"v".to_vec()).unwrap();
        assert!(store.compare_and_swap(b"k", Some(b"v"), None).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn memory_delete_reports_presence() {
        let store = InMemoryKvStore::new();
        store.put(b"k", b"v".to_vec()).unwrap();
        assert!(store.delete(b"k").unwrap());
        assert!(!store.delete(b"k").unwrap());
    }

    #[test]
    fn memory_scan_prefix_is_ordered_and_bounded() {
        let store = InMemoryKvStore::with_entries([
            (b"a/2".to_vec(), b"2".to_vec()),
            (b"a/1".to_vec(), b"1".to_vec()),
            (b"b/1".to_vec(), b"3".to_vec()),
            (b"a".to_vec(), b"0".to_vec()),
        ]);
        let keys: Vec<_> = store
            .scan_prefix(b"a/")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"a/1".to_vec(), b"a/2".to_vec()]);
    }

    #[test]
    fn memory_closed_store_rejects_calls() {
        let store = InMemoryKvStore::new();
        store.close();
        assert!(matches!(store.get(b"k"), Err(StorageError::Closed)));
        assert!(matches!(store.put(b"k", vec![]), Err(StorageError::Closed)));
    }

    #[test]
    fn memory_concurrent_put_if_absent_has_one_winner() {
        let store = Arc::new(InMemoryKvStore::new());
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.put_if_absent(b"k", vec![i]).unwrap())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    proptest::proptest! {
        #[test]
        fn memory_scan_returns_exactly_the_prefixed_keys(
            keys in proptest::collection::btree_set(proptest::collection::vec(0u8..4, 0..5), 0..24),
            prefix in proptest::collection::vec(0u8..4, 0..3),
        ) {
            let store = InMemoryKvStore::new();
            for key in &keys {
                store.put(key, key.clone()).unwrap();
            }
            let scanned: Vec<Vec<u8>> = store.scan_prefix(&prefix).unwrap().into_iter().map(|(k, _)| k).collect();
            let expected: Vec<Vec<u8>> = keys.iter().filter(|k| k.starts_with(&prefix)).cloned().collect();
            proptest::prop_assert_eq!(scanned, expected);
        }
    }
}
