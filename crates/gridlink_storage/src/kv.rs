//! Key-value store trait definition.

use crate::error::StorageResult;

/// A byte-oriented key-value client.
///
/// # Invariants
///
/// - Each method is atomic with respect to the single key it touches
/// - Nothing is atomic across keys
/// - `scan_prefix` returns entries in ascending key order
/// - Implementations must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryKvStore`] - For testing and embedded use
pub trait KvStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn put(&self, key: &[u8], value: Vec<u8>) -> StorageResult<()>;

    /// Stores `value` only if `key` is absent.
    ///
    /// Returns `true` if the value was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn put_if_absent(&self, key: &[u8], value: Vec<u8>) -> StorageResult<bool>;

    /// Atomically replaces the value under `key` if it currently equals
    /// `expected`.
    ///
    /// `expected = None` means "key must be absent"; `new = None` deletes the
    /// key. Returns `true` if the swap was applied, `false` on a mismatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails. A mismatch is not an error.
    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<Vec<u8>>,
    ) -> StorageResult<bool>;

    /// Deletes `key`. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn delete(&self, key: &[u8]) -> StorageResult<bool>;

    /// Returns every entry whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;
}
