//! Atomic id generation.
//!
//! A counter is created with its initial value on first access and
//! incremented atomically afterwards; both steps are single atomic backend
//! operations. Backends without a native atomic counter drive
//! [`next_value_with_cas`] over a [`CounterStore`].

use crate::error::{DialectError, DialectResult};
use crate::key::IdSourceKey;
use std::hint;
use std::thread;
use tracing::trace;

/// Lost races before [`backoff`] starts yielding the thread.
const SPIN_ATTEMPTS: u32 = 6;

/// Waits after the `attempt`-th lost compare-and-set race.
///
/// Early attempts spin for an exponentially growing number of iterations;
/// later ones yield to the scheduler so the winner can finish.
pub fn backoff(attempt: u32) {
    if attempt <= SPIN_ATTEMPTS {
        for _ in 0..(1u32 << attempt) {
            hint::spin_loop();
        }
    } else {
        thread::yield_now();
    }
}

/// A request for the next value of a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextValueRequest {
    key: IdSourceKey,
    increment: i32,
    initial_value: i64,
}

impl NextValueRequest {
    /// Creates a request. The first call on a fresh counter returns
    /// `initial_value`; every later call adds `increment`.
    #[must_use]
    pub fn new(key: IdSourceKey, increment: i32, initial_value: i64) -> Self {
        Self {
            key,
            increment,
            initial_value,
        }
    }

    /// Returns the counter key.
    #[must_use]
    pub fn key(&self) -> &IdSourceKey {
        &self.key
    }

    /// Returns the increment.
    #[must_use]
    pub fn increment(&self) -> i32 {
        self.increment
    }

    /// Returns the initial value.
    #[must_use]
    pub fn initial_value(&self) -> i64 {
        self.initial_value
    }
}

/// Minimal atomic primitives over stored counters.
pub trait CounterStore {
    /// Reads the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn load(&self, key: &IdSourceKey) -> DialectResult<Option<i64>>;

    /// Stores `value` if the counter does not exist. Returns `true` if stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn create_if_absent(&self, key: &IdSourceKey, value: i64) -> DialectResult<bool>;

    /// Replaces `expected` by `new`. Returns `true` if the swap was applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn compare_and_set(&self, key: &IdSourceKey, expected: i64, new: i64) -> DialectResult<bool>;
}

/// Returns the next value of a counter using compare-and-set.
///
/// The stored value is always the next value to hand out. A fresh counter is
/// created holding `initial + increment` and the call returns `initial`.
/// Otherwise the stored value `v` is swapped for `v + increment` and `v` is
/// returned, retrying on contention.
///
/// # Errors
///
/// Returns [`DialectError::IdGeneration`] after `max_attempts` lost races or
/// if the counter would overflow. Backend failures propagate unchanged.
pub fn next_value_with_cas<C: CounterStore + ?Sized>(
    store: &C,
    request: &NextValueRequest,
    max_attempts: u32,
) -> DialectResult<i64> {
    let key = request.key();
    let increment = i64::from(request.increment());
    let overflow = || DialectError::id_generation(key, "counter overflow");

    let initial = request.initial_value();
    let after_initial = initial.checked_add(increment).ok_or_else(overflow)?;

    for attempt in 1..=max_attempts {
        match store.load(key)? {
            None => {
                if store.create_if_absent(key, after_initial)? {
                    trace!(%key, value = initial, "counter created");
                    return Ok(initial);
                }
            }
            Some(current) => {
                let next = current.checked_add(increment).ok_or_else(overflow)?;
                if store.compare_and_set(key, current, next)? {
                    return Ok(current);
                }
            }
        }
        trace!(%key, attempt, "counter update lost a race");
        backoff(attempt);
    }

    Err(DialectError::id_generation(
        key,
        format!("gave up after {max_attempts} compare-and-set attempts"),
    ))
}
