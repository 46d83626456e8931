//! Baseline cell: one handle behind a mutex, kept as the correctness and
//! performance reference point for [`RingCell`](crate::RingCell).

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mutex-guarded atomic cell.
///
/// Strictly serialized: every `load` blocks every `store` and every other
/// `load`. Trivially correct, with no further algorithmic content.
pub struct MutexCell<T> {
    value: Mutex<Arc<T>>,
}

impl<T> MutexCell<T> {
    /// Create a cell holding `initial`.
    pub fn new(initial: Arc<T>) -> Self {
        MutexCell {
            value: Mutex::new(initial),
        }
    }

    /// Create a cell holding `value` behind a fresh handle.
    pub fn from_value(value: T) -> Self {
        Self::new(Arc::new(value))
    }

    /// Replace the current handle.
    pub fn store(&self, value: Arc<T>) {
        *self.lock() = value;
    }

    /// Clone out the current handle.
    pub fn load(&self) -> Arc<T> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Arc<T>> {
        // Nothing that runs under the lock can leave the cell inconsistent,
        // so a poisoned lock is still safe to reuse.
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Default> Default for MutexCell<T> {
    fn default() -> Self {
        Self::from_value(T::default())
    }
}

impl<T> fmt::Debug for MutexCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexCell").finish_non_exhaustive()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn smoke() {
        let cell = MutexCell::from_value(42);
        assert_eq!(*cell.load(), 42);
        cell.store(Arc::new(7));
        assert_eq!(*cell.load(), 7);
    }
}
