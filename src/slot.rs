//! Per-slot state: the usage counter state machine and the handle storage.

use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::sync::{AtomicUsize, Ordering};

/// Usage values at or above this mark an exclusive construction window.
///
/// Far above any realistic number of simultaneous registrations, so the
/// shared and exclusive regimes of the counter can never collide.
pub(crate) const EXCLUSIVE: usize = usize::MAX / 2;

/// One-counter state machine guarding a slot: `Free` (0), `Shared(n)`
/// (`1..EXCLUSIVE`), or `Exclusive` (`>= EXCLUSIVE`).
///
/// Exclusivity can only be entered through [`Usage::try_claim`], which
/// requires the caller to be the sole registered holder. That single CAS is
/// what keeps an in-flight reader and an overwriting writer off the same
/// slot at the same time.
pub(crate) struct Usage(AtomicUsize);

impl Usage {
    pub(crate) fn new() -> Self {
        Usage(AtomicUsize::new(0))
    }

    /// Add one shared holder. Returns `false` if the slot was observed in an
    /// exclusive construction window, in which case the caller must
    /// [`unregister`](Usage::unregister) and back off without touching the
    /// slot's storage.
    ///
    /// `Acquire` pairs with the `Release` in [`end_claim`](Usage::end_claim):
    /// a holder admitted after a construction window closed sees the handle
    /// written inside it.
    pub(crate) fn register(&self) -> bool {
        self.0.fetch_add(1, Ordering::Acquire) < EXCLUSIVE
    }

    /// Drop one shared holder.
    ///
    /// `Release` pairs with the `AcqRel` CAS in [`try_claim`](Usage::try_claim):
    /// whatever this holder did with the slot's storage happens-before the
    /// next exclusive overwrite.
    pub(crate) fn unregister(&self) {
        let prev = self.0.fetch_sub(1, Ordering::Release);
        debug_assert!(prev >= 1, "unregister without a matching register");
    }

    /// Try to upgrade a sole shared holder to the exclusive construction
    /// window. Fails when anyone else is registered, spuriously included;
    /// the caller retries with a different slot either way.
    pub(crate) fn try_claim(&self) -> bool {
        self.0
            .compare_exchange_weak(1, EXCLUSIVE + 1, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Close the construction window, downgrading back to a sole shared
    /// holder. The slot's new handle must be in place before this call; the
    /// `Release` makes it visible to every holder admitted afterwards.
    pub(crate) fn end_claim(&self) {
        let prev = self.0.fetch_sub(EXCLUSIVE, Ordering::Release);
        debug_assert!(prev >= EXCLUSIVE, "end_claim outside a construction window");
    }
}

/// One ring slot: a shared handle plus the counter that guards it.
pub(crate) struct Slot<T> {
    pub(crate) usage: Usage,
    value: UnsafeCell<Arc<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new(handle: Arc<T>) -> Self {
        Slot {
            usage: Usage::new(),
            value: UnsafeCell::new(handle),
        }
    }

    /// Clone the stored handle.
    ///
    /// # Safety
    /// The caller must hold a shared registration on `usage` for the whole
    /// call, so no exclusive overwrite can run concurrently.
    pub(crate) unsafe fn clone_handle(&self) -> Arc<T> {
        (*self.value.get()).clone()
    }

    /// Replace the stored handle, dropping the displaced one in place.
    ///
    /// # Safety
    /// The caller must hold the exclusive claim on `usage`; nothing else may
    /// be reading or writing the storage.
    pub(crate) unsafe fn replace_handle(&self, handle: Arc<T>) {
        *self.value.get() = handle;
    }
}

// SAFETY: the usage protocol serializes every access to `value`; handles are
// cloned out rather than borrowed, and `Arc<T>` crossing threads needs
// `T: Send + Sync`.
unsafe impl<T: Send + Sync> Send for Slot<T> {}
unsafe impl<T: Send + Sync> Sync for Slot<T> {}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn register_then_claim() {
        let usage = Usage::new();
        assert!(usage.register());
        assert!(usage.try_claim());
        usage.end_claim();
        usage.unregister();
    }

    #[test]
    fn claim_requires_sole_holder() {
        let usage = Usage::new();
        assert!(usage.register());
        assert!(usage.register());
        // Two holders: the exactly-one CAS must not go through.
        assert!(!usage.try_claim());
        usage.unregister();
        usage.unregister();
    }

    #[test]
    fn register_blocked_during_claim() {
        let usage = Usage::new();
        assert!(usage.register());
        assert!(usage.try_claim());
        assert!(!usage.register());
        usage.unregister();
        usage.end_claim();
        usage.unregister();
    }

    #[test]
    fn end_claim_restores_shared() {
        let usage = Usage::new();
        assert!(usage.register());
        assert!(usage.try_claim());
        usage.end_claim();
        assert!(usage.register());
        usage.unregister();
        usage.unregister();
    }
}

#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;

    /// No two threads may hold the construction window at once.
    #[test]
    fn loom_claim_is_exclusive() {
        loom::model(|| {
            let usage = Arc::new(Usage::new());
            let inside = Arc::new(AtomicUsize::new(0));

            let mut handles = vec![];
            for _ in 0..2 {
                let usage = usage.clone();
                let inside = inside.clone();
                handles.push(loom::thread::spawn(move || {
                    if usage.register() && usage.try_claim() {
                        assert_eq!(inside.fetch_add(1, Ordering::AcqRel), 0);
                        inside.fetch_sub(1, Ordering::AcqRel);
                        usage.end_claim();
                        usage.unregister();
                        return;
                    }
                    usage.unregister();
                }));
            }

            for h in handles {
                h.join().unwrap();
            }
        });
    }
}
