//! Atomics and backoff, switchable to loom's checked versions.
//!
//! Building with `RUSTFLAGS="--cfg loom"` routes every atomic the cells touch
//! through loom so the model checker sees them.

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};

#[cfg(not(loom))]
const SPIN_LIMIT: usize = 64;

/// Lighter backoff: spin a bit then yield.
#[cfg(not(loom))]
#[inline(always)]
pub(crate) fn backoff(mut spin: usize) -> usize {
    if spin < SPIN_LIMIT {
        spin += 1;
        core::hint::spin_loop();
    } else {
        std::thread::yield_now();
    }
    spin
}

/// Under loom, every retry must be a yield so the scheduler can make progress.
#[cfg(loom)]
#[inline(always)]
pub(crate) fn backoff(spin: usize) -> usize {
    loom::thread::yield_now();
    spin
}
