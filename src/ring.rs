//! Ring-slot cell: rotate writes across slots so readers never wait on a lock.

use std::fmt;
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use crate::slot::Slot;
use crate::sync::{backoff, AtomicUsize, Ordering};

/// Ring-slot atomic cell over `SLOTS` storage slots.
///
/// Readers take the published index, register on that slot, clone the handle
/// out and unregister; none of it ever touches a kernel lock. Writers rotate
/// a cursor over the remaining slots until they win an exclusive claim on
/// one, overwrite its handle, then publish the slot's index.
///
/// Progress contract: reads retry only while the published slot is caught in
/// a construction window, which a writer closes in a handful of instructions.
/// Writes retry until a free slot is won, so keep the number of concurrently
/// storing threads below `SLOTS - 1`; at or above that the store loop can
/// spin indefinitely. That bound is the caller's to respect, not enforced
/// here.
///
/// Values displaced from a slot stay alive for as long as any reader still
/// holds a clone of their handle.
pub struct RingCell<T, const SLOTS: usize = 4> {
    slots: Box<[CachePadded<Slot<T>>; SLOTS]>,
    /// Index of the slot advertised to readers. Only updated after the
    /// target slot's construction window has closed.
    published: CachePadded<AtomicUsize>,
    /// Rotating candidate index for writers, reduced mod `SLOTS` on use.
    cursor: CachePadded<AtomicUsize>,
}

impl<T, const SLOTS: usize> RingCell<T, SLOTS> {
    /// Create a cell holding `initial`.
    ///
    /// Every slot is seeded with a clone of the initial handle so storage is
    /// always a live `Arc`; readers can still only reach the published slot.
    ///
    /// # Panics
    /// Panics if `SLOTS < 2`: with a single slot the published slot is the
    /// only candidate and no store could ever complete.
    pub fn new(initial: Arc<T>) -> Self {
        assert!(SLOTS >= 2, "ring needs at least two slots");

        let mut v = Vec::with_capacity(SLOTS);
        for _ in 0..SLOTS {
            v.push(CachePadded::new(Slot::new(initial.clone())));
        }
        let slots: Box<[CachePadded<Slot<T>>; SLOTS]> = v
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| panic!("slot count mismatch"));

        RingCell {
            slots,
            published: CachePadded::new(AtomicUsize::new(0)),
            // Start candidates one past the published slot.
            cursor: CachePadded::new(AtomicUsize::new(1)),
        }
    }

    /// Create a cell holding `value` behind a fresh handle.
    pub fn from_value(value: T) -> Self {
        Self::new(Arc::new(value))
    }

    /// Install `value` as the new published handle.
    ///
    /// Never blocks on a lock; contended attempts retry on another slot.
    pub fn store(&self, value: Arc<T>) {
        let mut spin = 0usize;
        loop {
            let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % SLOTS;
            let slot = &self.slots[idx];

            // Provisional interest first, so a concurrent claim on this slot
            // sees us and fails its exactly-one CAS.
            if !slot.usage.register() {
                slot.usage.unregister();
                spin = backoff(spin);
                continue;
            }

            // Never construct on the slot advertised to readers. The check
            // goes through the same atomic the readers load.
            if idx == self.published.load(Ordering::Acquire) {
                slot.usage.unregister();
                spin = backoff(spin);
                continue;
            }

            if !slot.usage.try_claim() {
                // Somebody else registered in the meantime.
                slot.usage.unregister();
                spin = backoff(spin);
                continue;
            }

            // Exclusive window: sole owner of this slot's storage.
            // SAFETY: `try_claim` succeeded, so no reader is registered here
            // and no other writer can claim until `end_claim`.
            unsafe { slot.replace_handle(value) };

            // Close the window before publishing; the Release in `end_claim`
            // orders the handle write ahead of it.
            slot.usage.end_claim();
            self.published.store(idx, Ordering::Release);
            slot.usage.unregister();
            return;
        }
    }

    /// Clone out the most recently published handle.
    ///
    /// The returned handle is always a complete value that was published at
    /// some point during the call; it is never torn and never observes a
    /// slot mid-construction.
    pub fn load(&self) -> Arc<T> {
        let mut spin = 0usize;
        loop {
            let idx = self.published.load(Ordering::Acquire);
            let slot = &self.slots[idx];

            if slot.usage.register() {
                // SAFETY: registration succeeded while no construction
                // window was open, and it holds any new claim off the slot
                // until we unregister.
                let value = unsafe { slot.clone_handle() };
                slot.usage.unregister();
                return value;
            }

            // A writer claimed this slot after publishing moved on, or is
            // about to re-publish it; drop out and re-read the index.
            slot.usage.unregister();
            spin = backoff(spin);
        }
    }

    /// Number of storage slots in the ring.
    pub const fn slots(&self) -> usize {
        SLOTS
    }
}

impl<T: Default, const SLOTS: usize> Default for RingCell<T, SLOTS> {
    fn default() -> Self {
        Self::from_value(T::default())
    }
}

impl<T, const SLOTS: usize> fmt::Debug for RingCell<T, SLOTS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingCell")
            .field("slots", &SLOTS)
            .field("published", &self.published.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
