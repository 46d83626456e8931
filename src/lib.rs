//! ring_arc - ring-slot atomic cell for shared `Arc<T>` values
//!
//! Many readers sample a shared value without ever taking a kernel lock
//! while a small number of writers replace it. [`RingCell`] rotates writes
//! across a fixed set of slots, each guarded by a one-counter state machine,
//! so the slot being read is never the slot being overwritten. [`MutexCell`]
//! is the serialized baseline kept for comparison.
//!
//! Readers always get a complete, never-partially-constructed handle, and a
//! value lives exactly as long as some slot or reader still holds it.
#![warn(missing_docs)]

mod mutex;
mod ring;
mod slot;
mod sync;

pub use mutex::MutexCell;
pub use ring::RingCell;
