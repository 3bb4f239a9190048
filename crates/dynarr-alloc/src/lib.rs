//! Allocation strategies for [`DynamicArray`](dynarr_mem::DynamicArray) beyond the
//! process heap.
//!
//! - [`ArenaAlloc`]: a fixed bump region, with [`ArenaGuard`] scopes that roll back.
//! - [`TrackingAlloc`]: wraps another strategy, records every live block, rejects
//!   double frees and can inject allocation failures.

mod arena_alloc;
mod tracking_alloc;

pub use arena_alloc::{ArenaAlloc, ArenaGuard};
pub use tracking_alloc::{TrackingAlloc, AllocStats};
