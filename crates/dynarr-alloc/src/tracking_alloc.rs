use core::ptr::NonNull;

use parking_lot::Mutex;

use rustc_hash::FxHashMap;

use dynarr_mem::{Allocator, GlobalAlloc};

use dynarr_log::{error, trace, warn};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Block {
    size: usize,
    align: usize,
}

#[derive(Default)]
struct Ledger {
    live: FxHashMap<usize, Block>,
    stats: AllocStats,
    limit: Option<usize>,
    fail_after: Option<usize>,
}

/// Counters kept by a [`TrackingAlloc`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct AllocStats {
    /// Successful allocations.
    pub allocations: usize,
    pub frees: usize,
    /// Requests refused by the byte limit or by injected failures.
    pub refused: usize,
    pub live_blocks: usize,
    pub live_bytes: usize,
    pub peak_bytes: usize,
}

/// Wraps another [`Allocator`] and keeps a ledger of every block it hands out.
///
/// Freeing a block that is not live, or freeing it with a different size or
/// alignment, panics. Requests can be refused on purpose, either above a byte limit
/// or after a number of successful allocations.
pub struct TrackingAlloc<Alloc: Allocator = GlobalAlloc> {
    inner: Alloc,
    ledger: Mutex<Ledger>,
}

impl TrackingAlloc<GlobalAlloc> {

    #[inline(always)]
    pub fn new() -> Self {
        Self::wrap(GlobalAlloc)
    }
}

impl Default for TrackingAlloc<GlobalAlloc> {

    fn default() -> Self {
        Self::new()
    }
}

impl<Alloc: Allocator> TrackingAlloc<Alloc> {

    pub fn wrap(inner: Alloc) -> Self {
        Self {
            inner,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Refuses any request that would push live bytes above `bytes`.
    pub fn with_limit(self, bytes: usize) -> Self {
        self.set_limit(Some(bytes));
        self
    }

    pub fn set_limit(&self, bytes: Option<usize>) {
        self.ledger.lock().limit = bytes;
    }

    /// Lets the next `successes` allocations through and refuses every one after that,
    /// until [`clear_failures`](Self::clear_failures).
    pub fn fail_after(&self, successes: usize) {
        self.ledger.lock().fail_after = Some(successes);
    }

    pub fn clear_failures(&self) {
        self.ledger.lock().fail_after = None;
    }

    pub fn stats(&self) -> AllocStats {
        self.ledger.lock().stats
    }

    #[inline(always)]
    pub fn live_blocks(&self) -> usize {
        self.stats().live_blocks
    }

    #[inline(always)]
    pub fn live_bytes(&self) -> usize {
        self.stats().live_bytes
    }

    pub fn inner(&self) -> &Alloc {
        &self.inner
    }
}

unsafe impl<Alloc: Allocator> Allocator for TrackingAlloc<Alloc> {

    unsafe fn allocate_raw(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let mut ledger = self.ledger.lock();
        if ledger.fail_after == Some(0) {
            ledger.stats.refused += 1;
            warn!("injected allocation failure for {} bytes", size);
            return None
        }
        if let Some(limit) = ledger.limit {
            if ledger.stats.live_bytes.saturating_add(size) > limit {
                ledger.stats.refused += 1;
                warn!(
                    "allocation of {} bytes refused, {} of {} bytes live",
                    size, ledger.stats.live_bytes, limit,
                );
                return None
            }
        }
        let ptr = unsafe { self.inner.allocate_raw(size, align)? };
        if let Some(remaining) = ledger.fail_after.as_mut() {
            *remaining -= 1;
        }
        let ledger = &mut *ledger;
        ledger.live.insert(ptr.as_ptr() as usize, Block { size, align });
        let stats = &mut ledger.stats;
        stats.allocations += 1;
        stats.live_blocks += 1;
        stats.live_bytes += size;
        stats.peak_bytes = stats.peak_bytes.max(stats.live_bytes);
        trace!("allocated {} bytes at {:p}", size, ptr);
        Some(ptr)
    }

    unsafe fn free_raw(&self, ptr: NonNull<u8>, size: usize, align: usize) {
        let mut ledger = self.ledger.lock();
        let Some(block) = ledger.live.remove(&(ptr.as_ptr() as usize)) else {
            error!("free of {:p}, which is not a live block", ptr);
            panic!("double free or foreign pointer {:p}", ptr)
        };
        if block != (Block { size, align }) {
            error!(
                "block at {:p} freed as {} bytes aligned to {}, allocated as {} aligned to {}",
                ptr, size, align, block.size, block.align,
            );
            panic!("mismatched free of {:p}", ptr)
        }
        ledger.stats.frees += 1;
        ledger.stats.live_blocks -= 1;
        ledger.stats.live_bytes -= size;
        trace!("freed {} bytes at {:p}", size, ptr);
        unsafe { self.inner.free_raw(ptr, size, align) }
    }
}

impl<Alloc: Allocator> Drop for TrackingAlloc<Alloc> {

    fn drop(&mut self) {
        let ledger = self.ledger.get_mut();
        if !ledger.live.is_empty() {
            warn!(
                "tracking allocator dropped with {} live blocks ({} bytes)",
                ledger.stats.live_blocks, ledger.stats.live_bytes,
            );
        }
    }
}
