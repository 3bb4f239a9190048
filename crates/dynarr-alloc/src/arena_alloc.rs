use std::alloc::{alloc, dealloc, Layout};

use core::{
    mem,
    cell::UnsafeCell,
    ptr::NonNull,
};

use dynarr_mem::{Allocator, align_up};

use dynarr_log::{trace, warn};

struct Cell {
    pos: usize,
    guard_active: bool,
}

/// A fixed region handing out blocks by bumping an offset.
///
/// Freeing only reclaims the most recent block; everything else is reclaimed by
/// [`clear`](Self::clear) or when an [`ArenaGuard`] goes out of scope. Requests that do
/// not fit fail instead of falling back to the heap.
pub struct ArenaAlloc {
    data: NonNull<u8>,
    size: usize,
    cell: UnsafeCell<Cell>,
}

impl ArenaAlloc {

    pub fn new(size: usize) -> Option<Self> {
        if size == 0 {
            return None
        }
        let layout = Layout::from_size_align(size, mem::align_of::<usize>()).ok()?;
        let ptr = unsafe { alloc(layout) };
        Some(
            Self {
                data: NonNull::new(ptr)?,
                size,
                cell: UnsafeCell::new(Cell {
                    pos: 0,
                    guard_active: false,
                }),
            }
        )
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn used(&self) -> usize {
        unsafe { self.cell().pos }
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.size - self.used()
    }

    #[inline(always)]
    pub fn full(&self) -> bool {
        self.used() >= self.size
    }

    /// Resets the bump offset to 0.
    ///
    /// Taking `&mut self` guarantees no container still borrows the arena.
    #[inline(always)]
    pub fn clear(&mut self) {
        let cell = self.cell.get_mut();
        assert!(!cell.guard_active, "attempting to clear while guard is active");
        cell.pos = 0;
    }

    #[inline(always)]
    unsafe fn cell(&self) -> &mut Cell {
        unsafe { &mut *self.cell.get() }
    }

    unsafe fn allocate_raw_internal(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let base = self.data.as_ptr() as usize;
        let start = base + self.used();
        let aligned_start = align_up(start, align);
        let end = aligned_start.checked_add(size)?;
        if end > base + self.size {
            warn!("arena exhausted: {} bytes requested, {} of {} remaining", size, self.remaining(), self.size);
            return None
        }
        unsafe { self.cell().pos = end - base; }
        trace!("arena block of {} bytes at offset {}", size, aligned_start - base);
        NonNull::new(aligned_start as *mut u8)
    }

    unsafe fn free_raw_internal(&self, ptr: NonNull<u8>, size: usize) {
        let base = self.data.as_ptr() as usize;
        let offset = ptr.as_ptr() as usize - base;
        unsafe {
            let cell = self.cell();
            if offset + size == cell.pos {
                cell.pos = offset;
            }
        }
    }
}

unsafe impl Allocator for ArenaAlloc {

    #[inline(always)]
    unsafe fn allocate_raw(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        unsafe {
            if self.cell().guard_active {
                warn!("arena refused {} bytes, allocate through the active guard", size);
                return None
            }
            self.allocate_raw_internal(size, align)
        }
    }

    #[inline(always)]
    unsafe fn free_raw(&self, ptr: NonNull<u8>, size: usize, _align: usize) {
        unsafe { self.free_raw_internal(ptr, size) }
    }
}

impl Drop for ArenaAlloc {

    fn drop(&mut self) {
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.size, mem::align_of::<usize>());
            dealloc(self.data.as_ptr(), layout);
        }
    }
}

/// Scope over an [`ArenaAlloc`] that rolls the arena back to where it started on drop.
///
/// While a guard is alive, the arena itself refuses every request, so containers
/// allocating from it directly get a [`CapacityError`](dynarr_mem::CapacityError).
/// Creating a second guard at the same time panics.
pub struct ArenaGuard<'a> {
    pos_rollback: usize,
    arena: &'a ArenaAlloc,
}

impl<'a> ArenaGuard<'a> {

    #[inline(always)]
    pub fn new(arena: &'a ArenaAlloc) -> Self {
        unsafe {
            let cell = arena.cell();
            assert!(!cell.guard_active, "attempting to create concurrent guards");
            cell.guard_active = true;
        }
        let pos_rollback = arena.used();
        Self {
            arena,
            pos_rollback,
        }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.arena.size()
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.arena.remaining()
    }
}

unsafe impl<'a> Allocator for ArenaGuard<'a> {

    #[inline(always)]
    unsafe fn allocate_raw(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        unsafe { self.arena.allocate_raw_internal(size, align) }
    }

    #[inline(always)]
    unsafe fn free_raw(&self, ptr: NonNull<u8>, size: usize, _align: usize) {
        unsafe { self.arena.free_raw_internal(ptr, size) }
    }
}

impl<'a> Drop for ArenaGuard<'a> {

    fn drop(&mut self) {
        unsafe {
            let cell = self.arena.cell();
            cell.pos = self.pos_rollback;
            cell.guard_active = false;
        }
    }
}
