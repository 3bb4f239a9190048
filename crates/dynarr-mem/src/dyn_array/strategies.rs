use core::{
    mem::{self, ManuallyDrop},
    ptr::NonNull,
};

use crate::{
    allocator::Allocator,
    errors::CapacityError,
};

use CapacityError::{AllocFailed, CapacityOverflow};

/// Allocates room for `capacity` values of `T`.
///
/// Zero capacity and zero-sized `T` never reach the allocator and yield a dangling pointer.
pub(crate) fn allocate_slots<T, Alloc: Allocator>(
    alloc: &Alloc,
    capacity: usize,
) -> Result<NonNull<T>, CapacityError>
{
    if capacity == 0 || mem::size_of::<T>() == 0 {
        return Ok(NonNull::dangling())
    }
    if core::alloc::Layout::array::<T>(capacity).is_err() {
        return Err(CapacityOverflow { requested: capacity })
    }
    unsafe { alloc.allocate_uninit(capacity) }
        .ok_or(AllocFailed { new_capacity: capacity })
}

/// # Safety
/// `data` and `capacity` must come from [`allocate_slots`] with the same allocator.
pub(crate) unsafe fn free_slots<T, Alloc: Allocator>(
    alloc: &Alloc,
    data: NonNull<T>,
    capacity: usize,
) {
    if capacity == 0 || mem::size_of::<T>() == 0 {
        return
    }
    unsafe { alloc.free_uninit(data, capacity) }
}

/// # Safety
/// `src` must hold `len` initialized values, `dst` must have room for `len` values and
/// the ranges must not overlap. The values in `src` are logically moved out.
#[inline(always)]
pub(crate) unsafe fn move_elements<T>(src: NonNull<T>, dst: NonNull<T>, len: usize) {
    unsafe { src.copy_to_nonoverlapping(dst, len) }
}

/// # Safety
/// `ptr` must hold `len` initialized values that are not used afterwards.
#[inline(always)]
pub(crate) unsafe fn drop_in_place<T>(ptr: NonNull<T>, len: usize) {
    if mem::needs_drop::<T>() {
        unsafe {
            core::ptr::drop_in_place(core::ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len));
        }
    }
}

/// Owns a block and frees it when dropped, including while unwinding out of a
/// panicking `T::drop`.
pub(crate) struct FreeOnDrop<'a, T, Alloc: Allocator> {
    alloc: &'a Alloc,
    data: NonNull<T>,
    capacity: usize,
}

impl<'a, T, Alloc: Allocator> FreeOnDrop<'a, T, Alloc> {

    /// # Safety
    /// `data` and `capacity` must come from [`allocate_slots`] with `alloc`, and the block
    /// must not be used after the guard is dropped.
    #[inline(always)]
    pub unsafe fn new(alloc: &'a Alloc, data: NonNull<T>, capacity: usize) -> Self {
        Self {
            alloc,
            data,
            capacity,
        }
    }
}

impl<'a, T, Alloc: Allocator> Drop for FreeOnDrop<'a, T, Alloc> {

    #[inline(always)]
    fn drop(&mut self) {
        unsafe { free_slots(self.alloc, self.data, self.capacity) }
    }
}

/// A freshly allocated buffer that is being filled front to back.
///
/// If filling unwinds, the written prefix is dropped and the buffer freed, so a
/// panicking constructor or `clone` never leaks.
pub(crate) struct FillGuard<'a, T, Alloc: Allocator> {
    alloc: &'a Alloc,
    data: NonNull<T>,
    capacity: usize,
    len: usize,
}

impl<'a, T, Alloc: Allocator> FillGuard<'a, T, Alloc> {

    pub fn new(alloc: &'a Alloc, capacity: usize) -> Result<Self, CapacityError> {
        let data = allocate_slots(alloc, capacity)?;
        Ok(Self {
            alloc,
            data,
            capacity,
            len: 0,
        })
    }

    /// # Safety
    /// Must be called at most `capacity` times.
    #[inline(always)]
    pub unsafe fn write(&mut self, value: T) {
        debug_assert!(self.len < self.capacity);
        unsafe { self.data.add(self.len).write(value) };
        self.len += 1;
    }

    /// Hands the buffer over, returning its pointer, capacity and filled length.
    #[inline(always)]
    pub fn finish(self) -> (NonNull<T>, usize, usize) {
        let this = ManuallyDrop::new(self);
        (this.data, this.capacity, this.len)
    }
}

impl<'a, T, Alloc: Allocator> Drop for FillGuard<'a, T, Alloc> {

    fn drop(&mut self) {
        unsafe {
            let _block = FreeOnDrop::new(self.alloc, self.data, self.capacity);
            drop_in_place(self.data, self.len);
        }
    }
}
