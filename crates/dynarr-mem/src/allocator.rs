use core::{
    alloc::Layout,
    ptr::NonNull,
};

/// Allocation strategy used by [`DynamicArray`](crate::DynamicArray).
///
/// Implementors hand out raw blocks and take them back. Containers never request
/// zero-sized blocks and always free a block with the same size and alignment it
/// was allocated with.
///
/// # Safety
/// A block returned from [`allocate_raw`](Allocator::allocate_raw) must be valid for
/// reads and writes of `size` bytes, aligned to `align`, and must not overlap any
/// other live block handed out by the same allocator.
pub unsafe trait Allocator {

    /// Returns a block of `size` bytes aligned to `align`, or `None` when the request
    /// cannot be served.
    ///
    /// # Safety
    /// `size` must be non-zero and `align` a power of two.
    unsafe fn allocate_raw(&self, size: usize, align: usize) -> Option<NonNull<u8>>;

    /// Returns a block previously obtained from [`allocate_raw`](Allocator::allocate_raw).
    ///
    /// # Safety
    /// `ptr`, `size` and `align` must describe a live block of this allocator.
    unsafe fn free_raw(&self, ptr: NonNull<u8>, size: usize, align: usize);

    /// Allocates uninitialized storage for `count` values of `T`.
    ///
    /// # Safety
    /// `count * size_of::<T>()` must be non-zero.
    unsafe fn allocate_uninit<T>(&self, count: usize) -> Option<NonNull<T>> {
        let layout = Layout::array::<T>(count).ok()?;
        unsafe {
            self.allocate_raw(layout.size(), layout.align())
                .map(|ptr| ptr.cast::<T>())
        }
    }

    /// # Safety
    /// `ptr` must come from [`allocate_uninit`](Allocator::allocate_uninit) with the
    /// same `T` and `count`.
    unsafe fn free_uninit<T>(&self, ptr: NonNull<T>, count: usize) {
        let Ok(layout) = Layout::array::<T>(count) else {
            return
        };
        unsafe { self.free_raw(ptr.cast::<u8>(), layout.size(), layout.align()) }
    }
}

unsafe impl<Alloc: Allocator + ?Sized> Allocator for &Alloc {

    #[inline(always)]
    unsafe fn allocate_raw(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        unsafe { (**self).allocate_raw(size, align) }
    }

    #[inline(always)]
    unsafe fn free_raw(&self, ptr: NonNull<u8>, size: usize, align: usize) {
        unsafe { (**self).free_raw(ptr, size, align) }
    }
}
