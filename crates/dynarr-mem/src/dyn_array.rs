//! [`DynamicArray`], a contiguous growable array over a pluggable [`Allocator`].
//!
//! The buffer is split in two parts: slots `[0, size)` hold live values and slots
//! `[size, capacity)` are reserved, uninitialized memory. `capacity == 0` always means
//! that no block is held from the allocator.
//!
//! Every operation that needs a new block allocates it before touching the current
//! one, so a [`CapacityError`] leaves the array exactly as it was.

mod iter;
mod strategies;

use core::{
    marker::PhantomData,
    mem,
    ops::{Deref, DerefMut, Index, IndexMut},
    ptr::NonNull,
    slice::{self, SliceIndex},
};

use crate::{
    allocator::Allocator,
    errors::CapacityError,
    global_alloc::GlobalAlloc,
    const_assert,
    size_of,
};

pub use iter::{Iter, IterMut};

use strategies::{
    FillGuard,
    FreeOnDrop,
    allocate_slots,
    move_elements,
    drop_in_place,
};

use CapacityError::CapacityOverflow;

/// A contiguous, growable array of `T` whose memory comes from `Alloc`.
///
/// Appending grows the capacity from 0 to 1 and doubles it afterwards. Capacity never
/// shrinks on its own, see [`set_capacity`](Self::set_capacity) and
/// [`shrink_to_fit`](Self::shrink_to_fit).
///
/// Copies made with [`try_clone`](Self::try_clone) or [`Clone`] keep the source's
/// capacity, not only its size.
///
/// The array is `Send`/`Sync` when `T` and `Alloc` are. Sharing one array between
/// threads for mutation needs external synchronization.
pub struct DynamicArray<T, Alloc: Allocator = GlobalAlloc> {
    data: NonNull<T>,
    capacity: usize,
    size: usize,
    alloc: Alloc,
    _marker: PhantomData<T>,
}

const_assert!(size_of!(DynamicArray<u32>) == size_of!(Option<DynamicArray<u32>>));

unsafe impl<T: Send, Alloc: Allocator + Send> Send for DynamicArray<T, Alloc> {}
unsafe impl<T: Sync, Alloc: Allocator + Sync> Sync for DynamicArray<T, Alloc> {}

impl<T> DynamicArray<T, GlobalAlloc> {

    /// Creates an empty array without allocating.
    #[inline(always)]
    pub const fn new() -> Self {
        Self::new_in(GlobalAlloc)
    }

    /// Creates an array of `size` default values, with `capacity == size`.
    pub fn with_size(size: usize) -> Result<Self, CapacityError>
        where
            T: Default
    {
        Self::with_size_in(size, GlobalAlloc)
    }

    pub fn with_capacity(capacity: usize) -> Result<Self, CapacityError> {
        Self::with_capacity_in(capacity, GlobalAlloc)
    }
}

impl<T, Alloc: Allocator> DynamicArray<T, Alloc> {

    #[inline(always)]
    pub const fn new_in(alloc: Alloc) -> Self {
        Self {
            data: NonNull::dangling(),
            capacity: 0,
            size: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Creates an empty array owning exactly `capacity` reserved slots.
    pub fn with_capacity_in(
        capacity: usize,
        alloc: Alloc,
    ) -> Result<Self, CapacityError>
    {
        let data = allocate_slots::<T, Alloc>(&alloc, capacity)?;
        Ok(Self {
            data,
            capacity,
            size: 0,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Creates an array of `size` default values, with `capacity == size`.
    pub fn with_size_in(
        size: usize,
        alloc: Alloc,
    ) -> Result<Self, CapacityError>
        where
            T: Default
    {
        Self::with_size_with_in(size, T::default, alloc)
    }

    /// Creates an array of `size` values produced by `f`, with `capacity == size`.
    pub fn with_size_with_in<F>(
        size: usize,
        mut f: F,
        alloc: Alloc,
    ) -> Result<Self, CapacityError>
        where
            F: FnMut() -> T,
    {
        let mut guard = FillGuard::new(&alloc, size)?;
        for _ in 0..size {
            unsafe { guard.write(f()) };
        }
        let (data, capacity, size) = guard.finish();
        Ok(Self {
            data,
            capacity,
            size,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Copies the array into a new buffer from a clone of its allocator.
    ///
    /// The copy has the same capacity as `self`. Reserved slots stay uninitialized.
    pub fn try_clone(&self) -> Result<Self, CapacityError>
        where
            T: Clone,
            Alloc: Clone,
    {
        let alloc = self.alloc.clone();
        let (data, capacity, size) = self.clone_buffer(&alloc)?;
        Ok(Self {
            data,
            capacity,
            size,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Replaces the contents of `self` with a copy of `source`.
    ///
    /// The copy is built in a new buffer from `self`'s allocator before the old values
    /// are dropped, so on error `self` is untouched. Afterwards `self` has the same
    /// size, capacity and values as `source`.
    pub fn try_clone_from(&mut self, source: &Self) -> Result<(), CapacityError>
        where
            T: Clone,
    {
        let (data, capacity, size) = source.clone_buffer(&self.alloc)?;
        self.release();
        self.data = data;
        self.capacity = capacity;
        self.size = size;
        Ok(())
    }

    /// Drops the contents of `self` and takes over the buffer and allocator of `source`.
    ///
    /// `source` is left empty, with no buffer, holding the allocator `self` had.
    pub fn move_from(&mut self, source: &mut Self) {
        self.release();
        mem::swap(self, source);
    }

    /// Moves the buffer out, leaving `self` empty with a clone of its allocator.
    pub fn take(&mut self) -> Self
        where
            Alloc: Clone,
    {
        let alloc = self.alloc.clone();
        mem::replace(self, Self::new_in(alloc))
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` when there are no live values, whatever the capacity.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline(always)]
    pub fn allocator(&self) -> &Alloc {
        &self.alloc
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_ptr()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.size) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.size) }
    }

    /// Returns the value at `index` without bounds checking.
    ///
    /// # Safety
    /// `index` must be less than [`size`](Self::size).
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.size);
        unsafe { self.data.add(index).as_ref() }
    }

    /// # Safety
    /// `index` must be less than [`size`](Self::size).
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.size);
        unsafe { self.data.add(index).as_mut() }
    }

    #[inline(always)]
    pub fn iter(&self) -> Iter<'_, T> {
        unsafe { Iter::new(self.data, self.size) }
    }

    #[inline(always)]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        unsafe { IterMut::new(self.data, self.size) }
    }

    /// Appends `value`, doubling the capacity first when the array is full.
    #[inline(always)]
    pub fn push_back(&mut self, value: T) -> Result<&mut T, CapacityError> {
        self.emplace_back(|| value)
    }

    /// Appends the value returned by `f`, constructed directly in the next free slot.
    ///
    /// `f` only runs once room for the value is secured, so it is not called when
    /// growing fails.
    pub fn emplace_back<F>(&mut self, f: F) -> Result<&mut T, CapacityError>
        where
            F: FnOnce() -> T,
    {
        if self.size == self.capacity {
            self.grow()?
        }
        let mut ptr = unsafe { self.data.add(self.size) };
        unsafe { ptr.write(f()) };
        self.size += 1;
        Ok(unsafe { ptr.as_mut() })
    }

    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        if self.size == 0 {
            return None
        }
        self.size -= 1;
        Some(unsafe { self.data.add(self.size).read() })
    }

    /// Drops every live value. The buffer is kept for reuse.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.truncate(0)
    }

    /// Reallocates to exactly `capacity` slots.
    ///
    /// Values at `capacity` and beyond are dropped and the size shrinks to match.
    /// New trailing slots are left uninitialized, use [`set_size`](Self::set_size) to
    /// fill them. A capacity of 0 releases the buffer.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), CapacityError> {
        if capacity == self.capacity {
            return Ok(())
        }
        let data = allocate_slots::<T, Alloc>(&self.alloc, capacity)?;
        let kept = self.size.min(capacity);
        let (old_data, old_capacity, old_size) = (self.data, self.capacity, self.size);
        unsafe { move_elements(old_data, data, kept) };
        self.data = data;
        self.capacity = capacity;
        self.size = kept;
        unsafe {
            let _old = FreeOnDrop::new(&self.alloc, old_data, old_capacity);
            drop_in_place(old_data.add(kept), old_size - kept);
        }
        Ok(())
    }

    /// Resizes to `size` live values, filling new slots with `T::default()`.
    ///
    /// Shrinking drops the tail and keeps the capacity. Growing past the capacity
    /// reallocates to exactly `size` slots first.
    pub fn set_size(&mut self, size: usize) -> Result<(), CapacityError>
        where
            T: Default
    {
        self.set_size_with(size, T::default)
    }

    /// Same as [`set_size`](Self::set_size), filling new slots with values from `f`.
    pub fn set_size_with<F>(&mut self, size: usize, mut f: F) -> Result<(), CapacityError>
        where
            F: FnMut() -> T,
    {
        if size <= self.size {
            self.truncate(size);
            return Ok(())
        }
        if size > self.capacity {
            self.set_capacity(size)?
        }
        while self.size < size {
            unsafe { self.data.add(self.size).write(f()) };
            self.size += 1;
        }
        Ok(())
    }

    /// Reallocates so that the capacity equals the size.
    pub fn shrink_to_fit(&mut self) -> Result<(), CapacityError> {
        if self.size == self.capacity {
            return Ok(())
        }
        self.set_capacity(self.size)
    }

    fn grow(&mut self) -> Result<(), CapacityError> {
        let new_capacity =
            if self.capacity == 0 {
                1
            }
            else {
                self.capacity
                    .checked_mul(2)
                    .ok_or(CapacityOverflow { requested: usize::MAX })?
            };
        self.set_capacity(new_capacity)
    }

    fn truncate(&mut self, size: usize) {
        if size >= self.size {
            return
        }
        let tail = self.size - size;
        self.size = size;
        unsafe { drop_in_place(self.data.add(size), tail) }
    }

    fn clone_buffer(&self, alloc: &Alloc) -> Result<(NonNull<T>, usize, usize), CapacityError>
        where
            T: Clone,
    {
        let mut guard = FillGuard::new(alloc, self.capacity)?;
        for value in self.as_slice() {
            unsafe { guard.write(value.clone()) };
        }
        Ok(guard.finish())
    }

    fn release(&mut self) {
        let (data, capacity, size) = (self.data, self.capacity, self.size);
        self.data = NonNull::dangling();
        self.capacity = 0;
        self.size = 0;
        unsafe {
            let _block = FreeOnDrop::new(&self.alloc, data, capacity);
            drop_in_place(data, size);
        }
    }
}

impl<T, Alloc: Allocator + Default> Default for DynamicArray<T, Alloc> {

    #[inline(always)]
    fn default() -> Self {
        Self::new_in(Alloc::default())
    }
}

impl<T: Clone, Alloc: Allocator + Clone> Clone for DynamicArray<T, Alloc> {

    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(copy) => copy,
            Err(err) => panic!("{}", err),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if let Err(err) = self.try_clone_from(source) {
            panic!("{}", err)
        }
    }
}

impl<T, Alloc: Allocator> Drop for DynamicArray<T, Alloc> {

    #[inline(always)]
    fn drop(&mut self) {
        self.release()
    }
}

impl<T, Alloc: Allocator, I: SliceIndex<[T]>> Index<I> for DynamicArray<T, Alloc> {

    type Output = I::Output;

    #[inline(always)]
    fn index(&self, index: I) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<T, Alloc: Allocator, I: SliceIndex<[T]>> IndexMut<I> for DynamicArray<T, Alloc> {

    #[inline(always)]
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.as_mut_slice()[index]
    }
}

impl<T, Alloc: Allocator> Deref for DynamicArray<T, Alloc> {

    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, Alloc: Allocator> DerefMut for DynamicArray<T, Alloc> {

    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T, Alloc: Allocator> AsRef<[T]> for DynamicArray<T, Alloc> {

    #[inline(always)]
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, Alloc: Allocator> AsMut<[T]> for DynamicArray<T, Alloc> {

    #[inline(always)]
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'arr, T, Alloc: Allocator> IntoIterator for &'arr DynamicArray<T, Alloc> {

    type Item = &'arr T;
    type IntoIter = Iter<'arr, T>;

    #[inline(always)]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'arr, T, Alloc: Allocator> IntoIterator for &'arr mut DynamicArray<T, Alloc> {

    type Item = &'arr mut T;
    type IntoIter = IterMut<'arr, T>;

    #[inline(always)]
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
