use std::panic::{self, AssertUnwindSafe};

use dynarr_alloc::{ArenaAlloc, TrackingAlloc};
use dynarr_mem::{CapacityError, DynamicArray};

type Tracked<'a, T> = DynamicArray<T, &'a TrackingAlloc>;

fn pushed<'a>(alloc: &'a TrackingAlloc, values: &[u32]) -> Tracked<'a, u32> {
    let mut array = DynamicArray::new_in(alloc);
    for &v in values {
        array.push_back(v).unwrap();
    }
    array
}

/// Panics when dropped if armed.
struct Fuse(bool);

impl Drop for Fuse {

    fn drop(&mut self) {
        if self.0 {
            panic!("fuse blown")
        }
    }
}

#[test]
fn sized_construction_allocates_once() {
    let alloc = TrackingAlloc::new();
    let array = Tracked::<u64>::with_size_in(10, &alloc).unwrap();
    assert_eq!(array.size(), 10);
    assert_eq!(array.capacity(), 10);
    assert_eq!(alloc.stats().allocations, 1);
    assert_eq!(alloc.live_bytes(), 80);
    drop(array);
    assert_eq!(alloc.live_blocks(), 0);
}

#[test]
fn empty_array_never_allocates() {
    let alloc = TrackingAlloc::new();
    {
        let mut array = Tracked::<String>::new_in(&alloc);
        array.clear();
        array.shrink_to_fit().unwrap();
        array.set_capacity(0).unwrap();
        array.set_size(0).unwrap();
        let _copy = array.try_clone().unwrap();
    }
    assert_eq!(alloc.stats().allocations, 0);
}

#[test]
fn copies_own_their_buffer() {
    let alloc = TrackingAlloc::new();
    let original = pushed(&alloc, &[1, 2, 3]);
    let mut copy = original.try_clone().unwrap();
    assert_eq!(copy.capacity(), 4);
    assert_eq!(alloc.live_blocks(), 2);
    assert_ne!(copy.as_ptr(), original.as_ptr());
    copy[1] = 20;
    assert_eq!(original.as_slice(), &[1, 2, 3]);
    drop(original);
    assert_eq!(copy.as_slice(), &[1, 20, 3]);
    drop(copy);
    assert_eq!(alloc.live_blocks(), 0);
}

#[test]
fn move_transfers_without_allocating() {
    let alloc = TrackingAlloc::new();
    let mut source = pushed(&alloc, &[4, 5, 6, 7, 8]);
    let before = alloc.stats();
    let ptr = source.as_ptr();
    let mut target = Tracked::<u32>::new_in(&alloc);
    target.move_from(&mut source);
    assert_eq!(alloc.stats().allocations, before.allocations);
    assert_eq!(target.as_ptr(), ptr);
    assert_eq!((target.size(), target.capacity()), (5, 8));
    assert_eq!((source.size(), source.capacity()), (0, 0));
    let taken = target.take();
    assert_eq!(taken.as_slice(), &[4, 5, 6, 7, 8]);
    assert_eq!((target.size(), target.capacity()), (0, 0));
    drop(taken);
    drop(target);
    drop(source);
    assert_eq!(alloc.live_blocks(), 0);
    assert_eq!(alloc.stats().frees, alloc.stats().allocations);
}

#[test]
fn copy_assignment_releases_previous_buffer() {
    let alloc = TrackingAlloc::new();
    let source = pushed(&alloc, &[9; 6]);
    let mut target = pushed(&alloc, &[1, 2]);
    target.try_clone_from(&source).unwrap();
    assert_eq!(target.as_slice(), source.as_slice());
    assert_eq!(target.capacity(), 8);
    assert_eq!(alloc.live_blocks(), 2);
}

#[test]
fn failed_growth_keeps_contents() {
    let alloc = TrackingAlloc::new();
    let mut array = pushed(&alloc, &[1, 2, 3, 4]);
    alloc.fail_after(0);
    let err = array.push_back(5).unwrap_err();
    assert_eq!(err, CapacityError::AllocFailed { new_capacity: 8 });
    let mut called = false;
    assert!(array.emplace_back(|| { called = true; 5 }).is_err());
    assert!(!called);
    assert!(array.set_capacity(16).is_err());
    assert!(array.set_capacity(2).is_err());
    assert!(array.set_size(12).is_err());
    array.pop();
    assert!(array.shrink_to_fit().is_err());
    assert_eq!(array.as_slice(), &[1, 2, 3]);
    assert_eq!(array.capacity(), 4);
    alloc.clear_failures();
    array.shrink_to_fit().unwrap();
    assert_eq!(array.capacity(), 3);
}

#[test]
fn failed_copy_leaves_target_untouched() {
    let alloc = TrackingAlloc::new();
    let source = pushed(&alloc, &[1, 2, 3]);
    let mut target = pushed(&alloc, &[7, 8]);
    alloc.fail_after(0);
    assert!(source.try_clone().is_err());
    assert!(target.try_clone_from(&source).is_err());
    assert_eq!(target.as_slice(), &[7, 8]);
    assert_eq!(target.capacity(), 2);
    assert_eq!(alloc.live_blocks(), 2);
}

#[test]
fn failed_sized_construction_allocates_nothing() {
    let alloc = TrackingAlloc::new().with_limit(100);
    let err = Tracked::<u64>::with_size_in(13, &alloc).err();
    assert_eq!(err, Some(CapacityError::AllocFailed { new_capacity: 13 }));
    assert_eq!(alloc.live_blocks(), 0);
}

#[test]
fn set_size_growth_reallocates_exactly() {
    let alloc = TrackingAlloc::new();
    let mut array = Tracked::<u32>::with_size_in(10, &alloc).unwrap();
    array.iter_mut().enumerate().for_each(|(i, v)| *v = i as u32);
    array.set_size(20).unwrap();
    assert_eq!(array.capacity(), 20);
    assert_eq!(alloc.live_bytes(), 80);
    assert_eq!(&array[..10], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert!(array[10..].iter().all(|&v| v == 0));
}

#[test]
fn heap_values_are_released_on_truncation() {
    let alloc = TrackingAlloc::new();
    let mut array = Tracked::<String>::new_in(&alloc);
    for word in ["alpha", "beta", "gamma", "delta", "epsilon"] {
        array.push_back(word.to_owned()).unwrap();
    }
    array.set_capacity(2).unwrap();
    assert_eq!(array.as_slice(), &["alpha", "beta"]);
    array.set_size_with(4, || "filler".to_owned()).unwrap();
    assert_eq!(array.as_slice(), &["alpha", "beta", "filler", "filler"]);
    array.clear();
    assert!(array.is_empty());
    assert_eq!(array.capacity(), 4);
}

#[test]
fn arena_backed_array_grows_until_full() {
    let arena = ArenaAlloc::new(1024).unwrap();
    let mut array = DynamicArray::<u32, &ArenaAlloc>::new_in(&arena);
    let mut count = 0;
    while array.push_back(count).is_ok() {
        count += 1;
    }
    assert_eq!(array.size(), count as usize);
    assert!(array.iter().copied().eq(0..count));
    assert!(arena.remaining() < array.capacity() * 2 * 4);
}

#[test]
fn panicking_drop_during_truncation_still_frees_old_block() {
    let alloc = TrackingAlloc::new();
    let mut array = DynamicArray::new_in(&alloc);
    for armed in [false, false, false, true] {
        array.push_back(Fuse(armed)).unwrap();
    }
    let result = panic::catch_unwind(AssertUnwindSafe(|| array.set_capacity(2)));
    assert!(result.is_err());
    assert_eq!((array.size(), array.capacity()), (2, 2));
    assert_eq!(alloc.live_blocks(), 1);
    drop(array);
    assert_eq!(alloc.live_blocks(), 0);
    assert_eq!(alloc.stats().frees, alloc.stats().allocations);
}

#[test]
fn panicking_drop_during_release_still_frees_block() {
    let alloc = TrackingAlloc::new();
    let mut array = DynamicArray::new_in(&alloc);
    array.push_back(Fuse(true)).unwrap();
    array.push_back(Fuse(false)).unwrap();
    let result = panic::catch_unwind(AssertUnwindSafe(move || drop(array)));
    assert!(result.is_err());
    assert_eq!(alloc.live_blocks(), 0);
}

#[test]
fn panicking_drop_during_move_assignment_still_frees_block() {
    let alloc = TrackingAlloc::new();
    let mut target = DynamicArray::new_in(&alloc);
    target.push_back(Fuse(true)).unwrap();
    let mut source = DynamicArray::new_in(&alloc);
    source.push_back(Fuse(false)).unwrap();
    let result = panic::catch_unwind(AssertUnwindSafe(|| target.move_from(&mut source)));
    assert!(result.is_err());
    assert!(target.is_empty());
    assert_eq!(alloc.live_blocks(), 1);
    drop(source);
    drop(target);
    assert_eq!(alloc.live_blocks(), 0);
}
