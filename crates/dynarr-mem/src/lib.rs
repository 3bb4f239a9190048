//! Growable contiguous arrays over pluggable allocation strategies.
//!
//! [`DynamicArray`] owns a single block from an [`Allocator`]. The default strategy is
//! [`GlobalAlloc`], the process heap.
//!
//! ```
//! use dynarr_mem::DynamicArray;
//!
//! let mut array = DynamicArray::new();
//! array.push_back(1)?;
//! array.push_back(2)?;
//! array.push_back(3)?;
//! assert_eq!(array.as_slice(), &[1, 2, 3]);
//! assert_eq!(array.capacity(), 4);
//! # Ok::<(), dynarr_mem::CapacityError>(())
//! ```

mod macros;
mod const_fn;

mod dyn_array;

mod errors;
mod allocator;
mod global_alloc;

pub use errors::CapacityError;
pub use allocator::Allocator;
pub use global_alloc::GlobalAlloc;
pub use dyn_array::{DynamicArray, Iter, IterMut};
pub use const_fn::align_up;

pub type Result<T> = core::result::Result<T, CapacityError>;
