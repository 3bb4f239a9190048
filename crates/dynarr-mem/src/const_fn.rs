/// Rounds `offset` up to the next multiple of `align`, which must be a power of two.
#[inline(always)]
pub const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}
