/// Failure to provide the slots an operation needed.
///
/// Every operation that returns this error leaves its container exactly as it was.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapacityError {
    /// The allocation strategy returned no block.
    AllocFailed {
        new_capacity: usize,
    },
    /// The slot count does not fit in the address space.
    CapacityOverflow {
        requested: usize,
    },
}

impl core::fmt::Display for CapacityError {

    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AllocFailed { new_capacity } => {
                write!(f, "allocation failed with new capacity {}", new_capacity)
            },
            Self::CapacityOverflow { requested } => {
                write!(f, "capacity of {} slots overflows the address space", requested)
            },
        }
    }
}

impl core::error::Error for CapacityError {}
