//! Sizing advice and the slot allocation capability.

use crate::error::TableError;
use crate::slot::Slot;

/// Smallest capacity a table can be constructed with.
pub const MIN_CAPACITY: usize = 64;

/// Largest slot count whose storage, plus `overhead` bytes of fixed table
/// state, fits in `bytes`. Returns 0 when the budget does not even cover the
/// overhead.
pub fn best_capacity(bytes: usize, overhead: usize, slot_size: usize) -> usize {
    if slot_size == 0 {
        return 0;
    }
    bytes.saturating_sub(overhead) / slot_size
}

/// Obtain `capacity` Empty slots. Fails instead of aborting when the memory
/// cannot be reserved.
pub(crate) fn allocate_slots<K, V, H>(
    capacity: usize,
) -> Result<Box<[Slot<K, V, H>]>, TableError> {
    let mut slots = Vec::new();
    if slots.try_reserve_exact(capacity).is_err() {
        tracing::debug!(capacity, "unable to reserve slot storage");
        return Err(TableError::AllocationFailed { capacity });
    }
    slots.resize_with(capacity, || Slot::Empty);
    Ok(slots.into_boxed_slice())
}
