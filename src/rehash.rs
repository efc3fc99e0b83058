//! Rebuilding a table: growing it, trimming stale entries, or both.
//!
//! Rebuilds that change storage allocate the new slot array first and swap it
//! in only once it exists, so a failed allocation leaves the table exactly as
//! it was. Live entries move into the new array by value; nothing is released
//! except entries dropped by a trim.

use crate::capacity::allocate_slots;
use crate::error::TableError;
use crate::hooks::{HashValue, TableHooks};
use crate::probe::{distance, Probe};
use crate::slot::Slot;
use crate::table::Table;
use core::mem;

/// Outcome of a rebuild that may change capacity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resize {
    /// The requested capacity was too small; nothing happened.
    Unchanged,
    /// Storage was replaced with `capacity` slots, dropping `discarded`
    /// entries that fell below the touch floor.
    Rebuilt { capacity: usize, discarded: usize },
}

/// What an in-place `trim` did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TrimReport {
    pub discarded: usize,
    pub relocated: usize,
    /// Relocation passes run, including the final pass that moved nothing.
    pub passes: usize,
}

impl<K, V, S> Table<K, V, S>
where
    K: AsRef<[u8]>,
    S: TableHooks<K, V>,
{
    fn target_capacity(&self, requested: usize) -> Result<usize, TableError> {
        if requested != 0 {
            return Ok(requested);
        }
        self.capacity()
            .checked_mul(2)
            .ok_or(TableError::AllocationFailed {
                capacity: usize::MAX,
            })
    }

    /// Move every live entry into fresh storage of `capacity` slots. Entries
    /// touched below `floor` are released; survivors have `floor` debited
    /// from their touch index.
    fn rebuild(&mut self, capacity: usize, floor: u64) -> Result<usize, TableError> {
        let fresh = allocate_slots(capacity)?;
        let old = self.swap_slots(fresh);
        let mut discarded = 0;
        for slot in old.into_vec() {
            let Slot::Occupied(mut o) = slot else {
                continue;
            };
            if o.touch < floor {
                self.release(o);
                discarded += 1;
                continue;
            }
            o.touch -= floor;
            // Keys are distinct and the destination holds at most as many
            // entries as the source had, so an open slot always exists.
            if self.place(o).is_err() {
                unreachable!("rebuilt table has room for every surviving entry");
            }
        }
        self.set_max_touch(self.max_touch().saturating_sub(floor));
        Ok(discarded)
    }

    /// Grow the table to `new_capacity` slots (0 doubles it). A capacity no
    /// larger than the current one is a no-op reported as `Unchanged`.
    /// `max_touch` carries over so recency comparisons stay valid.
    pub fn rehash(&mut self, new_capacity: usize) -> Result<Resize, TableError> {
        let from = self.capacity();
        let target = self.target_capacity(new_capacity)?;
        if target <= from {
            tracing::debug!(from, requested = target, "rehash skipped");
            return Ok(Resize::Unchanged);
        }
        self.rebuild(target, 0)?;
        tracing::debug!(from, to = target, len = self.len(), "rehashed table");
        Ok(Resize::Rebuilt {
            capacity: target,
            discarded: 0,
        })
    }

    /// Rebuild into `new_capacity` slots (0 doubles), releasing every entry
    /// touched below `touch_floor` and debiting `touch_floor` from the touch
    /// index of every survivor. A capacity equal to the current one rebuilds
    /// in fresh storage of the same size; a smaller one is a no-op.
    pub fn trim_and_rehash(
        &mut self,
        new_capacity: usize,
        touch_floor: u64,
    ) -> Result<Resize, TableError> {
        let from = self.capacity();
        let target = self.target_capacity(new_capacity)?;
        if target < from {
            tracing::debug!(from, requested = target, "trim and rehash skipped");
            return Ok(Resize::Unchanged);
        }
        let discarded = self.rebuild(target, touch_floor)?;
        tracing::debug!(
            from,
            to = target,
            touch_floor,
            discarded,
            len = self.len(),
            "trimmed and rehashed table"
        );
        Ok(Resize::Rebuilt {
            capacity: target,
            discarded,
        })
    }

    /// Release every entry touched below `touch_floor` without changing
    /// capacity or the survivors' touch indices.
    ///
    /// Emptying slots in the middle of a chain can strand entries that had
    /// probed past them, so survivors are then moved toward their home slot
    /// until a full pass moves nothing. Each move strictly shortens one
    /// entry's probe distance, which bounds the number of passes.
    pub fn trim(&mut self, touch_floor: u64) -> TrimReport {
        let mut report = TrimReport::default();
        let (hooks, slots) = self.split_mut();
        for slot in slots.iter_mut() {
            if matches!(slot, Slot::Occupied(o) if o.touch < touch_floor) {
                if let Slot::Occupied(o) = mem::replace(slot, Slot::Empty) {
                    hooks.release_key(o.key);
                    hooks.release_entry(o.entry);
                    report.discarded += 1;
                }
            } else if matches!(slot, Slot::Deleted) {
                *slot = Slot::Empty;
            }
        }
        self.add_free(report.discarded);

        loop {
            report.passes += 1;
            let moved = settle_pass(self.split_mut().1);
            report.relocated += moved;
            if moved == 0 {
                break;
            }
        }
        tracing::debug!(
            touch_floor,
            discarded = report.discarded,
            relocated = report.relocated,
            passes = report.passes,
            "trimmed table"
        );
        report
    }
}

/// One relocation pass: every occupied slot whose chain from its home slot
/// reaches an Empty slot first moves into that slot. Returns the number of
/// entries moved.
fn settle_pass<K, V, H: HashValue>(slots: &mut [Slot<K, V, H>]) -> usize {
    let cap = slots.len();
    let mut moved = 0;
    for i in 0..cap {
        let home = match &slots[i] {
            Slot::Occupied(o) => o.hash.slot_of(cap),
            _ => continue,
        };
        if home == i {
            continue;
        }
        let hole = Probe::new(home, cap)
            .take(distance(home, i, cap))
            .find(|&j| slots[j].is_open());
        if let Some(j) = hole {
            slots[j] = mem::replace(&mut slots[i], Slot::Empty);
            moved += 1;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::FnHooks;
    use crate::slot::{Occupied, SlotState};

    fn occ(key: u8, hash: u32) -> Slot<u8, u8, u32> {
        Slot::Occupied(Occupied {
            key,
            entry: key,
            hash,
            touch: 1,
        })
    }

    /// Invariant: a pass pulls an entry into the first hole of its chain.
    #[test]
    fn settle_pass_fills_hole_before_entry() {
        let mut slots: Vec<Slot<u8, u8, u32>> = (0..8).map(|_| Slot::Empty).collect();
        slots[3] = occ(1, 2);
        assert_eq!(settle_pass(&mut slots), 1);
        assert_eq!(slots[2].state(), SlotState::Occupied);
        assert_eq!(slots[3].state(), SlotState::Empty);
        assert_eq!(settle_pass(&mut slots), 0);
    }

    /// Invariant: wrapped chains settle across the array boundary.
    #[test]
    fn settle_pass_handles_wraparound() {
        let mut slots: Vec<Slot<u8, u8, u32>> = (0..8).map(|_| Slot::Empty).collect();
        slots[7] = occ(1, 7);
        slots[1] = occ(2, 7);
        assert_eq!(settle_pass(&mut slots), 1);
        assert_eq!(slots[0].state(), SlotState::Occupied);
        assert_eq!(slots[1].state(), SlotState::Empty);
    }

    /// Invariant: an entry already at the end of an unbroken chain stays put.
    #[test]
    fn settle_pass_leaves_contiguous_chain() {
        let mut slots: Vec<Slot<u8, u8, u32>> = (0..8).map(|_| Slot::Empty).collect();
        slots[4] = occ(1, 4);
        slots[5] = occ(2, 4);
        slots[6] = occ(3, 5);
        assert_eq!(settle_pass(&mut slots), 0);
    }

    fn first_byte_table() -> Table<Vec<u8>, i32, FnHooks<Vec<u8>, i32>> {
        let hooks = FnHooks::new().with_hash(|k: &[u8]| k[0] as u32);
        Table::with_hooks(64, hooks).unwrap()
    }

    /// Invariant: trimming the head of a chain keeps the rest reachable.
    #[test]
    fn trim_reconnects_orphaned_chain() {
        let mut t = first_byte_table();
        t.insert(b"a1".to_vec(), 1).unwrap();
        t.insert(b"a2".to_vec(), 2).unwrap();
        t.insert(b"a3".to_vec(), 3).unwrap();
        t.get(b"a2").unwrap();
        t.get(b"a3").unwrap();

        let report = t.trim(2);
        assert_eq!(report.discarded, 1);
        assert_eq!(report.relocated, 2);
        assert_eq!(report.passes, 2);
        assert_eq!(t.len(), 2);
        assert!(!t.contains_key(b"a1"));
        assert_eq!(t.get(b"a2"), Some(&2));
        assert_eq!(t.get(b"a3"), Some(&3));
    }

    #[test]
    fn trim_reclaims_tombstones() {
        let mut t = first_byte_table();
        t.insert(b"a1".to_vec(), 1).unwrap();
        t.insert(b"a2".to_vec(), 2).unwrap();
        t.remove(b"a1").unwrap();
        let h = b'a' as usize % 64;
        assert_eq!(t.slot(h).unwrap().state(), SlotState::Deleted);

        let report = t.trim(0);
        assert_eq!(report.discarded, 0);
        assert_eq!(report.relocated, 1);
        assert_eq!(t.slot(h).unwrap().key(), Some(&b"a2".to_vec()));
        assert_eq!(t.slot(h + 1).unwrap().state(), SlotState::Empty);
        assert_eq!(t.len(), 1);
        assert_eq!(t.free(), 63);
    }

    #[test]
    fn zero_capacity_request_doubles() {
        let t = first_byte_table();
        assert_eq!(t.target_capacity(0), Ok(128));
        assert_eq!(t.target_capacity(100), Ok(100));
    }
}
