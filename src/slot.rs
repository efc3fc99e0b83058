//! One storage cell of the table and its three-way state.
//!
//! The state is the variant itself, so it can never drift from the data:
//! - `Empty`: never written since the last rebuild; ends every probe.
//! - `Deleted`: tombstone left by a removal; probes continue past it.
//! - `Occupied`: holds a live key/entry with its cached hash and touch index.

use crate::hooks::HashValue;

#[derive(Debug)]
pub(crate) struct Occupied<K, V, H> {
    pub(crate) key: K,
    pub(crate) entry: V,
    pub(crate) hash: H,
    pub(crate) touch: u64,
}

#[derive(Debug)]
pub(crate) enum Slot<K, V, H> {
    Empty,
    Deleted,
    Occupied(Occupied<K, V, H>),
}

impl<K, V, H> Slot<K, V, H> {
    #[cfg(test)]
    pub(crate) fn state(&self) -> SlotState {
        match self {
            Slot::Empty => SlotState::Empty,
            Slot::Deleted => SlotState::Deleted,
            Slot::Occupied(_) => SlotState::Occupied,
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    /// Eligible for insertion (Empty or Deleted).
    #[inline]
    pub(crate) fn is_open(&self) -> bool {
        !matches!(self, Slot::Occupied(_))
    }
}

/// Classification of a slot, as reported by `Table::slot`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SlotState {
    Empty,
    Deleted,
    Occupied,
}

impl SlotState {
    #[inline]
    pub fn is_open(self) -> bool {
        !matches!(self, SlotState::Occupied)
    }
}

/// Read-only view of one slot. Borrowed from the table, so it cannot outlive
/// the next mutating call.
#[derive(Debug)]
pub enum SlotRef<'a, K, V, H> {
    Empty,
    Deleted,
    Occupied {
        key: &'a K,
        entry: &'a V,
        hash: H,
        touch: u64,
    },
}

impl<'a, K, V, H: HashValue> SlotRef<'a, K, V, H> {
    pub(crate) fn new(slot: &'a Slot<K, V, H>) -> Self {
        match slot {
            Slot::Empty => SlotRef::Empty,
            Slot::Deleted => SlotRef::Deleted,
            Slot::Occupied(o) => SlotRef::Occupied {
                key: &o.key,
                entry: &o.entry,
                hash: o.hash,
                touch: o.touch,
            },
        }
    }

    pub fn state(&self) -> SlotState {
        match self {
            SlotRef::Empty => SlotState::Empty,
            SlotRef::Deleted => SlotState::Deleted,
            SlotRef::Occupied { .. } => SlotState::Occupied,
        }
    }

    pub fn key(&self) -> Option<&'a K> {
        match self {
            SlotRef::Occupied { key, .. } => Some(*key),
            _ => None,
        }
    }

    pub fn entry(&self) -> Option<&'a V> {
        match self {
            SlotRef::Occupied { entry, .. } => Some(*entry),
            _ => None,
        }
    }

    pub fn touch(&self) -> Option<u64> {
        match self {
            SlotRef::Occupied { touch, .. } => Some(*touch),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupied(touch: u64) -> Slot<&'static str, i32, u32> {
        Slot::Occupied(Occupied {
            key: "k",
            entry: 1,
            hash: 9,
            touch,
        })
    }

    #[test]
    fn exactly_one_state_per_slot() {
        let e: Slot<&str, i32, u32> = Slot::Empty;
        let d: Slot<&str, i32, u32> = Slot::Deleted;
        let o = occupied(3);
        assert_eq!(e.state(), SlotState::Empty);
        assert_eq!(d.state(), SlotState::Deleted);
        assert_eq!(o.state(), SlotState::Occupied);
        assert!(e.is_empty() && e.is_open());
        assert!(!d.is_empty() && d.is_open());
        assert!(!o.is_empty() && !o.is_open());
    }

    #[test]
    fn slot_ref_exposes_occupied_fields_only() {
        let o = occupied(3);
        let view = SlotRef::new(&o);
        assert_eq!(view.state(), SlotState::Occupied);
        assert_eq!(view.key(), Some(&"k"));
        assert_eq!(view.entry(), Some(&1));
        assert_eq!(view.touch(), Some(3));

        let d: Slot<&str, i32, u32> = Slot::Deleted;
        let view = SlotRef::new(&d);
        assert!(view.state().is_open());
        assert!(view.key().is_none());
        assert!(view.touch().is_none());
    }
}
