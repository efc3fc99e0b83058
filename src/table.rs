//! Table: the fixed slot array plus free-count and touch bookkeeping.

use crate::capacity::{allocate_slots, best_capacity as slots_within, MIN_CAPACITY};
use crate::error::{InsertError, TableError};
use crate::hooks::{DefaultHooks, HashValue, TableHooks};
use crate::probe::Probe;
use crate::slot::{Occupied, Slot, SlotRef};
use core::fmt;
use core::mem;

/// How a successful insertion was stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Insertion {
    /// Written into an open slot; size grew by one.
    Inserted,
    /// The key was already present; only its entry was replaced.
    Replaced,
    /// The table was full and the least recently touched entry on the
    /// probe path was released to make room (`force_insert` only).
    Evicted,
}

impl Insertion {
    /// True when another key's data was lost to make room.
    pub fn evicted(self) -> bool {
        matches!(self, Insertion::Evicted)
    }
}

/// Where an insertion probe ended.
enum Target {
    Open(usize),
    Match(usize),
    /// No open slot and no match; carries the least recently touched slot
    /// seen along the way.
    Full(Option<usize>),
}

pub struct Table<K, V, S = DefaultHooks>
where
    S: TableHooks<K, V>,
{
    hooks: S,
    slots: Box<[Slot<K, V, S::Hash>]>,
    free: usize,
    max_touch: u64,
}

impl<K, V> Table<K, V>
where
    K: AsRef<[u8]>,
{
    /// Table with the default hash, equality and release behavior.
    pub fn new(capacity: usize) -> Result<Self, TableError> {
        Self::with_hooks(capacity, DefaultHooks)
    }
}

impl<K, V, S> Table<K, V, S>
where
    K: AsRef<[u8]>,
    S: TableHooks<K, V>,
{
    pub fn with_hooks(capacity: usize, hooks: S) -> Result<Self, TableError> {
        if capacity < MIN_CAPACITY {
            tracing::debug!(
                capacity,
                minimum = MIN_CAPACITY,
                "requested capacity is below the minimum"
            );
            return Err(TableError::CapacityTooSmall {
                requested: capacity,
                minimum: MIN_CAPACITY,
            });
        }
        hooks.validate()?;
        let slots = allocate_slots(capacity)?;
        Ok(Self {
            hooks,
            slots,
            free: capacity,
            max_touch: 0,
        })
    }

    /// Largest capacity whose table fits in `bytes`, counting both the fixed
    /// table header and the slot array.
    pub fn best_capacity(bytes: usize) -> usize {
        slots_within(
            bytes,
            mem::size_of::<Self>(),
            mem::size_of::<Slot<K, V, S::Hash>>(),
        )
    }

    #[inline]
    fn home(&self, hash: S::Hash) -> usize {
        hash.slot_of(self.capacity())
    }

    #[inline]
    fn next_touch(&mut self) -> u64 {
        self.max_touch += 1;
        self.max_touch
    }

    /// Walk the probe chain for an insertion. Keeps scanning past the first
    /// open slot until an Empty slot or a full cycle, so an existing key
    /// further down the chain is found instead of duplicated.
    fn locate_for_insert(&self, key: &[u8], hash: S::Hash) -> Target {
        let mut first_open = None;
        let mut oldest: Option<(usize, u64)> = None;
        for i in Probe::new(self.home(hash), self.capacity()) {
            match &self.slots[i] {
                Slot::Empty => {
                    first_open.get_or_insert(i);
                    break;
                }
                Slot::Deleted => {
                    first_open.get_or_insert(i);
                }
                Slot::Occupied(o) => {
                    if o.hash == hash && self.hooks.key_eq(o.key.as_ref(), key) {
                        return Target::Match(i);
                    }
                    // Strict comparison keeps the first-seen slot on ties.
                    if oldest.map_or(true, |(_, t)| o.touch < t) {
                        oldest = Some((i, o.touch));
                    }
                }
            }
        }
        match first_open {
            Some(i) => Target::Open(i),
            None => Target::Full(oldest.map(|(i, _)| i)),
        }
    }

    /// Index of the occupied slot holding `key`. Stops at the first Empty
    /// slot; tombstones are skipped. Also reports the first tombstone passed.
    fn locate(&self, key: &[u8]) -> Option<(usize, Option<usize>)> {
        if key.is_empty() {
            tracing::debug!("lookup with an empty key");
            return None;
        }
        let hash = self.hooks.hash(key);
        let mut lazy = None;
        for i in Probe::new(self.home(hash), self.capacity()) {
            match &self.slots[i] {
                Slot::Empty => return None,
                Slot::Deleted => {
                    lazy.get_or_insert(i);
                }
                Slot::Occupied(o) => {
                    if o.hash == hash && self.hooks.key_eq(o.key.as_ref(), key) {
                        return Some((i, lazy));
                    }
                }
            }
        }
        None
    }

    fn insert_inner(
        &mut self,
        key: K,
        entry: V,
        force: bool,
    ) -> Result<Insertion, InsertError<K, V>> {
        if key.as_ref().is_empty() {
            tracing::debug!("insert with an empty key");
            return Err(InsertError::new(TableError::InvalidArgument, key, entry));
        }
        let hash = self.hooks.hash(key.as_ref());
        match self.locate_for_insert(key.as_ref(), hash) {
            Target::Open(i) => {
                let touch = self.next_touch();
                self.slots[i] = Slot::Occupied(Occupied {
                    key,
                    entry,
                    hash,
                    touch,
                });
                self.free -= 1;
                Ok(Insertion::Inserted)
            }
            Target::Match(i) => {
                let touch = self.next_touch();
                let Slot::Occupied(o) = &mut self.slots[i] else {
                    unreachable!("matched slot is occupied");
                };
                o.touch = touch;
                let old = mem::replace(&mut o.entry, entry);
                // The stored key is kept; the caller's duplicate is released.
                self.hooks.release_key(key);
                self.hooks.release_entry(old);
                Ok(Insertion::Replaced)
            }
            Target::Full(Some(victim)) if force => {
                let touch = self.next_touch();
                let old = mem::replace(
                    &mut self.slots[victim],
                    Slot::Occupied(Occupied {
                        key,
                        entry,
                        hash,
                        touch,
                    }),
                );
                tracing::trace!(slot = victim, "evicted least recently touched entry");
                if let Slot::Occupied(o) = old {
                    self.hooks.release_key(o.key);
                    self.hooks.release_entry(o.entry);
                }
                Ok(Insertion::Evicted)
            }
            Target::Full(_) => Err(InsertError::new(TableError::TableFull, key, entry)),
        }
    }

    /// Insert `entry` under `key`, or replace the entry of an existing equal
    /// key. A full table rejects the pair and hands it back untouched.
    pub fn insert(&mut self, key: K, entry: V) -> Result<Insertion, InsertError<K, V>> {
        self.insert_inner(key, entry, false)
    }

    /// Like `insert`, but a full table evicts the least recently touched
    /// entry on the key's probe path instead of failing. Only an empty key is
    /// rejected.
    pub fn force_insert(&mut self, key: K, entry: V) -> Result<Insertion, InsertError<K, V>> {
        self.insert_inner(key, entry, true)
    }

    /// Locate `key`, stamp it as most recently touched and pull it forward
    /// into the first tombstone passed on the way.
    fn touch_and_compact(&mut self, key: &[u8]) -> Option<usize> {
        let (found, lazy) = self.locate(key)?;
        let touch = self.next_touch();
        let index = match lazy {
            Some(l) => {
                self.relocate(found, l);
                l
            }
            None => found,
        };
        if let Slot::Occupied(o) = &mut self.slots[index] {
            o.touch = touch;
        }
        Some(index)
    }

    /// Move an occupied slot into an earlier tombstone on its own chain.
    fn relocate(&mut self, from: usize, to: usize) {
        let moved = mem::replace(&mut self.slots[from], Slot::Deleted);
        self.slots[to] = moved;
        tracing::trace!(from, to, "compacted probe chain");

        // A position followed by an Empty slot ends every chain through it,
        // so it can become Empty too, along with tombstones directly before it.
        let cap = self.capacity();
        if !self.slots[(from + 1) % cap].is_empty() {
            return;
        }
        let mut i = from;
        for _ in 0..cap {
            if !matches!(self.slots[i], Slot::Deleted) {
                break;
            }
            self.slots[i] = Slot::Empty;
            i = if i == 0 { cap - 1 } else { i - 1 };
        }
    }

    /// Entry stored under `key`. Counts as a touch, and may move the entry
    /// to an earlier tombstone on its chain. The position it left becomes
    /// Empty only when the next slot is Empty; otherwise it stays a
    /// tombstone so keys stored further along remain reachable.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let i = self.touch_and_compact(key.as_ref())?;
        match &self.slots[i] {
            Slot::Occupied(o) => Some(&o.entry),
            _ => None,
        }
    }

    /// Mutable access to the entry stored under `key`, for in-place updates
    /// without a second search. Same touch and compaction as `get`.
    pub fn find<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let i = self.touch_and_compact(key.as_ref())?;
        match &mut self.slots[i] {
            Slot::Occupied(o) => Some(&mut o.entry),
            _ => None,
        }
    }

    /// Whether `key` is present. Does not touch or compact.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        self.locate(key.as_ref()).is_some()
    }

    /// Unlink `key` and leave a tombstone in its place.
    fn take(&mut self, key: &[u8]) -> Option<Occupied<K, V, S::Hash>> {
        let (i, _) = self.locate(key)?;
        match mem::replace(&mut self.slots[i], Slot::Deleted) {
            Slot::Occupied(o) => {
                self.free += 1;
                Some(o)
            }
            other => {
                self.slots[i] = other;
                None
            }
        }
    }

    /// Remove `key` and hand its entry to the caller. The stored key is
    /// released through the hooks.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let o = self.take(key.as_ref())?;
        self.hooks.release_key(o.key);
        Some(o.entry)
    }

    /// Remove `key` and hand both key and entry to the caller.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        self.take(key.as_ref()).map(|o| (o.key, o.entry))
    }

    /// Remove `key`, releasing both key and entry through the hooks.
    pub fn discard<Q>(&mut self, key: &Q) -> Result<(), TableError>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let key = key.as_ref();
        if key.is_empty() {
            tracing::debug!("discard with an empty key");
            return Err(TableError::InvalidArgument);
        }
        let o = self.take(key).ok_or(TableError::NotFound)?;
        self.hooks.release_key(o.key);
        self.hooks.release_entry(o.entry);
        Ok(())
    }

    /// Inspect one position directly; `None` when out of range.
    pub fn slot(&self, index: usize) -> Option<SlotRef<'_, K, V, S::Hash>> {
        self.slots.get(index).map(SlotRef::new)
    }

    /// Occupied entries in slot order (which is not insertion order).
    pub fn iter(&self) -> Iter<'_, K, V, S::Hash> {
        Iter {
            it: self.slots.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, S::Hash> {
        IterMut {
            it: self.slots.iter_mut(),
        }
    }
}

// Accessors and rebuild plumbing; none of these look at key bytes.
impl<K, V, S> Table<K, V, S>
where
    S: TableHooks<K, V>,
{
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.capacity() - self.free
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.free == self.capacity()
    }

    /// Number of open (Empty or Deleted) slots.
    #[inline]
    pub fn free(&self) -> usize {
        self.free
    }

    /// `len / capacity`, in `[0, 1]`.
    pub fn load(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    /// Highest touch index handed out so far.
    #[inline]
    pub fn max_touch(&self) -> u64 {
        self.max_touch
    }

    pub fn hooks(&self) -> &S {
        &self.hooks
    }

    pub(crate) fn swap_slots(
        &mut self,
        slots: Box<[Slot<K, V, S::Hash>]>,
    ) -> Box<[Slot<K, V, S::Hash>]> {
        self.free = slots.iter().filter(|s| s.is_open()).count();
        mem::replace(&mut self.slots, slots)
    }

    pub(crate) fn split_mut(&mut self) -> (&S, &mut [Slot<K, V, S::Hash>]) {
        (&self.hooks, &mut self.slots)
    }

    pub(crate) fn set_max_touch(&mut self, touch: u64) {
        self.max_touch = touch;
    }

    pub(crate) fn add_free(&mut self, n: usize) {
        self.free += n;
    }

    /// Put a live entry into the first open slot of its chain. The caller
    /// guarantees the key is not already present.
    pub(crate) fn place(
        &mut self,
        o: Occupied<K, V, S::Hash>,
    ) -> Result<usize, Occupied<K, V, S::Hash>> {
        let cap = self.slots.len();
        for i in Probe::new(o.hash.slot_of(cap), cap) {
            if self.slots[i].is_open() {
                self.slots[i] = Slot::Occupied(o);
                self.free -= 1;
                return Ok(i);
            }
        }
        Err(o)
    }

    pub(crate) fn release(&self, o: Occupied<K, V, S::Hash>) {
        self.hooks.release_key(o.key);
        self.hooks.release_entry(o.entry);
    }
}

impl<K, V, S> Drop for Table<K, V, S>
where
    S: TableHooks<K, V>,
{
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Slot::Occupied(o) = mem::replace(slot, Slot::Empty) {
                self.hooks.release_key(o.key);
                self.hooks.release_entry(o.entry);
            }
        }
    }
}

impl<K, V, S> fmt::Debug for Table<K, V, S>
where
    S: TableHooks<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("capacity", &self.slots.len())
            .field("len", &(self.slots.len() - self.free))
            .field("max_touch", &self.max_touch)
            .finish_non_exhaustive()
    }
}

/// Iterator over `(&K, &V)` for every occupied slot.
pub struct Iter<'a, K, V, H> {
    it: core::slice::Iter<'a, Slot<K, V, H>>,
}

impl<'a, K, V, H> Iterator for Iter<'a, K, V, H> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.by_ref().find_map(|s| match s {
            Slot::Occupied(o) => Some((&o.key, &o.entry)),
            _ => None,
        })
    }
}

/// Iterator over `(&K, &mut V)` for every occupied slot.
pub struct IterMut<'a, K, V, H> {
    it: core::slice::IterMut<'a, Slot<K, V, H>>,
}

impl<'a, K, V, H> Iterator for IterMut<'a, K, V, H> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.by_ref().find_map(|s| match s {
            Slot::Occupied(o) => Some((&o.key, &mut o.entry)),
            _ => None,
        })
    }
}

/// Number of entries; 0 without a table.
pub fn size<K, V, S: TableHooks<K, V>>(table: Option<&Table<K, V, S>>) -> usize {
    table.map_or(0, |t| t.len())
}

/// Slot count; 0 without a table.
pub fn capacity<K, V, S: TableHooks<K, V>>(table: Option<&Table<K, V, S>>) -> usize {
    table.map_or(0, |t| t.capacity())
}

/// Load factor; 1.0 without a table (nothing more fits).
pub fn load<K, V, S: TableHooks<K, V>>(table: Option<&Table<K, V, S>>) -> f64 {
    table.map_or(1.0, |t| t.load())
}

/// Highest touch index; 0 without a table.
pub fn max_touch<K, V, S: TableHooks<K, V>>(table: Option<&Table<K, V, S>>) -> u64 {
    table.map_or(0, |t| t.max_touch())
}
