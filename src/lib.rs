//! fixed-table: a fixed-capacity, open-addressed hash table for byte-string
//! keys, with least-recently-used touch tracking.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a table that never allocates after construction. When it fills
//!   up, the caller picks the policy per call: reject (`insert`), overwrite
//!   the least recently used entry on the probe path (`force_insert`), or
//!   rebuild explicitly (`rehash`, `trim`, `trim_and_rehash`).
//! - Layers:
//!   - `slot`: one cell, a real sum type `Empty | Deleted | Occupied`.
//!   - `probe`: the linear probe sequence every search follows.
//!   - `hooks`: the capability interface (hash, key equality, release of
//!     keys/entries) fixed at construction.
//!   - `table`: insert / force_insert / get / find / remove / discard.
//!   - `rehash`: rebuilds that grow capacity and/or drop stale entries.
//!
//! Constraints
//! - Single owner, no internal synchronization. Every mutating operation
//!   takes `&mut self`, so references returned by `get`/`find`/`slot` are
//!   invalidated by the borrow checker, not at runtime.
//! - Capacity is fixed at construction (at least `MIN_CAPACITY`) and only
//!   changes through an explicit rebuild.
//! - No operation is partially applied: a rejected call leaves the table as
//!   it was, and a rejected insert hands the key and entry back.
//!
//! Probing and lazy deletion
//! - A key's home slot is `hash % capacity`; searches walk forward with
//!   wrap-around. An Empty slot ends a search, a Deleted slot does not,
//!   since a later key may have probed past it.
//! - A lookup that passed a tombstone moves the entry into the first one,
//!   shortening its chain. The vacated slot is turned Empty only when it
//!   ends every chain through it.
//!
//! Touch index
//! - Each successful insert or lookup bumps `max_touch` and stamps it on the
//!   slot. Lower is older. `force_insert` evicts the oldest entry on the
//!   probe path; trims drop entries below a floor.
//!
//! Hasher invariants
//! - Each slot caches its key's hash; rebuilds reuse it and never call the
//!   hash hook again. Equality is only consulted on a hash match.
//!
//! Release ordering
//! - Keys and entries leaving the table go to the release hooks only after
//!   the slot they came from is consistent again.

mod capacity;
mod error;
pub mod hooks;
mod probe;
mod rehash;
mod slot;
pub mod table;
mod table_proptest;

// Public surface
pub use capacity::{best_capacity, MIN_CAPACITY};
pub use error::{InsertError, TableError};
pub use hooks::{default_hash, DefaultHooks, FnHooks, HashValue, TableHooks};
pub use rehash::{Resize, TrimReport};
pub use slot::{SlotRef, SlotState};
pub use table::{Insertion, Table};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
