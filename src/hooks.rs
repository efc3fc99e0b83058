//! Collaborators the table calls into: hashing, key equality and release of
//! keys/entries that leave the table.
//!
//! A table is parameterized by one `TableHooks` value fixed at construction.
//! `DefaultHooks` is the zero-sized default; `FnHooks` lets callers override
//! individual collaborators with closures and keep the defaults for the rest.

use crate::error::TableError;
use core::fmt;

/// Output type of a table hash function.
///
/// Only the low bits matter for placement: a hash maps to its home slot with
/// `slot_of(capacity)`.
pub trait HashValue: Copy + Eq + Default + fmt::Debug {
    /// Whether the built-in hash can produce this type.
    const HAS_DEFAULT: bool = false;

    /// Built-in hash of `key`, if this type has one.
    fn default_of(_key: &[u8]) -> Option<Self> {
        None
    }

    /// Home slot for this hash in a table of `capacity` slots.
    fn slot_of(self, capacity: usize) -> usize;
}

impl HashValue for u32 {
    const HAS_DEFAULT: bool = true;

    fn default_of(key: &[u8]) -> Option<Self> {
        Some(default_hash(key))
    }

    #[inline]
    fn slot_of(self, capacity: usize) -> usize {
        self as usize % capacity
    }
}

impl HashValue for u64 {
    #[inline]
    fn slot_of(self, capacity: usize) -> usize {
        (self % capacity as u64) as usize
    }
}

impl HashValue for usize {
    #[inline]
    fn slot_of(self, capacity: usize) -> usize {
        self % capacity
    }
}

/// The built-in 32-bit key hash (xxHash32, seed 0). Not cryptographic.
#[inline]
pub fn default_hash(key: &[u8]) -> u32 {
    xxhash_rust::xxh32::xxh32(key, 0)
}

/// Capability interface the table uses for everything it does not own.
///
/// `hash` and `key_eq` run during probing; `release_key`/`release_entry` run
/// after the slot they came from is already consistent again, so a release
/// hook never observes a half-updated table.
pub trait TableHooks<K, V> {
    type Hash: HashValue;

    fn hash(&self, key: &[u8]) -> Self::Hash;

    /// Key equality; keys of different length are never equal.
    fn key_eq(&self, a: &[u8], b: &[u8]) -> bool {
        a == b
    }

    /// Called for every key the table gives up without handing it back.
    fn release_key(&self, key: K) {
        drop(key);
    }

    /// Called for every entry the table gives up without handing it back.
    fn release_entry(&self, entry: V) {
        drop(entry);
    }

    /// Checked once at construction, before any storage is allocated.
    fn validate(&self) -> Result<(), TableError> {
        Ok(())
    }
}

/// xxHash32 keys, byte-wise equality, release by drop.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHooks;

impl<K, V> TableHooks<K, V> for DefaultHooks {
    type Hash = u32;

    #[inline]
    fn hash(&self, key: &[u8]) -> u32 {
        default_hash(key)
    }
}

type HashFn<H> = Box<dyn Fn(&[u8]) -> H>;
type EqFn = Box<dyn Fn(&[u8], &[u8]) -> bool>;
type ReleaseFn<T> = Box<dyn Fn(T)>;

/// Hooks assembled from optional closures. Every collaborator left unset
/// falls back to the `DefaultHooks` behavior.
///
/// ```
/// use fixed_table::{FnHooks, Table};
///
/// let hooks = FnHooks::<String, u32, u64>::new().with_hash(|k| k.len() as u64);
/// let mut t = Table::with_hooks(64, hooks).unwrap();
/// t.insert("abc".to_string(), 1).unwrap();
/// assert_eq!(t.get("abc"), Some(&1));
/// ```
pub struct FnHooks<K, V, H = u32> {
    hash: Option<HashFn<H>>,
    key_eq: Option<EqFn>,
    release_key: Option<ReleaseFn<K>>,
    release_entry: Option<ReleaseFn<V>>,
}

impl<K, V, H: HashValue> FnHooks<K, V, H> {
    pub fn new() -> Self {
        Self {
            hash: None,
            key_eq: None,
            release_key: None,
            release_entry: None,
        }
    }

    pub fn with_hash<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8]) -> H + 'static,
    {
        self.hash = Some(Box::new(f));
        self
    }

    pub fn with_key_eq<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8], &[u8]) -> bool + 'static,
    {
        self.key_eq = Some(Box::new(f));
        self
    }

    pub fn on_release_key<F>(mut self, f: F) -> Self
    where
        F: Fn(K) + 'static,
    {
        self.release_key = Some(Box::new(f));
        self
    }

    pub fn on_release_entry<F>(mut self, f: F) -> Self
    where
        F: Fn(V) + 'static,
    {
        self.release_entry = Some(Box::new(f));
        self
    }
}

impl<K, V, H: HashValue> Default for FnHooks<K, V, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> fmt::Debug for FnHooks<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHooks")
            .field("hash", &self.hash.is_some())
            .field("key_eq", &self.key_eq.is_some())
            .field("release_key", &self.release_key.is_some())
            .field("release_entry", &self.release_entry.is_some())
            .finish()
    }
}

impl<K, V, H: HashValue> TableHooks<K, V> for FnHooks<K, V, H> {
    type Hash = H;

    fn hash(&self, key: &[u8]) -> H {
        match &self.hash {
            Some(f) => f(key),
            // `validate` rejects a missing hash for types without a default.
            None => H::default_of(key).unwrap_or_default(),
        }
    }

    fn key_eq(&self, a: &[u8], b: &[u8]) -> bool {
        match &self.key_eq {
            Some(f) => f(a, b),
            None => a == b,
        }
    }

    fn release_key(&self, key: K) {
        if let Some(f) = &self.release_key {
            f(key);
        }
    }

    fn release_entry(&self, entry: V) {
        if let Some(f) = &self.release_entry {
            f(entry);
        }
    }

    fn validate(&self) -> Result<(), TableError> {
        if self.hash.is_none() && !H::HAS_DEFAULT {
            return Err(TableError::HashFunctionRequired);
        }
        Ok(())
    }
}
