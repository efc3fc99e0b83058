//! Error taxonomy shared by every table operation.

use core::fmt;
use thiserror::Error;

/// Why a table operation did not take effect.
///
/// Every variant is reported before any mutation happens; an operation that
/// returns one of these left the table exactly as it was.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum TableError {
    /// Empty key (the only argument the type system cannot rule out).
    #[error("invalid argument: keys must be at least one byte long")]
    InvalidArgument,
    #[error("requested capacity {requested} is below the minimum of {minimum}")]
    CapacityTooSmall { requested: usize, minimum: usize },
    #[error("unable to allocate storage for {capacity} slots")]
    AllocationFailed { capacity: usize },
    #[error("table is full")]
    TableFull,
    /// The configured hash output type has no built-in hash function.
    #[error("a hash function is required for this hash output type")]
    HashFunctionRequired,
    #[error("key not found")]
    NotFound,
}

/// A rejected insertion. The table never took ownership of the pair, so it is
/// handed back intact.
#[derive(Error)]
#[error("insert rejected: {kind}")]
pub struct InsertError<K, V> {
    #[source]
    kind: TableError,
    key: K,
    entry: V,
}

impl<K, V> InsertError<K, V> {
    pub(crate) fn new(kind: TableError, key: K, entry: V) -> Self {
        Self { kind, key, entry }
    }

    pub fn kind(&self) -> TableError {
        self.kind
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn entry(&self) -> &V {
        &self.entry
    }

    /// Recover the key and entry the caller tried to insert.
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.entry)
    }
}

// Key and entry are opaque to the table; keep them out of the output so the
// error is printable for any K, V.
impl<K, V> fmt::Debug for InsertError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_error_returns_the_pair() {
        let e = InsertError::new(TableError::TableFull, "k".to_string(), 7);
        assert_eq!(e.kind(), TableError::TableFull);
        assert_eq!(e.key(), "k");
        assert_eq!(*e.entry(), 7);
        let (k, v) = e.into_parts();
        assert_eq!(k, "k");
        assert_eq!(v, 7);
    }

    #[test]
    fn display_and_source() {
        use std::error::Error as _;
        let e = InsertError::new(TableError::InvalidArgument, Vec::<u8>::new(), ());
        assert_eq!(
            e.to_string(),
            "insert rejected: invalid argument: keys must be at least one byte long"
        );
        let source = e.source().and_then(|s| s.downcast_ref::<TableError>());
        assert_eq!(source, Some(&TableError::InvalidArgument));
        let c = TableError::CapacityTooSmall {
            requested: 10,
            minimum: 64,
        };
        assert_eq!(
            c.to_string(),
            "requested capacity 10 is below the minimum of 64"
        );
    }

    #[test]
    fn insert_error_boxes_as_dyn_error() {
        fn reject() -> Result<(), Box<dyn std::error::Error>> {
            Err(InsertError::new(TableError::TableFull, "k".to_string(), 1u32))?
        }
        let err = reject().unwrap_err();
        assert_eq!(err.to_string(), "insert rejected: table is full");
    }
}
