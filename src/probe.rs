//! Linear probe sequence: `start, start + 1, .., capacity - 1, 0, .., start - 1`.

/// Yields every slot index exactly once, starting at a hash's home slot and
/// wrapping at the end of the table.
#[derive(Clone, Debug)]
pub(crate) struct Probe {
    next: usize,
    capacity: usize,
    remaining: usize,
}

impl Probe {
    #[inline]
    pub(crate) fn new(start: usize, capacity: usize) -> Self {
        debug_assert!(capacity == 0 || start < capacity);
        Self {
            next: start,
            capacity,
            remaining: capacity,
        }
    }
}

impl Iterator for Probe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let i = self.next;
        self.next += 1;
        if self.next == self.capacity {
            self.next = 0;
        }
        Some(i)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Probe {}

/// Number of probe steps from `home` to `index`.
#[inline]
pub(crate) fn distance(home: usize, index: usize, capacity: usize) -> usize {
    if index >= home {
        index - home
    } else {
        capacity - home + index
    }
}
