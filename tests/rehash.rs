// Rehash and trim integration tests.
//
// Core invariants exercised:
// - Rehash preserves every live entry and max_touch; too-small targets are
//   no-ops reported as Unchanged.
// - trim_and_rehash drops exactly the entries below the floor and debits the
//   floor from every survivor, preserving relative recency.
// - trim works in place and leaves every survivor reachable.
// - A failed rebuild leaves the table fully usable.
use fixed_table::{Resize, Table, TableError, TrimReport};
use std::collections::BTreeMap;

fn filled(capacity: usize, n: usize) -> Table<String, usize> {
    let mut t = Table::new(capacity).unwrap();
    for i in 0..n {
        t.insert(format!("key-{i}"), i).unwrap();
    }
    t
}

fn touches(t: &Table<String, usize>) -> BTreeMap<String, u64> {
    (0..t.capacity())
        .filter_map(|i| t.slot(i))
        .filter_map(|s| Some((s.key()?.clone(), s.touch()?)))
        .collect()
}

// Test: doubling rehash round-trip.
// Verifies: all entries survive with their touch indices; max_touch unchanged.
#[test]
fn rehash_doubles_and_preserves_entries() {
    let mut t = filled(64, 60);
    t.remove("key-3").unwrap();
    let before = touches(&t);
    let max_touch = t.max_touch();

    assert_eq!(
        t.rehash(0),
        Ok(Resize::Rebuilt {
            capacity: 128,
            discarded: 0
        })
    );
    assert_eq!(t.capacity(), 128);
    assert_eq!(t.len(), 59);
    assert_eq!(t.free(), 128 - 59);
    assert_eq!(t.max_touch(), max_touch);
    assert_eq!(touches(&t), before);
    for i in (0..60).filter(|&i| i != 3) {
        assert_eq!(t.get(&format!("key-{i}")), Some(&i));
    }
    assert!(t.get("key-3").is_none());
}

// Test: explicit capacities.
// Verifies: smaller or equal capacity is a no-op; larger grows.
#[test]
fn rehash_ignores_non_growing_capacity() {
    let mut t = filled(64, 10);
    assert_eq!(t.rehash(64), Ok(Resize::Unchanged));
    assert_eq!(t.rehash(32), Ok(Resize::Unchanged));
    assert_eq!(t.capacity(), 64);
    assert_eq!(
        t.rehash(100),
        Ok(Resize::Rebuilt {
            capacity: 100,
            discarded: 0
        })
    );
    assert_eq!(t.len(), 10);
}

// Test: allocation failure during rehash.
// Verifies: AllocationFailed is reported and the table is untouched and usable.
#[test]
fn failed_rehash_leaves_table_intact() {
    let mut t = filled(64, 20);
    let before = touches(&t);
    let err = t.rehash(usize::MAX / 2).unwrap_err();
    assert_eq!(
        err,
        TableError::AllocationFailed {
            capacity: usize::MAX / 2
        }
    );
    assert_eq!(t.capacity(), 64);
    assert_eq!(touches(&t), before);
    t.insert("after".to_string(), 1).unwrap();
    assert_eq!(t.get("after"), Some(&1));

    let err = t.trim_and_rehash(usize::MAX / 2, 5).unwrap_err();
    assert!(matches!(err, TableError::AllocationFailed { .. }));
    assert_eq!(t.len(), 21);
}

// Test: trim_and_rehash drops stale entries and debits survivors.
// Verifies: exact set of dropped keys, debited touches, relative order kept.
#[test]
fn trim_and_rehash_debits_survivors() {
    let mut t = filled(64, 40);
    // Refresh a few early keys so they survive the floor.
    for i in [1, 5, 9] {
        t.get(&format!("key-{i}")).unwrap();
    }
    let before = touches(&t);
    let floor = 20;

    let res = t.trim_and_rehash(128, floor).unwrap();
    let expected_dropped: Vec<_> = before.iter().filter(|(_, tt)| **tt < floor).collect();
    assert_eq!(
        res,
        Resize::Rebuilt {
            capacity: 128,
            discarded: expected_dropped.len()
        }
    );
    assert_eq!(t.max_touch(), 43 - floor);

    let after = touches(&t);
    for (k, tt) in &before {
        match after.get(k) {
            Some(&new) => {
                assert!(*tt >= floor);
                assert_eq!(new, tt - floor);
            }
            None => assert!(*tt < floor, "{k} dropped with touch {tt}"),
        }
    }
    for i in [1, 5, 9] {
        assert!(after.contains_key(&format!("key-{i}")));
    }
    assert!(!after.contains_key("key-0"));
}

// Test: same-capacity rebuild (double-buffering).
// Verifies: capacity 0 doubles, equal capacity rebuilds, smaller is a no-op.
#[test]
fn trim_and_rehash_capacity_rules() {
    let mut t = filled(64, 30);
    assert_eq!(t.trim_and_rehash(32, 10), Ok(Resize::Unchanged));
    assert_eq!(t.len(), 30);

    assert_eq!(
        t.trim_and_rehash(64, 10),
        Ok(Resize::Rebuilt {
            capacity: 64,
            discarded: 9
        })
    );
    assert_eq!(t.len(), 21);
    assert_eq!(t.max_touch(), 20);

    assert_eq!(
        t.trim_and_rehash(0, 0),
        Ok(Resize::Rebuilt {
            capacity: 128,
            discarded: 0
        })
    );
    assert_eq!(t.max_touch(), 20);
}

// Test: repeated trims keep relative recency across rounds.
#[test]
fn repeated_trims_keep_order() {
    let mut t = filled(64, 50);
    t.trim_and_rehash(64, 10).unwrap();
    t.trim_and_rehash(64, 10).unwrap();
    let after = touches(&t);
    assert_eq!(t.len(), 50 - 9 - 10);
    // key-i was stamped i + 1; two debits of 10 leave i + 1 - 20.
    for (k, tt) in after {
        let i: u64 = k.trim_start_matches("key-").parse().unwrap();
        assert_eq!(tt, i + 1 - 20);
    }
}

// Test: in-place trim.
// Verifies: discards below the floor, leaves touches alone, all survivors found.
#[test]
fn trim_in_place() {
    let mut t = filled(64, 64);
    let report = t.trim(33);
    assert_eq!(report.discarded, 32);
    assert_eq!(t.len(), 32);
    assert_eq!(t.capacity(), 64);
    assert_eq!(t.max_touch(), 64);
    let after = touches(&t);
    for i in 0..64usize {
        let touch = after.get(&format!("key-{i}")).copied();
        assert_eq!(touch, (i >= 32).then_some(i as u64 + 1));
    }
    for i in 32..64usize {
        assert_eq!(t.get(&format!("key-{i}")), Some(&i));
    }
    assert_eq!(
        t.trim(0),
        TrimReport {
            discarded: 0,
            relocated: 0,
            passes: 1
        }
    );
}
