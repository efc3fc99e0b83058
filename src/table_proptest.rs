#![cfg(test)]

// Property tests for Table kept inside the crate so they can inspect slots
// and touch indices directly.

use crate::error::TableError;
use crate::hooks::FnHooks;
use crate::rehash::Resize;
use crate::slot::SlotRef;
use crate::table::{Insertion, Table};
use proptest::prelude::*;
use std::collections::HashMap;

const START_CAPACITY: usize = 64;
const MAX_CAPACITY: usize = 256;

type Sut = Table<String, i32, FnHooks<String, i32>>;

// Pool-indexed operations so failing cases shrink toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    ForceInsert(usize, i32),
    Get(usize),
    Find(usize, i32),
    Remove(usize),
    Discard(usize),
    Trim(u64),
    TrimAndRehash(u64, bool),
    Rehash,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    // Few distinct first bytes and a first-byte hash: long, overlapping chains.
    proptest::collection::vec("[a-d][a-z]{1,3}", 1..=96).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::ForceInsert(i, v)),
            3 => idx.clone().prop_map(Op::Get),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Find(i, d)),
            3 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::Discard),
            1 => (0u64..40).prop_map(Op::Trim),
            1 => ((0u64..40), any::<bool>()).prop_map(|(b, g)| Op::TrimAndRehash(b, g)),
            1 => Just(Op::Rehash),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Reference model: key -> (entry, touch), plus the touch counter.
#[derive(Default)]
struct Model {
    map: HashMap<String, (i32, u64)>,
    max_touch: u64,
    capacity: usize,
}

impl Model {
    fn stamp(&mut self) -> u64 {
        self.max_touch += 1;
        self.max_touch
    }

    fn touch(&mut self, k: &str) -> Option<i32> {
        let t = self.stamp();
        let slot = self.map.get_mut(k)?;
        slot.1 = t;
        Some(slot.0)
    }

    fn oldest(&self) -> Option<String> {
        self.map
            .iter()
            .min_by_key(|(_, (_, t))| *t)
            .map(|(k, _)| k.clone())
    }

    fn drop_below(&mut self, floor: u64) {
        self.map.retain(|_, (_, t)| *t >= floor);
    }
}

fn new_sut() -> Sut {
    let hooks = FnHooks::new().with_hash(|k: &[u8]| k[0] as u32);
    Table::with_hooks(START_CAPACITY, hooks).unwrap()
}

fn snapshot(t: &Sut) -> HashMap<String, (i32, u64)> {
    (0..t.capacity())
        .filter_map(|i| match t.slot(i)? {
            SlotRef::Occupied {
                key, entry, touch, ..
            } => Some((key.clone(), (*entry, touch))),
            _ => None,
        })
        .collect()
}

// Property: state-machine equivalence against a touch-tracking HashMap model.
// Invariants exercised across random operation sequences:
// - Every live key stays reachable through its probe chain across removals,
//   lookup compaction, evictions, trims and rebuilds.
// - Plain insert fails with TableFull exactly when the table is full and the
//   key is new, and then hands the pair back.
// - force_insert evicts exactly the least recently touched entry.
// - Touch indices, max_touch and len/free bookkeeping match the model.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut = new_sut();
        let mut model = Model { capacity: START_CAPACITY, ..Model::default() };

        for op in ops {
            match op {
                Op::Insert(i, v) | Op::ForceInsert(i, v) => {
                    let force = matches!(op, Op::ForceInsert(..));
                    let k = pool[i].clone();
                    let present = model.map.contains_key(&k);
                    let full = model.map.len() == model.capacity;
                    let res = if force {
                        sut.force_insert(k.clone(), v)
                    } else {
                        sut.insert(k.clone(), v)
                    };
                    match res {
                        Ok(Insertion::Replaced) => {
                            prop_assert!(present);
                            let t = model.stamp();
                            model.map.insert(k, (v, t));
                        }
                        Ok(Insertion::Inserted) => {
                            prop_assert!(!present && !full);
                            let t = model.stamp();
                            model.map.insert(k, (v, t));
                        }
                        Ok(Insertion::Evicted) => {
                            prop_assert!(force && !present && full);
                            let victim = model.oldest().expect("full model is non-empty");
                            prop_assert!(!sut.contains_key(&victim), "victim must be the oldest");
                            model.map.remove(&victim);
                            let t = model.stamp();
                            model.map.insert(k, (v, t));
                        }
                        Err(e) => {
                            prop_assert_eq!(e.kind(), TableError::TableFull);
                            prop_assert!(!force && !present && full);
                            prop_assert_eq!(e.into_parts(), (k, v));
                        }
                    }
                }
                Op::Get(i) => {
                    let k = &pool[i];
                    let got = sut.get(k).copied();
                    let expected = if model.map.contains_key(k) { model.touch(k) } else { None };
                    prop_assert_eq!(got, expected);
                }
                Op::Find(i, d) => {
                    let k = &pool[i];
                    let got = sut.find(k).map(|v| {
                        *v = v.wrapping_add(d);
                        *v
                    });
                    if model.map.contains_key(k) {
                        model.touch(k);
                        let slot = model.map.get_mut(k).expect("present");
                        slot.0 = slot.0.wrapping_add(d);
                        prop_assert_eq!(got, Some(slot.0));
                    } else {
                        prop_assert_eq!(got, None);
                    }
                }
                Op::Remove(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.remove(k), model.map.remove(k).map(|(v, _)| v));
                }
                Op::Discard(i) => {
                    let k = &pool[i];
                    let expected = match model.map.remove(k) {
                        Some(_) => Ok(()),
                        None => Err(TableError::NotFound),
                    };
                    prop_assert_eq!(sut.discard(k), expected);
                }
                Op::Trim(back) => {
                    let floor = model.max_touch.saturating_sub(back);
                    let before = model.map.len();
                    model.drop_below(floor);
                    let report = sut.trim(floor);
                    prop_assert_eq!(report.discarded, before - model.map.len());
                    prop_assert!(report.passes >= 1);
                }
                Op::TrimAndRehash(back, grow) => {
                    let floor = model.max_touch.saturating_sub(back);
                    let requested = if grow && model.capacity < MAX_CAPACITY { 0 } else { model.capacity };
                    let before = model.map.len();
                    model.drop_below(floor);
                    for (_, t) in model.map.values_mut() {
                        *t -= floor;
                    }
                    model.max_touch -= floor;
                    if requested == 0 {
                        model.capacity *= 2;
                    }
                    let res = sut.trim_and_rehash(requested, floor);
                    prop_assert_eq!(res, Ok(Resize::Rebuilt {
                        capacity: model.capacity,
                        discarded: before - model.map.len(),
                    }));
                }
                Op::Rehash => {
                    if model.capacity < MAX_CAPACITY {
                        model.capacity *= 2;
                        prop_assert_eq!(sut.rehash(0), Ok(Resize::Rebuilt { capacity: model.capacity, discarded: 0 }));
                    } else {
                        prop_assert_eq!(sut.rehash(model.capacity), Ok(Resize::Unchanged));
                    }
                }
            }

            // Invariants after each step
            prop_assert_eq!(sut.capacity(), model.capacity);
            prop_assert_eq!(sut.len(), model.map.len());
            prop_assert_eq!(sut.len() + sut.free(), sut.capacity());
            prop_assert_eq!(sut.max_touch(), model.max_touch);
            prop_assert_eq!(&snapshot(&sut), &model.map);
            for k in model.map.keys() {
                prop_assert!(sut.contains_key(k), "live key {:?} must be reachable", k);
            }
        }
    }
}

// Property: trim always reaches a fixed point, after which every survivor is
// reachable and a second trim at the same floor moves nothing.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_trim_reaches_fixed_point(
        keys in proptest::collection::hash_set("[a-c][a-z]{1,4}", 1..=64),
        floor in 0u64..64,
    ) {
        let mut sut = new_sut();
        for (i, k) in keys.iter().enumerate() {
            sut.insert(k.clone(), i as i32).unwrap();
        }
        let report = sut.trim(floor);
        prop_assert!(report.passes <= report.relocated + 1);
        let expected = keys.len() - (floor.saturating_sub(1) as usize).min(keys.len());
        prop_assert_eq!(sut.len(), expected);
        for k in &keys {
            let live = snapshot(&sut).contains_key(k);
            prop_assert_eq!(sut.contains_key(k), live);
        }
        let again = sut.trim(floor);
        prop_assert_eq!(again, crate::rehash::TrimReport { discarded: 0, relocated: 0, passes: 1 });
    }
}
