#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can check
// chain/free-list structure and the version counter directly.

use crate::chained_hash_map::ChainedHashMap;
use crate::comparer::KeyComparer;
use crate::error::Error;
use proptest::prelude::*;
use std::collections::HashMap;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Add(usize, i32),
    Set(usize, i32),
    Remove(usize),
    Find(usize),
    Contains(String),
    ContainsValue(i32),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), -8i32..8).prop_map(|(i, v)| OpI::Add(i, v)),
            2 => (idx.clone(), -8i32..8).prop_map(|(i, v)| OpI::Set(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => (-8i32..8).prop_map(OpI::ContainsValue),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `add` rejects duplicates without touching len or version.
// - `set` overwrites in place; overwrite and insert both bump the version.
// - `remove` bumps the version only when something was removed.
// - `clear` bumps the version only when the map was non-empty.
// - Chains and the free list stay consistent after every step.
// - `len` is never above the high-water mark, which never exceeds capacity.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: ChainedHashMap<String, i32> = ChainedHashMap::new();
        let mut model: HashMap<String, i32> = HashMap::new();

        for op in ops {
            let before = sut.version();
            match op {
                OpI::Add(i, v) => {
                    let k = pool[i].clone();
                    let already = model.contains_key(&k);
                    match sut.add(k.clone(), v) {
                        Ok(()) => {
                            prop_assert!(!already, "add must fail on duplicate");
                            prop_assert_eq!(sut.version(), before + 1);
                            model.insert(k, v);
                        }
                        Err(Error::DuplicateKey) => {
                            prop_assert!(already, "duplicate error only when key exists");
                            prop_assert_eq!(sut.version(), before);
                        }
                        Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                    }
                }
                OpI::Set(i, v) => {
                    let k = pool[i].clone();
                    let prev = sut.set(k.clone(), v);
                    prop_assert_eq!(prev, model.insert(k, v));
                    prop_assert_eq!(sut.version(), before + 1);
                }
                OpI::Remove(i) => {
                    let k = &pool[i];
                    let removed = sut.remove(k.as_str());
                    prop_assert_eq!(removed, model.remove(k).is_some());
                    prop_assert_eq!(sut.version(), before + u64::from(removed));
                }
                OpI::Find(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.get(k.as_str()), model.get(k));
                    if let Some(slot) = sut.find(k.as_str()) {
                        prop_assert!(slot < sut.high_water_mark());
                    }
                }
                OpI::Contains(s) => {
                    prop_assert_eq!(sut.contains_key(s.as_str()), model.contains_key(&s));
                }
                OpI::ContainsValue(v) => {
                    prop_assert_eq!(sut.contains_value(&v), model.values().any(|&x| x == v));
                }
                OpI::Clear => {
                    let was_empty = model.is_empty();
                    sut.clear();
                    model.clear();
                    prop_assert_eq!(sut.version(), before + u64::from(!was_empty));
                    if !was_empty {
                        prop_assert_eq!(sut.free_count(), 0);
                    }
                }
                OpI::Iterate => {
                    let seen: HashMap<String, i32> =
                        sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(&seen, &model);
                    prop_assert_eq!(sut.keys().iter().count(), model.len());
                }
            }

            sut.assert_consistent();
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            prop_assert!(sut.len() <= sut.high_water_mark());
            prop_assert!(sut.high_water_mark() <= sut.capacity());
        }
    }
}

// Low-entropy comparer: folds every key into 4 hash values so chains get long
// and removals hit the middle of chains.
#[derive(Clone, Default)]
struct FoldComparer;

impl KeyComparer<str> for FoldComparer {
    fn hash(&self, key: &str) -> u64 {
        key.bytes().map(u64::from).sum::<u64>() % 4
    }
    fn equals(&self, a: &str, b: &str) -> bool {
        a == b
    }
}

impl KeyComparer<String> for FoldComparer {
    fn hash(&self, key: &String) -> u64 {
        KeyComparer::<str>::hash(self, key)
    }
    fn equals(&self, a: &String, b: &String) -> bool {
        a == b
    }
}

// Property: under heavy collisions, slot reuse keeps the high-water mark at
// the peak live count and every surviving key stays reachable.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_collisions_and_slot_reuse(ops in proptest::collection::vec((any::<bool>(), 0u8..40), 1..200)) {
        let mut sut: ChainedHashMap<String, u8, FoldComparer> = ChainedHashMap::with_comparer(FoldComparer);
        let mut model: HashMap<String, u8> = HashMap::new();
        let mut peak = 0usize;

        for (insert, n) in ops {
            let key = format!("key{n}");
            if insert {
                sut.set(key.clone(), n);
                model.insert(key, n);
            } else {
                prop_assert_eq!(sut.remove(key.as_str()), model.remove(&key).is_some());
            }
            peak = peak.max(model.len());
            prop_assert_eq!(sut.high_water_mark(), peak);
            sut.assert_consistent();
        }

        for (k, v) in &model {
            prop_assert_eq!(sut.get(k.as_str()), Some(v));
        }
    }
}
