#![cfg(test)]

// Property tests for ChainedHashTable against a std::collections::HashMap
// model, kept inside the crate next to the unit tests.

use crate::chained_hash_table::{ChainedHashTable, PutOutcome};
use crate::config::TableConfig;
use crate::error::TableError;
use crate::hasher::{KeyEq, KeyHasher, NaturalEq};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

// Pool-indexed operations so shrinking converges on earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Put(usize, i32, bool),
    Remove(usize),
    Get(usize),
    Contains(String),
    Resize(u32),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=10).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>(), any::<bool>()).prop_map(|(i, v, f)| Op::Put(i, v, f)),
            2 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => "[a-z]{0,5}".prop_map(Op::Contains),
            1 => (1u32..40).prop_map(Op::Resize),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn check_chains<K, V, H, E>(t: &ChainedHashTable<K, V, H, E>) -> Result<(), TestCaseError>
where
    K: Clone + Ord,
    V: Clone + PartialEq + core::fmt::Debug,
    H: KeyHasher<K>,
    E: KeyEq<K>,
{
    // every stored entry must be reachable through its own chain
    let via_iter: BTreeMap<K, V> = t.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    prop_assert_eq!(via_iter.len(), t.count() as usize, "duplicate keys in table");
    for (k, v) in &via_iter {
        prop_assert_eq!(t.get(k), Some(v), "stored key not reachable through its chain");
    }
    Ok(())
}

fn run<H, E>(mut sut: ChainedHashTable<String, i32, H, E>, pool: Vec<String>, ops: Vec<Op>) -> Result<(), TestCaseError>
where
    H: KeyHasher<String>,
    E: KeyEq<String>,
{
    let mut model: HashMap<String, i32> = HashMap::new();

    for op in ops {
        match op {
            Op::Put(i, v, force) => {
                let k = pool[i].clone();
                let prior = model.get(&k).copied();
                let outcome = sut.put(k.clone(), v, force);
                match (prior, force) {
                    (None, _) => {
                        prop_assert_eq!(outcome, Ok(PutOutcome::Inserted));
                        model.insert(k, v);
                    }
                    (Some(old), true) => {
                        prop_assert_eq!(outcome, Ok(PutOutcome::Replaced(old)));
                        model.insert(k, v);
                    }
                    (Some(_), false) => {
                        prop_assert_eq!(outcome, Ok(PutOutcome::Collision));
                    }
                }
            }
            Op::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k), model.remove(k));
            }
            Op::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
                prop_assert_eq!(sut.contains_key(k), model.contains_key(k));
            }
            Op::Contains(s) => {
                prop_assert_eq!(sut.contains_key(&s), model.contains_key(&s));
            }
            Op::Resize(n) => {
                prop_assert_eq!(sut.resize(n), Ok(()));
                prop_assert_eq!(sut.size(), n);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
            Op::Iterate => {
                let mut via_cursor: BTreeMap<String, i32> = BTreeMap::new();
                sut.reset_cursor();
                while let Some((k, v)) = sut.next_entry() {
                    prop_assert!(via_cursor.insert(k.clone(), *v).is_none(), "cursor repeated {}", k);
                }
                let expected: BTreeMap<String, i32> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(via_cursor, expected);
            }
        }

        prop_assert_eq!(sut.count() as usize, model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        check_chains(&sut)?;
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `put` reports Inserted/Replaced/Collision exactly as the model predicts.
// - `get`/`contains_key`/`remove` agree with the model.
// - `resize` is lossless; `count` tracks live keys after every step.
// - A cursor pass yields each live entry exactly once.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), size in 1u32..32) {
        let sut: ChainedHashTable<String, i32> = ChainedHashTable::with_size(size).unwrap();
        run(sut, pool, ops)?;
    }
}

fn collide(_: &String) -> u32 {
    7
}

// Property: same invariants with every key in one chain, stressing
// head/middle/tail unlinking and equality resolution.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(), size in 1u32..8) {
        let sut = ChainedHashTable::with_hasher_and_eq(size, collide as fn(&String) -> u32, NaturalEq).unwrap();
        run(sut, pool, ops)?;
    }
}

// Property: with an entry budget, inserts beyond it fail without changing
// the table and the budget is never exceeded.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_entry_budget(keys in proptest::collection::vec(0u16..64, 1..100), budget in 0u32..16) {
        let config = TableConfig::new().bucket_count(13).max_entries(budget);
        let mut sut = ChainedHashTable::with_config(&config, |k: &u16| u32::from(*k), NaturalEq).unwrap();
        let mut model: BTreeMap<u16, ()> = BTreeMap::new();
        for k in keys {
            let res = sut.put(k, (), false);
            if model.contains_key(&k) {
                prop_assert_eq!(res, Ok(PutOutcome::Collision));
            } else if model.len() < budget as usize {
                prop_assert_eq!(res, Ok(PutOutcome::Inserted));
                model.insert(k, ());
            } else {
                prop_assert_eq!(res, Err(TableError::OutOfMemory));
                prop_assert!(!sut.contains_key(&k));
            }
            prop_assert_eq!(sut.count() as usize, model.len());
        }
    }
}
