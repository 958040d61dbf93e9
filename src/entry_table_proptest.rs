#![cfg(test)]

// Property tests for EntryTable kept inside the crate so they can reach the
// private structural layer.

use crate::entry_table::{EntryTable, Slot};
use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Find(usize),
    Mutate(usize, i32),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Find),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn default_hash(s: &str) -> u64 {
    let mut h = DefaultHasher::new();
    s.hash(&mut h);
    h.finish()
}

fn const_hash(_: &str) -> u64 {
    0
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Probing finds exactly the keys the model holds; the slot returned on insert is
//   the slot later found.
// - `remove(slot)` returns the owned key/value matching the model and invalidates the slot.
// - Iteration yields each live entry exactly once, in insertion order of the survivors.
// - Stale slots never resolve; `len`/`is_empty` parity with the model after each op.
fn run_state_machine(
    hash: fn(&str) -> u64,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut sut: EntryTable<String, i32> = EntryTable::new();
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut live: HashMap<String, Slot> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut stale: Vec<Slot> = Vec::new();

    let find = |sut: &EntryTable<String, i32>, k: &str| {
        sut.try_find::<(), _>(hash(k), |kk| Ok(kk == k))
            .expect("infallible probe")
    };

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                match find(&sut, &k) {
                    Some(s) => {
                        prop_assert!(already, "found a key the model lacks");
                        prop_assert_eq!(Some(&s), live.get(&k));
                    }
                    None => {
                        prop_assert!(!already, "missed a key the model holds");
                        let s = sut.insert_unique(hash(&k), k.clone(), v);
                        live.insert(k.clone(), s);
                        order.push(k.clone());
                        model.insert(k, v);
                    }
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                if let Some(s) = live.remove(k) {
                    let (kk, vv) = sut.remove(s).expect("live slot removable");
                    prop_assert_eq!(&kk, k);
                    prop_assert_eq!(Some(vv), model.remove(k));
                    order.retain(|o| o != k);
                    stale.push(s);
                } else {
                    prop_assert!(find(&sut, k).is_none());
                }
            }
            OpI::Find(i) => {
                let k = &pool[i];
                let s = find(&sut, k);
                prop_assert_eq!(s.is_some(), model.contains_key(k));
                if let Some(s) = s {
                    prop_assert_eq!(Some(&s), live.get(k));
                    prop_assert_eq!(sut.get(s).map(|e| *e.value), model.get(k).copied());
                }
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                if let Some(&s) = live.get(k) {
                    let vr = sut.value_mut(s).expect("live slot resolves");
                    *vr = vr.saturating_add(d);
                    if let Some(mv) = model.get_mut(k) {
                        *mv = mv.saturating_add(d);
                    }
                }
            }
            OpI::Clear => {
                let drained = sut.clear();
                prop_assert_eq!(drained.len(), model.len());
                stale.extend(live.drain().map(|(_, s)| s));
                model.clear();
                order.clear();
            }
            OpI::Iterate => {
                let s_keys: Vec<String> = sut.iter().map(|(_, k, _)| k.clone()).collect();
                prop_assert_eq!(&s_keys, &order);
                let unique: BTreeSet<_> = s_keys.iter().collect();
                prop_assert_eq!(unique.len(), s_keys.len());
            }
        }

        for &s in &stale {
            prop_assert!(sut.get(s).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.first().is_none(), model.is_empty());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(default_hash, pool, ops)?;
    }

    // Same invariants under worst-case collision behavior (constant hash). This
    // stresses equality probing and collision resolution in the index.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(const_hash, pool, ops)?;
    }
}
