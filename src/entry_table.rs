//! EntryTable: structural layer with generational slots and a hash index.
//!
//! The table never hashes or compares keys itself. Callers pass the
//! precomputed hash and an equality probe; each entry keeps its hash so the
//! index can grow without calling back into the host. Entries are threaded
//! on an intrusive list, which gives cursors a successor to step to in O(1)
//! and keeps a removed slot from disturbing the order of the rest.

use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};

/// Generational position of an entry. A slot whose entry was removed never
/// resolves again, even if the physical storage is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Slot(DefaultKey);

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

/// Borrowed view of one live entry.
pub(crate) struct EntryRef<'a, K, V> {
    pub(crate) key: &'a K,
    pub(crate) value: &'a V,
    pub(crate) next: Option<Slot>,
}

#[derive(Debug)]
pub(crate) struct EntryTable<K, V> {
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<K, V> Default for EntryTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> EntryTable<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashTable::new(),
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Probe for `hash`, asking `eq` about each candidate key. The first
    /// error from `eq` stops the probe and is returned.
    pub(crate) fn try_find<E, F>(&self, hash: u64, mut eq: F) -> Result<Option<Slot>, E>
    where
        F: FnMut(&K) -> Result<bool, E>,
    {
        let mut failed = None;
        let found = self.index.find(hash, |&k| {
            if failed.is_some() {
                return false;
            }
            let Some(e) = self.slots.get(k) else {
                return false;
            };
            if e.hash != hash {
                return false;
            }
            match eq(&e.key) {
                Ok(hit) => hit,
                Err(err) => {
                    failed = Some(err);
                    false
                }
            }
        });
        match failed {
            Some(err) => Err(err),
            None => Ok(found.map(|&k| Slot(k))),
        }
    }

    /// Append a new entry. The caller has already established that no equal
    /// key is present.
    pub(crate) fn insert_unique(&mut self, hash: u64, key: K, value: V) -> Slot {
        let prev = self.tail;
        let k = self.slots.insert(Entry {
            key,
            value,
            hash,
            prev,
            next: None,
        });
        match prev {
            Some(p) => {
                if let Some(pe) = self.slots.get_mut(p) {
                    pe.next = Some(k);
                }
            }
            None => self.head = Some(k),
        }
        self.tail = Some(k);

        let slots = &self.slots;
        self.index
            .insert_unique(hash, k, |kk| slots.get(*kk).map(|e| e.hash).unwrap_or(0));
        Slot(k)
    }

    pub(crate) fn remove(&mut self, slot: Slot) -> Option<(K, V)> {
        let k = slot.0;
        let entry = self.slots.remove(k)?;

        match entry.prev {
            Some(p) => {
                if let Some(pe) = self.slots.get_mut(p) {
                    pe.next = entry.next;
                }
            }
            None => self.head = entry.next,
        }
        match entry.next {
            Some(n) => {
                if let Some(ne) = self.slots.get_mut(n) {
                    ne.prev = entry.prev;
                }
            }
            None => self.tail = entry.prev,
        }

        if let Ok(occupied) = self.index.find_entry(entry.hash, |&kk| kk == k) {
            occupied.remove();
        }
        Some((entry.key, entry.value))
    }

    pub(crate) fn contains(&self, slot: Slot) -> bool {
        self.slots.contains_key(slot.0)
    }

    pub(crate) fn get(&self, slot: Slot) -> Option<EntryRef<'_, K, V>> {
        self.slots.get(slot.0).map(|e| EntryRef {
            key: &e.key,
            value: &e.value,
            next: e.next.map(Slot),
        })
    }

    pub(crate) fn value_mut(&mut self, slot: Slot) -> Option<&mut V> {
        self.slots.get_mut(slot.0).map(|e| &mut e.value)
    }

    pub(crate) fn first(&self) -> Option<Slot> {
        self.head.map(Slot)
    }

    /// Remove every entry and hand them back, so the caller can drop them
    /// after releasing its borrow. Slot versions are bumped, so no earlier
    /// slot resolves again.
    pub(crate) fn clear(&mut self) -> Vec<(K, V)> {
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.slots.drain().map(|(_, e)| (e.key, e.value)).collect()
    }

    /// Entries in list order.
    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            table: self,
            at: self.head,
        }
    }
}

pub(crate) struct Iter<'a, K, V> {
    table: &'a EntryTable<K, V>,
    at: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Slot, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.at?;
        let e = self.table.slots.get(k)?;
        self.at = e.next;
        Some((Slot(k), &e.key, &e.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn h(s: &str) -> u64 {
        let mut st = DefaultHasher::new();
        s.hash(&mut st);
        st.finish()
    }

    fn find(m: &EntryTable<String, i32>, k: &str) -> Option<Slot> {
        m.try_find::<(), _>(h(k), |kk| Ok(kk == k)).unwrap()
    }

    fn put(m: &mut EntryTable<String, i32>, k: &str, v: i32) -> Slot {
        assert!(find(m, k).is_none());
        m.insert_unique(h(k), k.to_string(), v)
    }

    fn keys(m: &EntryTable<String, i32>) -> Vec<String> {
        m.iter().map(|(_, k, _)| k.clone()).collect()
    }

    /// Invariant: `find` resolves present keys to the slot returned on insert.
    #[test]
    fn find_resolves_inserted_slots() {
        let mut m = EntryTable::new();
        let a = put(&mut m, "a", 1);
        let b = put(&mut m, "b", 2);
        assert_eq!(find(&m, "a"), Some(a));
        assert_eq!(find(&m, "b"), Some(b));
        assert_eq!(find(&m, "c"), None);
        assert_eq!(m.len(), 2);
    }

    /// Invariant: Removing an entry invalidates its slot and does not alias a new
    /// entry inserted afterward, even if the physical slot is reused.
    #[test]
    fn stale_slot_does_not_alias_new_entry() {
        let mut m = EntryTable::new();
        let s1 = put(&mut m, "old", 1);
        assert_eq!(m.remove(s1), Some(("old".to_string(), 1)));
        let s2 = put(&mut m, "new", 2);
        assert_ne!(s1, s2);
        assert!(m.get(s1).is_none());
        assert!(!m.contains(s1));
        assert!(m.remove(s1).is_none());
        assert_eq!(*m.get(s2).unwrap().value, 2);
    }

    /// Invariant: the intrusive list follows insertion order and survives
    /// removal of head, middle and tail.
    #[test]
    fn list_order_survives_removals() {
        let mut m = EntryTable::new();
        let slots: Vec<Slot> = ["a", "b", "c", "d", "e"]
            .iter()
            .enumerate()
            .map(|(i, k)| put(&mut m, k, i as i32))
            .collect();
        assert_eq!(keys(&m), ["a", "b", "c", "d", "e"]);

        m.remove(slots[2]);
        assert_eq!(keys(&m), ["a", "b", "d", "e"]);
        m.remove(slots[0]);
        assert_eq!(keys(&m), ["b", "d", "e"]);
        m.remove(slots[4]);
        assert_eq!(keys(&m), ["b", "d"]);

        let f = put(&mut m, "f", 5);
        assert_eq!(keys(&m), ["b", "d", "f"]);
        assert_eq!(m.first(), Some(slots[1]));
        assert_eq!(m.get(slots[3]).unwrap().next, Some(f));
        assert_eq!(m.get(f).unwrap().next, None);
    }

    /// Invariant: Lookups work under heavy hash collisions; equality resolves to the
    /// correct entry.
    #[test]
    fn collisions_resolved_by_equality() {
        let mut m: EntryTable<String, i32> = EntryTable::new();
        let a = m.insert_unique(0, "a".to_string(), 1);
        let b = m.insert_unique(0, "b".to_string(), 2);
        let fa = m.try_find::<(), _>(0, |k| Ok(k == "a")).unwrap();
        let fb = m.try_find::<(), _>(0, |k| Ok(k == "b")).unwrap();
        assert_eq!(fa, Some(a));
        assert_eq!(fb, Some(b));
        m.remove(a);
        assert_eq!(m.try_find::<(), _>(0, |k| Ok(k == "b")).unwrap(), Some(b));
    }

    /// Invariant: the first probe error aborts the lookup and is returned as is.
    #[test]
    fn probe_error_is_returned() {
        let mut m: EntryTable<String, i32> = EntryTable::new();
        m.insert_unique(7, "a".to_string(), 1);
        let r = m.try_find(7, |_| Err("probe failed"));
        assert_eq!(r, Err("probe failed"));
    }

    /// Invariant: growing the index keeps every entry reachable (stored hashes
    /// are reused, nothing is rehashed through the caller).
    #[test]
    fn growth_keeps_entries_reachable() {
        let mut m = EntryTable::new();
        let names: Vec<String> = (0..500).map(|i| format!("k{i}")).collect();
        for (i, k) in names.iter().enumerate() {
            put(&mut m, k, i as i32);
        }
        for (i, k) in names.iter().enumerate() {
            let s = find(&m, k).expect("present");
            assert_eq!(*m.get(s).unwrap().value, i as i32);
        }
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut m = EntryTable::new();
        let a = put(&mut m, "a", 1);
        assert_eq!(m.clear(), vec![("a".to_string(), 1)]);
        assert!(m.is_empty());
        assert!(m.first().is_none());
        assert!(m.get(a).is_none());
        let b = put(&mut m, "a", 2);
        assert_ne!(a, b);
        if let Some(v) = m.value_mut(b) {
            *v += 1;
        }
        assert_eq!(*m.get(b).unwrap().value, 3);
    }
}
