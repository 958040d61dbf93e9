//! Hash/equality adapter: turns the host's two callables into the hash and
//! probe functions the index needs.
//!
//! A four-entry lookaside cache remembers the hash codes of the keys most
//! recently hashed, keyed on host identity, so a key probed several times
//! in a row (erase then reinsert, find then update) costs one host call.
//! The cache is invisible to callers: any miss goes to the host.

use core::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::host::HostValue;

pub(crate) const RECENT_HASHES: usize = 4;

/// Oldest-first bounded memo of `key identity -> hash code`.
#[derive(Debug)]
pub(crate) struct RecentHashes<V> {
    entries: VecDeque<(V, u64)>,
}

impl<V: HostValue> RecentHashes<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(RECENT_HASHES),
        }
    }

    pub(crate) fn get(&self, key: &V) -> Option<u64> {
        self.entries
            .iter()
            .find(|(k, _)| k.same(key))
            .map(|&(_, h)| h)
    }

    pub(crate) fn remember(&mut self, key: &V, hash: u64) {
        if self.get(key).is_some() {
            return;
        }
        if self.entries.len() == RECENT_HASHES {
            self.entries.pop_front();
        }
        self.entries.push_back((key.clone(), hash));
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Strategy object holding the host hash and equality callables.
#[derive(Debug)]
pub(crate) struct HashEq<V> {
    hash_fn: V,
    eq_fn: V,
    recent: RefCell<RecentHashes<V>>,
}

impl<V: HostValue> HashEq<V> {
    /// Fails with `Config` unless `hash_fn` takes one argument and `eq_fn`
    /// takes two.
    pub(crate) fn new(hash_fn: V, eq_fn: V) -> Result<Self, V> {
        if !hash_fn.accepts(1) {
            return Err(Error::Config("hash function must accept one argument"));
        }
        if !eq_fn.accepts(2) {
            return Err(Error::Config("equality function must accept two arguments"));
        }
        Ok(Self {
            hash_fn,
            eq_fn,
            recent: RefCell::new(RecentHashes::new()),
        })
    }

    pub(crate) fn hash_fn(&self) -> &V {
        &self.hash_fn
    }

    pub(crate) fn eq_fn(&self) -> &V {
        &self.eq_fn
    }

    pub(crate) fn hash(&self, key: &V) -> Result<u64, V> {
        if let Some(h) = self.recent.borrow().get(key) {
            return Ok(h);
        }
        let code = self
            .hash_fn
            .call(core::slice::from_ref(key))
            .map_err(Error::Host)?;
        let code = code
            .as_int()
            .ok_or(Error::TypeMismatch("hash function must return an integer"))?;
        // Sign is irrelevant to bucket choice; keep the bit pattern.
        let h = code as u64;
        self.recent.borrow_mut().remember(key, h);
        Ok(h)
    }

    pub(crate) fn eq(&self, a: &V, b: &V) -> Result<bool, V> {
        let r = self
            .eq_fn
            .call(&[a.clone(), b.clone()])
            .map_err(Error::Host)?;
        r.as_bool()
            .ok_or(Error::TypeMismatch("equality function must return a boolean"))
    }

    /// Drop memoized hashes, releasing the cached key references.
    pub(crate) fn forget(&self) {
        self.recent.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple::{self, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_hash(calls: Rc<Cell<usize>>) -> Value {
        Value::func("counting-hash", 1, move |args| {
            calls.set(calls.get() + 1);
            simple::hash_of(&args[0])
        })
    }

    #[test]
    fn rejects_wrong_arity() {
        let r = HashEq::new(simple::eq_fn(), simple::eq_fn());
        assert!(matches!(r, Err(Error::Config(_))));
        let r = HashEq::new(simple::hash_fn(), simple::hash_fn());
        assert!(matches!(r, Err(Error::Config(_))));
        let r = HashEq::new(Value::Int(3), simple::eq_fn());
        assert!(matches!(r, Err(Error::Config(_))));
    }

    #[test]
    fn repeated_probe_of_same_key_hits_cache() {
        let calls = Rc::new(Cell::new(0));
        let he = HashEq::new(counting_hash(calls.clone()), simple::eq_fn()).unwrap();
        let k = Value::str("key");
        let h1 = he.hash(&k).unwrap();
        let h2 = he.hash(&k).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(calls.get(), 1);

        // Structurally equal but a different object: the cache is identity based.
        let h3 = he.hash(&Value::str("key")).unwrap();
        assert_eq!(h1, h3);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn oldest_entry_is_evicted_first() {
        let calls = Rc::new(Cell::new(0));
        let he = HashEq::new(counting_hash(calls.clone()), simple::eq_fn()).unwrap();
        let keys: Vec<Value> = (0..5).map(|i| Value::str(&format!("k{i}"))).collect();
        for k in &keys {
            he.hash(k).unwrap();
        }
        assert_eq!(calls.get(), 5);
        assert_eq!(he.recent.borrow().len(), RECENT_HASHES);

        // k0 was pushed out by k4; k4 is still cached.
        he.hash(&keys[4]).unwrap();
        assert_eq!(calls.get(), 5);
        he.hash(&keys[0]).unwrap();
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn non_integer_hash_is_a_type_mismatch() {
        let bad = Value::func("bad-hash", 1, |_| Ok(Value::str("nope")));
        let he = HashEq::new(bad, simple::eq_fn()).unwrap();
        assert!(matches!(
            he.hash(&Value::Int(1)),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn host_failure_passes_through() {
        let eq = Value::func("failing-eq", 2, |_| Err(simple::Fault::new("boom")));
        let he = HashEq::new(simple::hash_fn(), eq).unwrap();
        match he.eq(&Value::Int(1), &Value::Int(1)) {
            Err(Error::Host(f)) => assert_eq!(f.to_string(), "boom"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
