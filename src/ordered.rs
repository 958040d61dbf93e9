//! Ordered queries over an unordered table.
//!
//! The table keeps no order of its own, so every query here is a full scan
//! of the keys: O(n) per call, with one host comparison or two per key.
//! The ordering is a host-supplied `less(a, b)` predicate, independent of
//! the table's hash and equality. It should be a strict total order; if it
//! is not, answers are unspecified but every call still terminates.

use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::table::{read, Table};

/// Bounds to search around. A single query value is `first == last`.
#[derive(Clone, Debug)]
pub struct RangeSpec<V> {
    pub first: V,
    pub last: V,
}

impl<V: HostValue> RangeSpec<V> {
    pub fn new(first: V, last: V) -> Self {
        Self { first, last }
    }

    pub fn point(q: V) -> Self {
        Self {
            first: q.clone(),
            last: q,
        }
    }
}

/// A table paired with an ordering predicate.
#[derive(Debug)]
pub struct OrderedView<'t, V: HostValue> {
    table: &'t Table<V>,
    less: V,
}

impl<V: HostValue> Table<V> {
    pub fn ordered(&self, less: &V) -> Result<OrderedView<'_, V>, V> {
        if !less.accepts(2) {
            return Err(Error::TypeMismatch(
                "ordering predicate must accept two arguments",
            ));
        }
        Ok(OrderedView {
            table: self,
            less: less.clone(),
        })
    }
}

#[derive(Copy, Clone)]
enum Closest {
    Greatest,
    Least,
}

impl<'t, V: HostValue> OrderedView<'t, V> {
    fn less(&self, a: &V, b: &V) -> Result<bool, V> {
        let r = self
            .less
            .call(&[a.clone(), b.clone()])
            .map_err(Error::Host)?;
        r.as_bool()
            .ok_or(Error::TypeMismatch("ordering predicate must return a boolean"))
    }

    /// Snapshot of the keys, so the predicate runs without a borrow held.
    fn keys(&self) -> Result<Vec<V>, V> {
        let shared = self.table.storage()?;
        let s = read(&shared)?;
        let keys = s.entries.iter().map(|(_, k, _)| k.clone()).collect();
        Ok(keys)
    }

    /// Among keys accepted by `admit`, the greatest or least one.
    fn closest<F>(&self, mut admit: F, pick: Closest) -> Result<Option<V>, V>
    where
        F: FnMut(&V) -> Result<bool, V>,
    {
        let mut best: Option<V> = None;
        for k in self.keys()? {
            if !admit(&k)? {
                continue;
            }
            let better = match &best {
                None => true,
                Some(b) => match pick {
                    Closest::Greatest => self.less(b, &k)?,
                    Closest::Least => self.less(&k, b)?,
                },
            };
            if better {
                best = Some(k);
            }
        }
        Ok(best)
    }

    /// Presence test under the table's own equality.
    pub fn member(&self, key: &V) -> Result<bool, V> {
        Ok(self.table.count(key)? == 1)
    }

    /// Greatest key not after `range.first`, least key not before
    /// `range.last`. `None` on a side with no such key.
    pub fn bounding_keys(&self, range: &RangeSpec<V>) -> Result<(Option<V>, Option<V>), V> {
        let lower = self.closest(
            |k| Ok(!self.less(&range.first, k)?),
            Closest::Greatest,
        )?;
        let upper = self.closest(|k| Ok(!self.less(k, &range.last)?), Closest::Least)?;
        Ok((lower, upper))
    }

    /// The closest key strictly before `key`.
    pub fn prev_key(&self, key: &V) -> Result<Option<V>, V> {
        self.closest(|k| self.less(k, key), Closest::Greatest)
    }

    /// The closest key strictly after `key`.
    pub fn next_key(&self, key: &V) -> Result<Option<V>, V> {
        self.closest(|k| self.less(key, k), Closest::Least)
    }
}
