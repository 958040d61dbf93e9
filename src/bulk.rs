//! Bulk operators: multi-element insertion, erasure and extraction, written
//! on top of the single-entry table and cursor primitives.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::table::{read, write, Table};
use crate::trace::trace_op;

/// What to remove.
#[derive(Debug)]
pub enum Erase<V: HostValue> {
    /// The entry with an equal key, if any.
    Key(V),
    /// The entry under the cursor.
    At(Cursor<V>),
    /// Half-open `[first, last)`; `last` may be `end()`.
    Range(Cursor<V>, Cursor<V>),
}

impl<V: HostValue> Table<V> {
    /// Insert boxed elements in source order, skipping keys already present.
    /// Returns how many were added. If an element fails (bad shape, host
    /// error), the ones before it stay inserted.
    pub fn insert_many<I>(&self, elems: I) -> Result<usize, V>
    where
        I: IntoIterator<Item = V>,
    {
        let mut added = 0;
        for elem in elems {
            let (_, inserted) = self.insert_elem(&elem)?;
            added += usize::from(inserted);
        }
        trace_op!(op = "insert_many", added, "table op");
        Ok(added)
    }

    /// Insert the elements of a host sequence.
    pub fn insert_many_from_seq(&self, seq: &V) -> Result<usize, V> {
        let items = seq
            .as_list()
            .ok_or(Error::TypeMismatch("expected a sequence of elements"))?;
        self.insert_many(items)
    }

    /// Insert a slice of an externally held ordered buffer.
    pub fn insert_many_from_buffer(&self, buf: &[V]) -> Result<usize, V> {
        self.insert_many(buf.iter().cloned())
    }

    /// Insert every entry of `other`, hashed under this table's functions.
    /// Inserting a table into itself adds nothing.
    pub fn insert_many_from_table(&self, other: &Table<V>) -> Result<usize, V> {
        let snapshot: Vec<(V, Option<V>)> = {
            let shared = other.storage()?;
            let s = read(&shared)?;
            let items = s
                .entries
                .iter()
                .map(|(_, k, v)| (k.clone(), v.clone()))
                .collect();
            items
        };
        let keys_only = self.is_set()?;
        if !keys_only && snapshot.iter().any(|(_, v)| v.is_none()) {
            return Err(Error::TypeMismatch(
                "cannot fill a map from a keys-only table",
            ));
        }
        let mut added = 0;
        for (k, v) in snapshot {
            let (_, inserted) = self.insert(k, v.unwrap_or_else(V::unit))?;
            added += usize::from(inserted);
        }
        trace_op!(op = "insert_many_from_table", added, "table op");
        Ok(added)
    }

    /// Remove by key, cursor or cursor range. Returns how many entries were
    /// removed; erasing an absent key returns 0.
    pub fn erase(&self, target: Erase<V>) -> Result<usize, V> {
        let shared = self.storage()?;
        let removed = match target {
            Erase::Key(key) => {
                let (_, slot) = {
                    let s = read(&shared)?;
                    s.locate(&key)?
                };
                let mut s = write(&shared)?;
                slot.and_then(|slot| s.entries.remove(slot))
                    .into_iter()
                    .collect::<Vec<_>>()
            }
            Erase::At(c) => {
                if !c.belongs_to(self, &shared) {
                    return Err(Error::InvalidHandle);
                }
                let mut s = write(&shared)?;
                let slot = c.resolve(&s)?.ok_or(Error::OutOfRange)?;
                s.entries.remove(slot).into_iter().collect::<Vec<_>>()
            }
            Erase::Range(first, last) => {
                if !first.belongs_to(self, &shared) || !last.belongs_to(self, &shared) {
                    return Err(Error::InvalidHandle);
                }
                let mut s = write(&shared)?;
                let stop = last.resolve(&s)?;
                let mut at = first.resolve(&s)?;
                let mut doomed = Vec::new();
                // Walk the whole range before removing anything, so an
                // unreachable `last` leaves the table untouched.
                while at != stop {
                    let Some(slot) = at else {
                        return Err(Error::OutOfRange);
                    };
                    doomed.push(slot);
                    at = s.entries.get(slot).and_then(|e| e.next);
                }
                doomed
                    .into_iter()
                    .filter_map(|slot| s.entries.remove(slot))
                    .collect::<Vec<_>>()
            }
        };
        let n = removed.len();
        trace_op!(op = "erase", removed = n, "table op");
        drop(removed);
        Ok(n)
    }

    /// Elements in iteration order (`key => value`, or keys in keys-only
    /// mode).
    pub fn to_vec(&self) -> Result<Vec<V>, V> {
        let mut out = Vec::new();
        self.fill_vec(&mut out)?;
        Ok(out)
    }

    /// Append the table's elements to `out`, in iteration order.
    pub fn fill_vec(&self, out: &mut Vec<V>) -> Result<(), V> {
        let shared = self.storage()?;
        let s = read(&shared)?;
        out.reserve(s.entries.len());
        out.extend(s.entries.iter().map(|(_, k, v)| s.element(k, v)));
        Ok(())
    }
}
