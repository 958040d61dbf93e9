//! Table: the host-facing handle over an [`EntryTable`] of boxed values.
//!
//! A `Table` is a cheap, clonable handle; clones refer to the same table.
//! The storage behind it (entries, hash/equality adapter, default value and
//! mode) lives in its own `Rc`, so `swap` can exchange two tables' storage
//! in O(1) and cursors can keep the storage they were issued from alive.
//!
//! Every mutation runs in two phases. The first hashes and probes under a
//! shared borrow; this is the only place host callables run, and they may
//! read the table re-entrantly. The second takes the exclusive borrow and
//! touches the structure without calling the host. A host callable that
//! tries to mutate the table it is running inside gets `Error::Reentrant`.

use core::cell::{Ref, RefCell, RefMut};
use core::fmt;
use std::rc::Rc;

use crate::cursor::{Cursor, Position};
use crate::entry_table::{EntryTable, Slot};
use crate::error::{Error, Result};
use crate::hasher::HashEq;
use crate::host::HostValue;
use crate::trace::trace_op;

pub(crate) struct Storage<V> {
    pub(crate) hasher: HashEq<V>,
    pub(crate) default: V,
    pub(crate) keys_only: bool,
    /// Keys-only tables store `None` in every value slot.
    pub(crate) entries: EntryTable<V, Option<V>>,
    /// Set by `destroy`; cursors still holding the storage see `InvalidHandle`.
    pub(crate) retired: bool,
}

pub(crate) type Shared<V> = Rc<RefCell<Storage<V>>>;

pub(crate) fn read<V: HostValue>(s: &Shared<V>) -> Result<Ref<'_, Storage<V>>, V> {
    let r = s.try_borrow().map_err(|_| Error::Reentrant)?;
    if r.retired {
        return Err(Error::InvalidHandle);
    }
    Ok(r)
}

pub(crate) fn write<V: HostValue>(s: &Shared<V>) -> Result<RefMut<'_, Storage<V>>, V> {
    let w = s.try_borrow_mut().map_err(|_| Error::Reentrant)?;
    if w.retired {
        return Err(Error::InvalidHandle);
    }
    Ok(w)
}

impl<V: HostValue> Storage<V> {
    /// Hash `key` and probe for it with the host equality.
    pub(crate) fn locate(&self, key: &V) -> Result<(u64, Option<Slot>), V> {
        let hash = self.hasher.hash(key)?;
        let slot = self.entries.try_find(hash, |k| self.hasher.eq(key, k))?;
        Ok((hash, slot))
    }

    /// `k => v` in map mode, the bare key in keys-only mode.
    pub(crate) fn element(&self, key: &V, value: &Option<V>) -> V {
        match value {
            Some(v) if !self.keys_only => V::pair(key.clone(), v.clone()),
            _ => key.clone(),
        }
    }

    pub(crate) fn project(&self, what: Find, slot: Slot) -> Result<V, V> {
        let e = self.entries.get(slot).ok_or(Error::InvalidHandle)?;
        match what {
            Find::Key => Ok(e.key.clone()),
            Find::Value => Ok(match e.value {
                Some(v) => v.clone(),
                None => V::from_bool(true),
            }),
            Find::Elem => Ok(self.element(e.key, e.value)),
            Find::Cursor | Find::CursorOrDefault => {
                Err(Error::TypeMismatch("expected a key, value or element selector"))
            }
        }
    }
}

/// What a lookup should hand back.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Find {
    Key,
    /// The value, or `true` in keys-only mode.
    Value,
    /// `key => value`, or the key in keys-only mode.
    Elem,
    /// A cursor at the match, `end()` on a miss.
    Cursor,
    /// A cursor at the match, the table default on a miss.
    CursorOrDefault,
}

/// Result of [`Table::find`].
#[derive(Debug)]
pub enum Found<V: HostValue> {
    Value(V),
    Cursor(Cursor<V>),
    Missing,
}

impl<V: HostValue> Found<V> {
    pub fn into_value(self) -> Option<V> {
        match self {
            Found::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_cursor(self) -> Option<Cursor<V>> {
        match self {
            Found::Cursor(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Found::Missing)
    }
}

/// Construction parameters of a table.
#[derive(Clone, Debug)]
pub struct TableConfig<V> {
    hash: V,
    eq: V,
    default: V,
    keys_only: bool,
}

impl<V: HostValue> TableConfig<V> {
    /// Map mode, default value `V::unit()`.
    pub fn new(hash: V, eq: V) -> Self {
        Self {
            hash,
            eq,
            default: V::unit(),
            keys_only: false,
        }
    }

    pub fn default_value(mut self, default: V) -> Self {
        self.default = default;
        self
    }

    pub fn keys_only(mut self, keys_only: bool) -> Self {
        self.keys_only = keys_only;
        self
    }

    pub fn build(self) -> Result<Table<V>, V> {
        let hasher = HashEq::new(self.hash, self.eq)?;
        trace_op!(op = "create", keys_only = self.keys_only, "table op");
        let storage = Storage {
            hasher,
            default: self.default,
            keys_only: self.keys_only,
            entries: EntryTable::new(),
            retired: false,
        };
        Ok(Table {
            shell: Rc::new(Shell {
                storage: RefCell::new(Some(Rc::new(RefCell::new(storage)))),
            }),
        })
    }
}

/// The configuration a table currently carries.
#[derive(Clone, Debug)]
pub struct TableParams<V> {
    pub hash: V,
    pub eq: V,
    pub default: V,
    pub keys_only: bool,
}

struct Shell<V> {
    /// `None` once destroyed.
    storage: RefCell<Option<Shared<V>>>,
}

/// Handle to a host-configured hash table. Cloning the handle does not copy
/// the table.
pub struct Table<V: HostValue> {
    shell: Rc<Shell<V>>,
}

impl<V: HostValue> Clone for Table<V> {
    fn clone(&self) -> Self {
        Self {
            shell: self.shell.clone(),
        }
    }
}

impl<V: HostValue> fmt::Debug for Table<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("id", &Rc::as_ptr(&self.shell))
            .field("len", &self.len().ok())
            .finish()
    }
}

impl<V: HostValue> Table<V> {
    pub fn create(hash: V, eq: V, default: V, keys_only: bool) -> Result<Self, V> {
        TableConfig::new(hash, eq)
            .default_value(default)
            .keys_only(keys_only)
            .build()
    }

    pub(crate) fn storage(&self) -> Result<Shared<V>, V> {
        let slot = self
            .shell
            .storage
            .try_borrow()
            .map_err(|_| Error::Reentrant)?;
        slot.as_ref().cloned().ok_or(Error::InvalidHandle)
    }

    /// True when both handles name the same table.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shell, &other.shell)
    }

    pub fn is_live(&self) -> bool {
        self.storage().is_ok()
    }

    /// Release the table's contents. Every later operation through any
    /// handle or cursor of this table fails with `InvalidHandle`.
    pub fn destroy(&self) -> Result<(), V> {
        let shared = self.storage()?;
        let dropped = {
            let mut s = write(&shared)?;
            s.retired = true;
            s.hasher.forget();
            s.entries.clear()
        };
        *self.shell.storage.borrow_mut() = None;
        trace_op!(op = "destroy", dropped = dropped.len(), "table op");
        drop(dropped);
        Ok(())
    }

    pub fn len(&self) -> Result<usize, V> {
        let shared = self.storage()?;
        let s = read(&shared)?;
        Ok(s.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, V> {
        let shared = self.storage()?;
        let s = read(&shared)?;
        Ok(s.entries.is_empty())
    }

    /// Keys-only ("set") mode.
    pub fn is_set(&self) -> Result<bool, V> {
        let shared = self.storage()?;
        let s = read(&shared)?;
        Ok(s.keys_only)
    }

    pub fn parameters(&self) -> Result<TableParams<V>, V> {
        let shared = self.storage()?;
        let s = read(&shared)?;
        let params = TableParams {
            hash: s.hasher.hash_fn().clone(),
            eq: s.hasher.eq_fn().clone(),
            default: s.default.clone(),
            keys_only: s.keys_only,
        };
        Ok(params)
    }

    /// 1 if an equal key is present, else 0.
    pub fn count(&self, key: &V) -> Result<usize, V> {
        let shared = self.storage()?;
        let s = read(&shared)?;
        let (_, slot) = s.locate(key)?;
        Ok(usize::from(slot.is_some()))
    }

    pub fn find(&self, key: &V, what: Find) -> Result<Found<V>, V> {
        let shared = self.storage()?;
        let s = read(&shared)?;
        let (_, slot) = s.locate(key)?;
        let found = match (what, slot) {
            (Find::Cursor | Find::CursorOrDefault, Some(slot)) => Found::Cursor(Cursor::new(
                self.clone(),
                shared.clone(),
                Position::At(slot),
            )),
            (Find::Cursor, None) => {
                Found::Cursor(Cursor::new(self.clone(), shared.clone(), Position::PastEnd))
            }
            (Find::CursorOrDefault, None) => Found::Value(s.default.clone()),
            (_, Some(slot)) => Found::Value(s.project(what, slot)?),
            (_, None) => Found::Missing,
        };
        Ok(found)
    }

    /// The value stored under `key` (`true` in keys-only mode), if any.
    pub fn get(&self, key: &V) -> Result<Option<V>, V> {
        Ok(self.find(key, Find::Value)?.into_value())
    }

    pub fn get_or_default(&self, key: &V) -> Result<V, V> {
        let shared = self.storage()?;
        let s = read(&shared)?;
        let (_, slot) = s.locate(key)?;
        let v = match slot {
            Some(slot) => s.project(Find::Value, slot)?,
            None => s.default.clone(),
        };
        Ok(v)
    }

    /// Insert `key => value` unless an equal key exists. Never overwrites;
    /// the flag reports whether an entry was added and the cursor points at
    /// the entry now holding `key`. Keys-only tables discard `value`.
    pub fn insert(&self, key: V, value: V) -> Result<(Cursor<V>, bool), V> {
        let shared = self.storage()?;
        let (hash, existing) = {
            let s = read(&shared)?;
            s.locate(&key)?
        };
        if let Some(slot) = existing {
            trace_op!(op = "insert", ?key, inserted = false, "table op");
            let c = Cursor::new(self.clone(), shared, Position::At(slot));
            return Ok((c, false));
        }
        let slot = {
            let mut s = write(&shared)?;
            let value = if s.keys_only { None } else { Some(value) };
            s.entries.insert_unique(hash, key, value)
        };
        trace_op!(op = "insert", inserted = true, "table op");
        Ok((Cursor::new(self.clone(), shared, Position::At(slot)), true))
    }

    /// Insert a boxed element: `key => value` in map mode, a bare key in
    /// keys-only mode.
    pub fn insert_elem(&self, elem: &V) -> Result<(Cursor<V>, bool), V> {
        if self.is_set()? {
            return self.insert(elem.clone(), V::unit());
        }
        let (k, v) = elem
            .as_pair()
            .ok_or(Error::TypeMismatch("expected a key => value pair"))?;
        self.insert(k, v)
    }

    /// Insert or overwrite. Returns the previous value, or the table default
    /// when the key was new.
    pub fn update(&self, key: V, value: V) -> Result<V, V> {
        let shared = self.storage()?;
        let (hash, slot, default) = {
            let s = read(&shared)?;
            if s.keys_only {
                return Err(Error::TypeMismatch("keys-only tables have no values to update"));
            }
            let (hash, slot) = s.locate(&key)?;
            (hash, slot, s.default.clone())
        };
        let prev = {
            let mut s = write(&shared)?;
            match slot {
                Some(slot) => s
                    .entries
                    .value_mut(slot)
                    .ok_or(Error::InvalidHandle)?
                    .replace(value),
                None => {
                    s.entries.insert_unique(hash, key, Some(value));
                    None
                }
            }
        };
        trace_op!(op = "update", replaced = prev.is_some(), "table op");
        Ok(prev.unwrap_or(default))
    }

    /// Replace the value under `key` with `f(old)`, or insert `f(default)`.
    /// `f` runs exactly once; if it fails the table is unchanged.
    pub fn update_with(&self, key: V, f: &V) -> Result<V, V> {
        if !f.accepts(1) {
            return Err(Error::TypeMismatch("update function must accept one argument"));
        }
        let shared = self.storage()?;
        let (hash, slot, new) = {
            let s = read(&shared)?;
            if s.keys_only {
                return Err(Error::TypeMismatch("keys-only tables have no values to update"));
            }
            let (hash, slot) = s.locate(&key)?;
            let old = slot
                .and_then(|sl| s.entries.get(sl))
                .and_then(|e| e.value.clone())
                .unwrap_or_else(|| s.default.clone());
            let new = f.call(&[old]).map_err(Error::Host)?;
            (hash, slot, new)
        };
        let old = {
            let mut s = write(&shared)?;
            match slot {
                Some(slot) => s
                    .entries
                    .value_mut(slot)
                    .ok_or(Error::InvalidHandle)?
                    .replace(new.clone()),
                None => {
                    s.entries.insert_unique(hash, key, Some(new.clone()));
                    None
                }
            }
        };
        trace_op!(op = "update_with", replaced = old.is_some(), "table op");
        drop(old);
        Ok(new)
    }

    /// Exchange contents and configuration with `other` in O(1).
    ///
    /// Cursors stay attached to the storage they were issued from, which now
    /// belongs to the other table; using them with their original table
    /// reports `InvalidHandle`. Fails with `Reentrant` when called from a
    /// callback of either table.
    pub fn swap(&self, other: &Table<V>) -> Result<(), V> {
        if self.ptr_eq(other) {
            let shared = self.storage()?;
            write(&shared)?;
            return Ok(());
        }
        let mut a = self
            .shell
            .storage
            .try_borrow_mut()
            .map_err(|_| Error::Reentrant)?;
        let mut b = other
            .shell
            .storage
            .try_borrow_mut()
            .map_err(|_| Error::Reentrant)?;
        let (Some(sa), Some(sb)) = (a.as_ref(), b.as_ref()) else {
            return Err(Error::InvalidHandle);
        };
        // An operation still in flight on either storage holds a borrow of it.
        write(sa)?;
        write(sb)?;
        core::mem::swap(&mut *a, &mut *b);
        trace_op!(op = "swap", "table op");
        Ok(())
    }

    /// Remove every entry. Element cursors go stale; `begin`/`end` sentinels
    /// stay usable.
    pub fn clear(&self) -> Result<(), V> {
        let shared = self.storage()?;
        let dropped = {
            let mut s = write(&shared)?;
            s.hasher.forget();
            s.entries.clear()
        };
        trace_op!(op = "clear", dropped = dropped.len(), "table op");
        drop(dropped);
        Ok(())
    }

    /// Same size, and every entry of `self` is present in `other` with an
    /// equal value. Keys and values are compared with `self`'s equality
    /// callable; lookups in `other` use `other`'s hash.
    pub fn equal(&self, other: &Table<V>) -> Result<bool, V> {
        let left = self.storage()?;
        let right = other.storage()?;
        if Rc::ptr_eq(&left, &right) {
            return Ok(true);
        }
        let l = read(&left)?;
        let r = read(&right)?;
        if l.entries.len() != r.entries.len() {
            return Ok(false);
        }
        for (_, key, value) in l.entries.iter() {
            let hash = r.hasher.hash(key)?;
            let Some(slot) = r.entries.try_find(hash, |k| l.hasher.eq(key, k))? else {
                return Ok(false);
            };
            let Some(other_entry) = r.entries.get(slot) else {
                return Ok(false);
            };
            let same_value = match (value, other_entry.value) {
                (None, None) => true,
                (Some(a), Some(b)) => l.hasher.eq(a, b)?,
                _ => false,
            };
            if !same_value {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Sentinel before the first element; resolves lazily, so it stays
    /// valid across inserts and `clear`.
    pub fn begin(&self) -> Result<Cursor<V>, V> {
        Ok(Cursor::new(self.clone(), self.storage()?, Position::Beginning))
    }

    /// Past-the-end sentinel: comparable, never dereferenceable.
    pub fn end(&self) -> Result<Cursor<V>, V> {
        Ok(Cursor::new(self.clone(), self.storage()?, Position::PastEnd))
    }
}
