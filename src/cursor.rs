//! Cursor: a copyable position inside a table.
//!
//! A cursor holds its table handle and the storage it was issued from,
//! which keeps both alive for as long as the cursor lives.
//!
//! Validity contract, inherited from iterator-based hash tables and not
//! repaired behind the caller's back:
//! - erasing an element invalidates cursors at that element only;
//! - `clear` invalidates every element cursor;
//! - any insertion may invalidate every element cursor; re-acquire cursors
//!   after inserting if iteration has to continue.
//!
//! Stale positions are detected (slots are generational) and reported as
//! `InvalidHandle`; they never alias a newer entry. The `begin`/`end`
//! sentinels survive all of the above.

use core::fmt;
use std::rc::Rc;

use crate::entry_table::Slot;
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::table::{read, Find, Shared, Storage, Table};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Position {
    /// Resolves to whatever entry is first when used.
    Beginning,
    PastEnd,
    At(Slot),
}

/// Which kind of position a cursor holds, without resolving it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CursorState {
    AtBeginning,
    AtPastEnd,
    AtElement,
}

pub struct Cursor<V: HostValue> {
    table: Table<V>,
    storage: Shared<V>,
    pos: Position,
}

impl<V: HostValue> Clone for Cursor<V> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            storage: self.storage.clone(),
            pos: self.pos,
        }
    }
}

impl<V: HostValue> Cursor<V> {
    pub(crate) fn new(table: Table<V>, storage: Shared<V>, pos: Position) -> Self {
        Self {
            table,
            storage,
            pos,
        }
    }

    fn with_position(&self, pos: Position) -> Self {
        Self {
            table: self.table.clone(),
            storage: self.storage.clone(),
            pos,
        }
    }

    /// The table this cursor was issued by.
    pub fn table(&self) -> &Table<V> {
        &self.table
    }

    pub fn state(&self) -> CursorState {
        match self.pos {
            Position::Beginning => CursorState::AtBeginning,
            Position::PastEnd => CursorState::AtPastEnd,
            Position::At(_) => CursorState::AtElement,
        }
    }

    /// True when the cursor was issued by `table` and still refers to the
    /// storage `table` currently owns.
    pub(crate) fn belongs_to(&self, table: &Table<V>, storage: &Shared<V>) -> bool {
        self.table.ptr_eq(table) && Rc::ptr_eq(&self.storage, storage)
    }

    /// Concrete slot, `None` for past-end (or begin of an empty table).
    pub(crate) fn resolve(&self, s: &Storage<V>) -> Result<Option<Slot>, V> {
        match self.pos {
            Position::Beginning => Ok(s.entries.first()),
            Position::PastEnd => Ok(None),
            Position::At(slot) if s.entries.contains(slot) => Ok(Some(slot)),
            Position::At(_) => Err(Error::InvalidHandle),
        }
    }

    /// Project the current element as `what` and step past it. `None` at
    /// past-end.
    pub(crate) fn fetch(&self, what: Find) -> Result<Option<(V, Cursor<V>)>, V> {
        let s = read(&self.storage)?;
        let Some(slot) = self.resolve(&s)? else {
            return Ok(None);
        };
        let item = s.project(what, slot)?;
        let next = match s.entries.get(slot).and_then(|e| e.next) {
            Some(n) => Position::At(n),
            None => Position::PastEnd,
        };
        Ok(Some((item, self.with_position(next))))
    }

    fn current(&self, what: Find) -> Result<V, V> {
        match self.fetch(what)? {
            Some((item, _)) => Ok(item),
            None => Err(Error::OutOfRange),
        }
    }

    pub fn key(&self) -> Result<V, V> {
        self.current(Find::Key)
    }

    /// The value, or `true` in keys-only mode.
    pub fn value(&self) -> Result<V, V> {
        self.current(Find::Value)
    }

    /// `key => value`, or the key in keys-only mode.
    pub fn elem(&self) -> Result<V, V> {
        self.current(Find::Elem)
    }

    /// Dereference, then return a cursor at the following position.
    pub fn advance_and_fetch(&self) -> Result<(V, Cursor<V>), V> {
        self.fetch(Find::Elem)?.ok_or(Error::OutOfRange)
    }

    /// Same table, same storage and same resolved position. Stale cursors
    /// from the same table report `InvalidHandle`.
    pub fn try_eq(&self, other: &Cursor<V>) -> Result<bool, V> {
        if !self.table.ptr_eq(&other.table) || !Rc::ptr_eq(&self.storage, &other.storage) {
            return Ok(false);
        }
        let s = read(&self.storage)?;
        let a = self.resolve(&s)?;
        let b = other.resolve(&s)?;
        Ok(a == b)
    }
}

/// Any error from [`Cursor::try_eq`] compares unequal, so a stale cursor is
/// not even equal to itself. Use `try_eq` to tell staleness apart.
impl<V: HostValue> PartialEq for Cursor<V> {
    fn eq(&self, other: &Self) -> bool {
        self.try_eq(other).unwrap_or(false)
    }
}

impl<V: HostValue> fmt::Debug for Cursor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("table", &Rc::as_ptr(&self.storage))
            .field("pos", &self.pos)
            .finish()
    }
}
