//! Map, concat-map and left folds over a table's entries in iteration
//! order.
//!
//! Traversal steps a cursor one element at a time and holds no borrow while
//! the host function runs, so the function may use the table. If it mutates
//! the table the cursor contract applies and the traversal may stop with
//! `InvalidHandle`. A failing host function ends the traversal with its
//! error, unmodified.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::host::HostValue;
use crate::table::{Find, Table};

fn check_shape<V: HostValue>(what: Find) -> Result<(), V> {
    match what {
        Find::Key | Find::Value | Find::Elem => Ok(()),
        Find::Cursor | Find::CursorOrDefault => Err(Error::TypeMismatch(
            "combinators take a key, value or element selector",
        )),
    }
}

/// Lazy `f(element)` for every element; each call to [`Mapped::iter`]
/// starts over from the current first element.
#[derive(Debug)]
pub struct Mapped<V: HostValue> {
    table: Table<V>,
    f: V,
    what: Find,
}

impl<V: HostValue> Mapped<V> {
    pub fn iter(&self) -> MapIter<V> {
        MapIter {
            f: self.f.clone(),
            what: self.what,
            next: Some(self.table.begin()),
        }
    }

    pub fn collect_vec(&self) -> Result<Vec<V>, V> {
        self.iter().collect()
    }
}

pub struct MapIter<V: HostValue> {
    f: V,
    what: Find,
    /// `None` once exhausted or failed.
    next: Option<Result<Cursor<V>, V>>,
}

impl<V: HostValue> Iterator for MapIter<V> {
    type Item = Result<V, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = match self.next.take()? {
            Ok(c) => c,
            Err(e) => return Some(Err(e)),
        };
        let (item, following) = match cursor.fetch(self.what) {
            Ok(Some(step)) => step,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        match self.f.call(&[item]) {
            Ok(v) => {
                self.next = Some(Ok(following));
                Some(Ok(v))
            }
            Err(e) => Some(Err(Error::Host(e))),
        }
    }
}

/// Lazy concatenation of the sequences `f(element)` returns.
#[derive(Debug)]
pub struct ConcatMapped<V: HostValue> {
    inner: Mapped<V>,
}

impl<V: HostValue> ConcatMapped<V> {
    pub fn iter(&self) -> ConcatMapIter<V> {
        ConcatMapIter {
            outer: self.inner.iter(),
            pending: Vec::new().into_iter(),
        }
    }

    pub fn collect_vec(&self) -> Result<Vec<V>, V> {
        self.iter().collect()
    }
}

pub struct ConcatMapIter<V: HostValue> {
    outer: MapIter<V>,
    pending: std::vec::IntoIter<V>,
}

impl<V: HostValue> Iterator for ConcatMapIter<V> {
    type Item = Result<V, V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(v) = self.pending.next() {
                return Some(Ok(v));
            }
            let seq = match self.outer.next()? {
                Ok(seq) => seq,
                Err(e) => return Some(Err(e)),
            };
            match seq.as_list() {
                Some(items) => self.pending = items.into_iter(),
                None => {
                    self.outer.next = None;
                    return Some(Err(Error::TypeMismatch(
                        "concat_map function must return a sequence",
                    )));
                }
            }
        }
    }
}

impl<V: HostValue> Table<V> {
    /// `f(element)` for each element, `element` shaped by `what`.
    pub fn map(&self, f: &V, what: Find) -> Result<Mapped<V>, V> {
        check_shape::<V>(what)?;
        if !f.accepts(1) {
            return Err(Error::TypeMismatch("map function must accept one argument"));
        }
        self.storage()?;
        Ok(Mapped {
            table: self.clone(),
            f: f.clone(),
            what,
        })
    }

    pub fn concat_map(&self, f: &V, what: Find) -> Result<ConcatMapped<V>, V> {
        Ok(ConcatMapped {
            inner: self.map(f, what)?,
        })
    }

    /// `f(... f(f(seed, e1), e2) ..., en)`.
    pub fn fold_left(&self, f: &V, seed: V) -> Result<V, V> {
        if !f.accepts(2) {
            return Err(Error::TypeMismatch("fold function must accept two arguments"));
        }
        fold_from(f, seed, self.begin()?)
    }

    /// Fold seeded with the first element; `EmptyCollection` on an empty
    /// table.
    pub fn fold_left1(&self, f: &V) -> Result<V, V> {
        if !f.accepts(2) {
            return Err(Error::TypeMismatch("fold function must accept two arguments"));
        }
        let (first, rest) = self
            .begin()?
            .fetch(Find::Elem)?
            .ok_or(Error::EmptyCollection)?;
        fold_from(f, first, rest)
    }
}

fn fold_from<V: HostValue>(f: &V, seed: V, start: Cursor<V>) -> Result<V, V> {
    let mut acc = seed;
    let mut at = start;
    while let Some((elem, next)) = at.fetch(Find::Elem)? {
        acc = f.call(&[acc, elem]).map_err(Error::Host)?;
        at = next;
    }
    Ok(acc)
}
