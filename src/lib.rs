//! host-hashmap: a single-threaded hash table for embedding in a
//! dynamically typed language, where hashing, equality, the default value
//! and (for ordered queries) ordering are host callables supplied at run
//! time.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep the host-facing surface (boxed values, opaque handles,
//!   cursors that outlive a call) separate from a small structural core
//!   that never calls into the host.
//! - Layers:
//!   - EntryTable<K, V>: structural map over generational slots with a
//!     hashbrown index and an intrusive list giving cursor successors. It
//!     takes precomputed hashes and an equality probe; it never hashes.
//!   - HashEq<V>: adapter over the host's hash and equality callables,
//!     with a 4-entry identity-keyed cache of recent hash codes.
//!   - Table<V>: public handle. Storage (entries, adapter, default, mode)
//!     sits behind an `Rc<RefCell<_>>` so `swap` is O(1) and cursors keep
//!     it alive.
//!   - Cursor<V>: copyable position; bulk operators, combinators and
//!     ordered queries are built from Table and Cursor primitives only.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (Rc everywhere, no atomics except
//!   the trace switch).
//! - Keys are unique under the host's equality, never Rust's.
//! - Insert never overwrites; `update` does.
//! - Iteration order is unspecified. Today it follows insertion order;
//!   callers must not depend on it.
//!
//! Reentrancy policy
//! - Host callables run while the storage is shared-borrowed. They may
//!   read the same table; a mutation from inside a callback fails with
//!   `Error::Reentrant` and leaves the table consistent.
//! - The exclusive borrow is only taken after all host calls of an
//!   operation have returned, and removed keys/values are dropped after it
//!   is released, so their `Drop` may use the table.
//!
//! Failure semantics
//! - Host failures come back as `Error::Host(e)` with `e` untouched, and
//!   the table is unchanged. The exception is `insert_many*`, which keeps
//!   the elements inserted before the failing one.
//! - Lookup misses, duplicate inserts and erasing absent keys are results,
//!   not errors.
//!
//! Hasher and rehashing invariants
//! - Each entry stores its `u64` hash, and index growth reuses it; the
//!   host's hash runs once per probe, not on rehash.
//!
//! Notes and non-goals
//! - Ordered queries are linear scans; there is no hidden sorted index.
//! - Cursors are not repaired after insertion or erasure; stale ones are
//!   detected and reported as `InvalidHandle`.
//! - `equal` is asymmetric when the two tables use different equality
//!   callables: the left operand's wins.

mod bulk;
mod combinators;
mod cursor;
mod entry_table;
mod entry_table_proptest;
pub mod error;
mod hasher;
pub mod host;
mod ordered;
pub mod registry;
pub mod simple;
mod table;
pub mod trace;

// Public surface
pub use bulk::Erase;
pub use combinators::{ConcatMapIter, ConcatMapped, MapIter, Mapped};
pub use cursor::{Cursor, CursorState};
pub use error::{Error, Result};
pub use host::HostValue;
pub use ordered::{OrderedView, RangeSpec};
pub use registry::{Registry, TableId};
pub use table::{Find, Found, Table, TableConfig, TableParams};
pub use trace::{set_trace, trace_enabled};
