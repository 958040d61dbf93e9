//! Error taxonomy shared by every table, cursor and registry operation.
//!
//! Lookup misses, duplicate inserts and erasing absent keys are not errors;
//! they are reported through the return value of the operation.

use thiserror::Error;

use crate::host::HostValue;

/// Errors raised by table operations. `E` is the host's own failure type,
/// carried through [`Error::Host`] without modification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error<E> {
    /// The table was destroyed, or a cursor/id does not belong to it.
    #[error("stale or mismatched table handle")]
    InvalidHandle,

    /// A key, element or callable argument had the wrong shape.
    #[error("type mismatch: {0}")]
    TypeMismatch(&'static str),

    /// The hash or equality callable cannot be used to build a table.
    #[error("invalid table configuration: {0}")]
    Config(&'static str),

    /// A past-end cursor was dereferenced or advanced.
    #[error("cursor is past the end of the table")]
    OutOfRange,

    /// A seedless fold was asked to run over an empty table.
    #[error("operation requires a non-empty table")]
    EmptyCollection,

    /// A host callback tried to mutate the table it was called from.
    #[error("table mutated from inside one of its own callbacks")]
    Reentrant,

    /// A host callable failed; the table is left as it was.
    #[error("host callable failed: {0}")]
    Host(E),
}

/// Result alias keyed on the host value type.
pub type Result<T, V> = core::result::Result<T, Error<<V as HostValue>::Error>>;
