//! Capabilities the embedding host provides for its boxed values.
//!
//! The table never looks inside a value. Everything it needs (invoking a
//! callable, unboxing a hash code or a boolean, building and taking apart
//! pairs and sequences) goes through this trait. `Clone` is expected to be
//! a reference-count increment and `Drop` the matching decrement.

use core::fmt;

pub trait HostValue: Clone + fmt::Debug + 'static {
    /// Failure raised by a host callable. Propagated untouched.
    type Error: fmt::Debug + fmt::Display;

    /// Identity comparison: true when both refer to the same host object.
    fn same(&self, other: &Self) -> bool;

    /// The host's unit ("nothing") value, used as the default default.
    fn unit() -> Self;

    /// Whether `self` can be invoked with `arity` arguments.
    fn accepts(&self, arity: usize) -> bool;

    /// Invoke `self` as a host function.
    fn call(&self, args: &[Self]) -> Result<Self, Self::Error>;

    fn as_int(&self) -> Option<i64>;

    fn as_bool(&self) -> Option<bool>;

    fn from_bool(b: bool) -> Self;

    /// Box a key/value pair the way the host spells `k => v`.
    fn pair(key: Self, value: Self) -> Self;

    fn as_pair(&self) -> Option<(Self, Self)>;

    /// Box a finite sequence.
    fn list(items: Vec<Self>) -> Self;

    fn as_list(&self) -> Option<Vec<Self>>;
}
