//! A small reference host: dynamically typed values with reference-counted
//! heap objects and native functions.
//!
//! Useful for tests, benchmarks and as a template when embedding the table
//! into a real interpreter. Heap values (strings, pairs, lists, functions)
//! have identity; `same` compares pointers for them and contents for
//! immediates.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;
use std::rc::Rc;

use thiserror::Error;

use crate::host::HostValue;

/// Failure raised by a native function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Fault(pub String);

impl Fault {
    pub fn new(msg: impl Into<String>) -> Self {
        Fault(msg.into())
    }
}

type NativeFn = dyn Fn(&[Value]) -> Result<Value, Fault>;

pub struct Native {
    name: String,
    arity: usize,
    f: Box<NativeFn>,
}

#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Pair(Rc<(Value, Value)>),
    List(Rc<[Value]>),
    Func(Rc<Native>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn func<F>(name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Fault> + 'static,
    {
        Value::Func(Rc::new(Native {
            name: name.to_string(),
            arity,
            f: Box::new(f),
        }))
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Unit => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Int(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Str(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Value::Pair(p) => {
                4u8.hash(state);
                p.0.hash_into(state);
                p.1.hash_into(state);
            }
            Value::List(items) => {
                5u8.hash(state);
                items.len().hash(state);
                for it in items.iter() {
                    it.hash_into(state);
                }
            }
            Value::Func(f) => {
                6u8.hash(state);
                (Rc::as_ptr(f) as usize).hash(state);
            }
        }
    }
}

impl PartialEq for Value {
    /// Structural equality; functions compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Pair(a), Value::Pair(b)) => a.0 == b.0 && a.1 == b.1,
            (Value::List(a), Value::List(b)) => a[..] == b[..],
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{:?}", &**s),
            Value::Pair(p) => write!(f, "{:?}=>{:?}", p.0, p.1),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Func(n) => write!(f, "<fn {}/{}>", n.name, n.arity),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl HostValue for Value {
    type Error = Fault;

    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Unit, Value::Unit)
            | (Value::Bool(_), Value::Bool(_))
            | (Value::Int(_), Value::Int(_)) => self == other,
            _ => false,
        }
    }

    fn unit() -> Self {
        Value::Unit
    }

    fn accepts(&self, arity: usize) -> bool {
        matches!(self, Value::Func(n) if n.arity == arity)
    }

    fn call(&self, args: &[Self]) -> Result<Self, Fault> {
        match self {
            Value::Func(n) if n.arity == args.len() => (n.f)(args),
            Value::Func(n) => Err(Fault(format!(
                "{} expects {} arguments, got {}",
                n.name,
                n.arity,
                args.len()
            ))),
            other => Err(Fault(format!("{other:?} is not a function"))),
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn from_bool(b: bool) -> Self {
        Value::Bool(b)
    }

    fn pair(key: Self, value: Self) -> Self {
        Value::Pair(Rc::new((key, value)))
    }

    fn as_pair(&self) -> Option<(Self, Self)> {
        match self {
            Value::Pair(p) => Some((p.0.clone(), p.1.clone())),
            _ => None,
        }
    }

    fn list(items: Vec<Self>) -> Self {
        Value::List(Rc::from(items))
    }

    fn as_list(&self) -> Option<Vec<Self>> {
        match self {
            Value::List(items) => Some(items.to_vec()),
            _ => None,
        }
    }
}

/// Structural hash code of `v`, boxed as an integer.
pub fn hash_of(v: &Value) -> Result<Value, Fault> {
    let mut h = DefaultHasher::new();
    v.hash_into(&mut h);
    Ok(Value::Int(h.finish() as i64))
}

/// Structural hash; consistent with both [`eq_fn`] and [`identical_fn`].
pub fn hash_fn() -> Value {
    Value::func("hash", 1, |args| hash_of(&args[0]))
}

/// Structural equality.
pub fn eq_fn() -> Value {
    Value::func("==", 2, |args| Ok(Value::Bool(args[0] == args[1])))
}

/// Identity equality (`same`).
pub fn identical_fn() -> Value {
    Value::func("===", 2, |args| Ok(Value::Bool(args[0].same(&args[1]))))
}

/// Numeric order on ints, lexicographic order on strings.
pub fn less_fn() -> Value {
    Value::func("<", 2, |args| match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a < b)),
        (a, b) => Err(Fault(format!("cannot order {a:?} and {b:?}"))),
    })
}
