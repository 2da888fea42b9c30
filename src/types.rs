use crate::evaluator;
use crate::interpreter::Interpreter;
use derive_more::Display;
use std::fmt;
use std::fmt::Formatter;
use std::ops::{RangeFrom, RangeInclusive};

pub type Int = i64;

/// Handle to an object living in a [`Heap`](crate::heap::Heap).
///
/// Handles are plain copies: copying one does not change the object's count.
/// Whoever holds a handle as an owner is responsible for its credit.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Nil,
    True,
}

#[derive(Debug, Clone, Copy)]
pub struct Pair {
    pub head: ObjRef,
    pub tail: ObjRef,
}

/// Shared shape of closures and macros.
#[derive(Debug, Clone, Copy)]
pub struct Procedure {
    pub params: ObjRef,
    pub body: ObjRef,
    pub env: ObjRef,
}

/// One environment frame: an association list of `(symbol . value)` pairs,
/// most recent first, and the enclosing frame (Nil for the root).
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub bindings: ObjRef,
    pub parent: ObjRef,
}

#[derive(Debug)]
pub enum Object {
    Integer(Int),
    Pair(Pair),
    Symbol(String),
    Primitive(&'static PrimitiveFn),
    Closure(Procedure),
    Macro(Procedure),
    Special(Sentinel),
    Environment(Frame),
}

/// A slot of an object which may be overwritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Head,
    Tail,
    Bindings,
    Parent,
}

impl Object {
    /// Calls `f` with every owned reference, i.e. every strong edge of the ownership graph.
    pub(crate) fn for_each_child(&self, mut f: impl FnMut(ObjRef)) {
        match self {
            Object::Integer(_) | Object::Symbol(_) | Object::Primitive(_) | Object::Special(_) => {}
            Object::Pair(Pair { head, tail }) => {
                f(*head);
                f(*tail);
            }
            Object::Closure(p) | Object::Macro(p) => {
                f(p.params);
                f(p.body);
                f(p.env);
            }
            Object::Environment(Frame { bindings, parent }) => {
                f(*bindings);
                f(*parent);
            }
        }
    }

    pub(crate) fn field_mut(&mut self, field: Field) -> Result<&mut ObjRef, TypeMismatch> {
        match (self, field) {
            (Object::Pair(pair), Field::Head) => Ok(&mut pair.head),
            (Object::Pair(pair), Field::Tail) => Ok(&mut pair.tail),
            (Object::Environment(frame), Field::Bindings) => Ok(&mut frame.bindings),
            (Object::Environment(frame), Field::Parent) => Ok(&mut frame.parent),
            (_, Field::Head) | (_, Field::Tail) => Err(TypeMismatch::NotAPair),
            (_, Field::Bindings) | (_, Field::Parent) => Err(TypeMismatch::NotAnEnvironment),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Object::Integer(_) => "integer",
            Object::Pair(_) => "pair",
            Object::Symbol(_) => "symbol",
            Object::Primitive(_) => "primitive",
            Object::Closure(_) => "function",
            Object::Macro(_) => "macro",
            Object::Special(_) => "special",
            Object::Environment(_) => "environment",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Arity {
    Between(RangeInclusive<usize>),
    AtLeast(RangeFrom<usize>),
}

#[derive(Debug)]
pub struct BadArgCount {
    name: &'static str,
    expected: Arity,
    got: usize,
}

impl fmt::Display for BadArgCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "when evaluating {} expected {} arguments, but received {} arguments",
            self.name, self.expected, self.got
        )
    }
}

impl Arity {
    pub(crate) const fn exactly(n: usize) -> Self {
        Self::Between(n..=n)
    }

    pub(crate) const fn at_least(n: usize) -> Self {
        Self::AtLeast(n..)
    }

    pub(crate) fn contains(&self, n: usize) -> bool {
        match self {
            Self::Between(range) => range.contains(&n),
            Self::AtLeast(range) => range.contains(&n),
        }
    }

    pub(crate) fn validate_for(&self, n: usize, name: &'static str) -> Result<(), BadArgCount> {
        match self.contains(n) {
            true => Ok(()),
            false => Err(BadArgCount {
                name,
                expected: self.clone(),
                got: n,
            }),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Between(r) => {
                if r.start() == r.end() {
                    write!(f, "exactly {}", r.start())
                } else {
                    write!(f, "from {} to {}", r.start(), r.end())
                }
            }
            Arity::AtLeast(r) => write!(f, "at least {}", r.start),
        }
    }
}

/// Signature shared by every builtin: the calling environment and the raw,
/// unevaluated argument list. The result carries one credit for the caller.
pub type PrimitiveFnPtr = fn(&mut Interpreter, ObjRef, ObjRef) -> evaluator::Result;

pub struct PrimitiveFn {
    pub name: &'static str,
    pub arity: Arity,
    pub fn_ptr: PrimitiveFnPtr,
}

impl fmt::Debug for PrimitiveFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "primitive function #<{}>", self.name)
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum TypeMismatch {
    #[display(fmt = "expected an integer")]
    NotAnInt,
    #[display(fmt = "expected a pair")]
    NotAPair,
    #[display(fmt = "expected a symbol")]
    NotASymbol,
    #[display(fmt = "expected a proper list")]
    NotAList,
    #[display(fmt = "expected an environment")]
    NotAnEnvironment,
    #[display(fmt = "parameter list must be a flat list of symbols")]
    BadParameterList,
    #[display(fmt = "a function body must contain at least one form")]
    EmptyBody,
}
