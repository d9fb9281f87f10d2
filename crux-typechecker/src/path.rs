//! Symbolic references into a call's argument slots
//!
//! A [`Path`] names "the value reached from slot `root` by following these
//! selectors". Slot 0 is the value the current call returns; slots `1..=N` are
//! its parameters (the receiver is slot 1 for class methods).

use crate::types::{TypeId, TypeUniverse};
use crux_ast::Selector;
use std::fmt;

/// Slot reserved for the object a call returns
pub const RETURN_SLOT: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    root: usize,
    selectors: Vec<Selector>,
}

impl Path {
    /// Path to the whole value in `root`
    pub fn new(root: usize) -> Self {
        Self {
            root,
            selectors: Vec::new(),
        }
    }

    pub fn with_selectors<I, S>(root: usize, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        Self {
            root,
            selectors: selectors.into_iter().map(Into::into).collect(),
        }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn is_return_slot(&self) -> bool {
        self.root == RETURN_SLOT
    }

    /// This path extended by one selector
    pub fn child(&self, selector: Selector) -> Self {
        let mut selectors = self.selectors.clone();
        selectors.push(selector);
        Self {
            root: self.root,
            selectors,
        }
    }

    /// Whether this path is `prefix` or lies below it
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.root == prefix.root && self.selectors.starts_with(&prefix.selectors)
    }

    /// This path with `selectors` appended
    pub fn concat(&self, selectors: &[Selector]) -> Self {
        let mut joined = self.selectors.clone();
        joined.extend_from_slice(selectors);
        Self {
            root: self.root,
            selectors: joined,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.root)?;
        for selector in &self.selectors {
            write!(f, ".{selector}")?;
        }
        Ok(())
    }
}

/// What an expression evaluates to once published outside an analysis:
/// a concrete type or a caller-relative path
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Type(TypeId),
    Path(Path),
}

impl Value {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(path) => Some(path),
            Value::Type(_) => None,
        }
    }

    pub fn as_type(&self) -> Option<TypeId> {
        match self {
            Value::Type(id) => Some(*id),
            Value::Path(_) => None,
        }
    }

    pub fn display<'u>(&'u self, universe: &'u TypeUniverse) -> ValueDisplay<'u> {
        ValueDisplay {
            value: self,
            universe,
        }
    }
}

impl From<Path> for Value {
    fn from(path: Path) -> Self {
        Value::Path(path)
    }
}

impl From<TypeId> for Value {
    fn from(id: TypeId) -> Self {
        Value::Type(id)
    }
}

pub struct ValueDisplay<'u> {
    value: &'u Value,
    universe: &'u TypeUniverse,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Type(id) => write!(f, "{}", self.universe.display(*id)),
            Value::Path(path) => write!(f, "{path}"),
        }
    }
}

/// A recorded write: `target` received `value`
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub target: Path,
    pub value: Value,
}

impl Mutation {
    pub fn new(target: Path, value: impl Into<Value>) -> Self {
        Self {
            target,
            value: value.into(),
        }
    }
}

impl TypeUniverse {
    /// Paths compare exactly; types compare structurally
    pub fn values_equal(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Type(l), Value::Type(r)) => self.structurally_equal(*l, *r),
            (Value::Path(l), Value::Path(r)) => l == r,
            _ => false,
        }
    }

    /// Positional (sequence) equality of two mutation lists
    pub fn mutations_equal(&self, left: &[Mutation], right: &[Mutation]) -> bool {
        left.len() == right.len()
            && left.iter().zip(right).all(|(l, r)| {
                l.target == r.target && self.values_equal(&l.value, &r.value)
            })
    }
}
