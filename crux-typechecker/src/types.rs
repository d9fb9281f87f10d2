//! Type universe for the Crux inference engine
//!
//! Types live in an arena owned by [`TypeUniverse`] and are addressed by [`TypeId`].
//! Object types may refer back to themselves through their fields, so equality is
//! structural and cycle-safe rather than derived.

use crux_ast::Selector;
use indexmap::IndexMap;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Index of a type node in the universe arena.
///
/// `TypeId` equality is identity, not structure: two ids may name structurally
/// equal types. Use [`TypeUniverse::structurally_equal`] to compare types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// A node in the type arena
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    /// The single immutable primitive value type
    Scalar,
    /// Named heap type; field bindings accumulate as the object is written
    Object {
        name: String,
        fields: IndexMap<Selector, TypeId>,
    },
}

/// Canonical registry of every type produced during one inference run
#[derive(Debug, Clone)]
pub struct TypeUniverse {
    nodes: Vec<TypeNode>,
    scalar: TypeId,
    /// Canonical empty object type per class name
    empty_objects: HashMap<String, TypeId>,
    /// Nodes built by [`with_field`](Self::with_field), keyed by fingerprint
    interned: HashMap<u64, Vec<TypeId>>,
}

impl TypeUniverse {
    pub fn new() -> Self {
        Self {
            nodes: vec![TypeNode::Scalar],
            scalar: TypeId(0),
            empty_objects: HashMap::new(),
            interned: HashMap::new(),
        }
    }

    /// The canonical scalar type
    pub fn primitive(&self) -> TypeId {
        self.scalar
    }

    /// The canonical object type for `name` with no field bindings
    pub fn object_type(&mut self, name: &str) -> TypeId {
        if let Some(id) = self.empty_objects.get(name) {
            return *id;
        }

        let id = self.push(TypeNode::Object {
            name: name.to_string(),
            fields: IndexMap::new(),
        });
        self.empty_objects.insert(name.to_string(), id);
        id
    }

    /// `object` with `selector` bound to `field_type`.
    ///
    /// Returns an existing node when one is structurally equal to the result.
    /// Panics if `object` is the scalar type: selecting into a primitive is a
    /// caller bug at this layer.
    pub fn with_field(
        &mut self,
        object: TypeId,
        selector: impl Into<Selector>,
        field_type: TypeId,
    ) -> TypeId {
        let (name, mut fields) = match self.node(object) {
            TypeNode::Object { name, fields } => (name.clone(), fields.clone()),
            TypeNode::Scalar => panic!("with_field called on the scalar type"),
        };
        fields.insert(selector.into(), field_type);
        self.intern_object(&name, fields)
    }

    /// The object node `name { fields }`, shared with any structurally equal
    /// node interned before it
    pub(crate) fn intern_object(
        &mut self,
        name: &str,
        fields: IndexMap<Selector, TypeId>,
    ) -> TypeId {
        if fields.is_empty() {
            return self.object_type(name);
        }

        let node = TypeNode::Object {
            name: name.to_string(),
            fields,
        };
        let key = self.node_fingerprint(&node);
        let existing = self.interned.get(&key).and_then(|candidates| {
            candidates
                .iter()
                .copied()
                .find(|candidate| self.node_equal(&node, *candidate))
        });
        if let Some(existing) = existing {
            return existing;
        }

        let id = self.push(node);
        self.interned.entry(key).or_default().push(id);
        id
    }

    fn node_equal(&self, node: &TypeNode, id: TypeId) -> bool {
        match (node, self.node(id)) {
            (
                TypeNode::Object { name, fields },
                TypeNode::Object {
                    name: other_name,
                    fields: other_fields,
                },
            ) => {
                name == other_name
                    && fields.len() == other_fields.len()
                    && fields.iter().all(|(selector, field_type)| {
                        other_fields.get(selector).is_some_and(|other_type| {
                            self.structurally_equal(*field_type, *other_type)
                        })
                    })
            }
            (TypeNode::Scalar, TypeNode::Scalar) => true,
            _ => false,
        }
    }

    /// Rebind the type found by following `selectors` from `object`, rebuilding
    /// every enclosing object on the way back up
    pub fn with_field_at(
        &mut self,
        object: TypeId,
        selectors: &[Selector],
        field_type: TypeId,
    ) -> Option<TypeId> {
        match selectors.split_first() {
            None => Some(field_type),
            Some((first, rest)) => {
                let inner = if rest.is_empty() {
                    field_type
                } else {
                    let current = self.field(object, first)?;
                    self.with_field_at(current, rest, field_type)?
                };
                if self.is_scalar(object) {
                    return None;
                }
                Some(self.with_field(object, first.clone(), inner))
            }
        }
    }

    /// Reserve an object node whose fields are filled in later, so that a field can
    /// point back at the node being built
    pub(crate) fn reserve_object(&mut self, name: &str) -> TypeId {
        self.push(TypeNode::Object {
            name: name.to_string(),
            fields: IndexMap::new(),
        })
    }

    pub(crate) fn define_fields(&mut self, object: TypeId, bindings: IndexMap<Selector, TypeId>) {
        if let TypeNode::Object { fields, .. } = &mut self.nodes[object.index()] {
            *fields = bindings;
        }
    }

    pub fn node(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn is_scalar(&self, id: TypeId) -> bool {
        matches!(self.node(id), TypeNode::Scalar)
    }

    pub fn object_name(&self, id: TypeId) -> Option<&str> {
        match self.node(id) {
            TypeNode::Object { name, .. } => Some(name),
            TypeNode::Scalar => None,
        }
    }

    pub fn field(&self, id: TypeId, selector: &Selector) -> Option<TypeId> {
        match self.node(id) {
            TypeNode::Object { fields, .. } => fields.get(selector).copied(),
            TypeNode::Scalar => None,
        }
    }

    pub fn fields(&self, id: TypeId) -> impl Iterator<Item = (&Selector, TypeId)> {
        let fields = match self.node(id) {
            TypeNode::Object { fields, .. } => Some(fields),
            TypeNode::Scalar => None,
        };
        fields
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(selector, ty)| (selector, *ty)))
    }

    /// Follow `selectors` from `id` through field bindings
    pub fn navigate(&self, id: TypeId, selectors: &[Selector]) -> Option<TypeId> {
        selectors
            .iter()
            .try_fold(id, |current, selector| self.field(current, selector))
    }

    /// Number of nodes allocated so far
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural equality that terminates on cyclic type graphs.
    ///
    /// Pairs already under comparison are assumed equal, so two types are equal
    /// when their names and field graphs match up to the recursion.
    pub fn structurally_equal(&self, left: TypeId, right: TypeId) -> bool {
        let mut assumed = HashSet::new();
        self.equal_under(left, right, &mut assumed)
    }

    fn equal_under(
        &self,
        left: TypeId,
        right: TypeId,
        assumed: &mut HashSet<(TypeId, TypeId)>,
    ) -> bool {
        if left == right || !assumed.insert((left, right)) {
            return true;
        }

        match (self.node(left), self.node(right)) {
            (TypeNode::Scalar, TypeNode::Scalar) => true,
            (
                TypeNode::Object {
                    name: left_name,
                    fields: left_fields,
                },
                TypeNode::Object {
                    name: right_name,
                    fields: right_fields,
                },
            ) => {
                left_name == right_name
                    && left_fields.len() == right_fields.len()
                    && left_fields.iter().all(|(selector, left_field)| {
                        right_fields.get(selector).is_some_and(|right_field| {
                            self.equal_under(*left_field, *right_field, assumed)
                        })
                    })
            }
            _ => false,
        }
    }

    /// Element-wise structural equality of two type lists
    pub fn all_structurally_equal(&self, left: &[TypeId], right: &[TypeId]) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .all(|(l, r)| self.structurally_equal(*l, *r))
    }

    /// Hash that agrees with [`structurally_equal`](Self::structurally_equal).
    ///
    /// Only the name, the sorted selector set and each field's immediate shape are
    /// hashed, which keeps it finite on cyclic types.
    pub fn fingerprint(&self, id: TypeId) -> u64 {
        self.node_fingerprint(self.node(id))
    }

    fn node_fingerprint(&self, node: &TypeNode) -> u64 {
        let mut hasher = DefaultHasher::new();
        node_shape(node).hash(&mut hasher);

        if let TypeNode::Object { fields, .. } = node {
            let mut fields: Vec<_> = fields.iter().collect();
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));
            for (selector, field_type) in fields {
                selector.hash(&mut hasher);
                node_shape(self.node(*field_type)).hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Render a type, printing revisited objects by name only
    pub fn display(&self, id: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { universe: self, id }
    }

    fn push(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}

fn node_shape(node: &TypeNode) -> (Option<&str>, usize) {
    match node {
        TypeNode::Scalar => (None, 0),
        TypeNode::Object { name, fields } => (Some(name.as_str()), fields.len()),
    }
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TypeDisplay<'u> {
    universe: &'u TypeUniverse,
    id: TypeId,
}

impl TypeDisplay<'_> {
    fn write(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: TypeId,
        open: &mut Vec<TypeId>,
    ) -> fmt::Result {
        match self.universe.node(id) {
            TypeNode::Scalar => write!(f, "Scalar"),
            TypeNode::Object { name, fields } => {
                write!(f, "{name}")?;
                if fields.is_empty() || open.contains(&id) {
                    return Ok(());
                }

                open.push(id);
                write!(f, "{{")?;
                for (index, (selector, field_type)) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{selector}: ")?;
                    self.write(f, *field_type, open)?;
                }
                open.pop();
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, self.id, &mut Vec::new())
    }
}
