//! Body analysis under a fixed argument-type signature
//!
//! A [`BodyAnalyzer`] walks one definition body with concrete types bound to its
//! parameter slots and produces the body's return value, the writes it performs
//! on parameter-reachable state, and the calls it binds along the way.
//!
//! Values inside the frame are [`Operand`]s. Besides the published forms (a
//! concrete type or a parameter-rooted path) an operand can be a fresh
//! allocation: an object created in this body that has no caller-visible
//! identity yet. Allocations keep per-field operands so aliasing between locals
//! survives until the object escapes into a parameter or is returned.

mod binding;
mod expressions;
mod overwrite;

use crate::cache::BoundCall;
use crate::error::{to_source_span, InferenceError};
use crate::inference::InferenceEngine;
use crate::path::{Mutation, Path, Value, RETURN_SLOT};
use crate::registry::DefId;
use crate::types::{TypeId, TypeNode};
use crux_ast::{MethodDefinition, Selector, Span};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub(crate) type AllocId = usize;

/// Abstract value of an expression inside the frame being analyzed
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Type(TypeId),
    Path(Path),
    Fresh(AllocId),
}

/// An object allocated in this body
#[derive(Debug, Clone)]
struct Allocation {
    class_name: String,
    fields: IndexMap<Selector, Operand>,
    /// Set once the object has been written into parameter-reachable state;
    /// from then on it is referred to by this path
    escaped: Option<Path>,
}

/// Raw outcome of one body analysis, before it is wrapped into an instance
pub(crate) struct AnalysisResult {
    pub return_value: Value,
    pub mutations: Vec<Mutation>,
    pub calls: Vec<BoundCall>,
}

pub(crate) struct BodyAnalyzer<'e> {
    engine: &'e mut InferenceEngine,
    def_id: DefId,
    owner: Option<String>,
    definition: Rc<MethodDefinition>,
    /// Current concrete type of each parameter slot; slot `n` lives at index `n - 1`
    slot_types: Vec<TypeId>,
    locals: HashMap<String, Operand>,
    allocations: Vec<Allocation>,
    mutations: Vec<Mutation>,
    calls: Vec<BoundCall>,
}

impl<'e> BodyAnalyzer<'e> {
    pub(crate) fn new(
        engine: &'e mut InferenceEngine,
        def_id: DefId,
        argument_types: &[TypeId],
    ) -> Self {
        let def = engine.registry.def(def_id);
        let owner = def.owner.clone();
        let definition = Rc::clone(&def.definition);

        Self {
            engine,
            def_id,
            owner,
            definition,
            slot_types: argument_types.to_vec(),
            locals: HashMap::new(),
            allocations: Vec::new(),
            mutations: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub(crate) fn analyze(mut self) -> Result<AnalysisResult, InferenceError> {
        let definition = Rc::clone(&self.definition);

        // An empty body yields the primitive, standing in for nil
        let mut last = Operand::Type(self.engine.universe.primitive());
        for expression in &definition.body.expressions {
            last = self.evaluate(expression)?;
        }

        let return_value = self.publish_return(last)?;
        Ok(AnalysisResult {
            return_value,
            mutations: self.mutations,
            calls: self.calls,
        })
    }

    /// Replace an escaped allocation by the path it escaped to
    fn settle(&self, operand: Operand) -> Operand {
        match operand {
            Operand::Fresh(id) => match &self.allocations[id].escaped {
                Some(path) => Operand::Path(path.clone()),
                None => Operand::Fresh(id),
            },
            other => other,
        }
    }

    fn new_allocation(&mut self, class_name: &str, fields: IndexMap<Selector, Operand>) -> AllocId {
        self.allocations.push(Allocation {
            class_name: class_name.to_string(),
            fields,
            escaped: None,
        });
        self.allocations.len() - 1
    }

    /// Turn a concrete object type into an allocation so that later writes into
    /// it keep its identity. The primitive has no identity and stays a type.
    fn promote(&mut self, object: TypeId) -> Option<AllocId> {
        let (class_name, fields) = match self.engine.universe.node(object) {
            TypeNode::Object { name, fields } => (
                name.clone(),
                fields
                    .iter()
                    .map(|(selector, ty)| (selector.clone(), Operand::Type(*ty)))
                    .collect(),
            ),
            TypeNode::Scalar => return None,
        };
        Some(self.new_allocation(&class_name, fields))
    }

    /// The operand for a bare reference to parameter `slot`
    fn slot_operand(&self, slot: usize) -> Operand {
        let ty = self.slot_types[slot - 1];
        if self.engine.universe.is_scalar(ty) {
            Operand::Type(ty)
        } else {
            Operand::Path(Path::new(slot))
        }
    }

    fn self_operand(&self, span: Span) -> Result<Operand, InferenceError> {
        if self.owner.is_some() {
            Ok(self.slot_operand(1))
        } else {
            Err(InferenceError::SelfOutsideMethod {
                span: to_source_span(span),
            })
        }
    }

    /// Concrete type currently reachable along a parameter-rooted path
    fn path_type(&self, path: &Path, span: Span) -> Result<TypeId, InferenceError> {
        let mut current = self.slot_types[path.root() - 1];
        for selector in path.selectors() {
            current = self.field_type(current, selector, span)?;
        }
        Ok(current)
    }

    fn field_type(
        &self,
        object: TypeId,
        selector: &Selector,
        span: Span,
    ) -> Result<TypeId, InferenceError> {
        match self.engine.universe.node(object) {
            TypeNode::Scalar => Err(InferenceError::NotAnObject {
                field: selector.to_string(),
                span: to_source_span(span),
            }),
            TypeNode::Object { name, fields } => match fields.get(selector) {
                Some(field_type) => Ok(*field_type),
                None => Err(self.missing_field(name, selector, span)),
            },
        }
    }

    /// Distinguish a field that was never declared from one not yet assigned
    fn missing_field(&self, class_name: &str, selector: &Selector, span: Span) -> InferenceError {
        let declared = self
            .engine
            .registry
            .class(class_name)
            .is_some_and(|class| class.declares(selector));

        if declared {
            InferenceError::UnboundField {
                type_name: class_name.to_string(),
                field: selector.to_string(),
                span: to_source_span(span),
            }
        } else {
            InferenceError::UnknownField {
                type_name: class_name.to_string(),
                field: selector.to_string(),
                span: to_source_span(span),
            }
        }
    }

    /// Class of the object an operand denotes; `None` for the primitive
    fn class_name_of(&self, operand: &Operand, span: Span) -> Result<Option<String>, InferenceError> {
        let name = match operand {
            Operand::Type(ty) => self.engine.universe.object_name(*ty).map(str::to_string),
            Operand::Path(path) => {
                let ty = self.path_type(path, span)?;
                self.engine.universe.object_name(ty).map(str::to_string)
            }
            Operand::Fresh(id) => Some(self.allocations[*id].class_name.clone()),
        };
        Ok(name)
    }

    /// Concrete type of an operand, as used for call signatures
    fn concrete_type(&mut self, operand: &Operand, span: Span) -> Result<TypeId, InferenceError> {
        match self.settle(operand.clone()) {
            Operand::Type(ty) => Ok(ty),
            Operand::Path(path) => self.path_type(&path, span),
            Operand::Fresh(id) => self.materialize(id, span),
        }
    }

    /// Build the concrete object type of an allocation.
    ///
    /// Allocations reachable from themselves become self-referential types.
    fn materialize(&mut self, id: AllocId, span: Span) -> Result<TypeId, InferenceError> {
        let mut built = HashMap::new();
        self.materialize_with(id, span, &mut built)
    }

    fn materialize_with(
        &mut self,
        id: AllocId,
        span: Span,
        built: &mut HashMap<AllocId, TypeId>,
    ) -> Result<TypeId, InferenceError> {
        if let Some(ty) = built.get(&id) {
            return Ok(*ty);
        }
        if let Some(path) = self.allocations[id].escaped.clone() {
            return self.path_type(&path, span);
        }

        let class_name = self.allocations[id].class_name.clone();
        let fields = self.allocations[id].fields.clone();
        if fields.is_empty() {
            return Ok(self.engine.universe.object_type(&class_name));
        }

        // Only self-referential objects need a node before their fields exist
        let cyclic = self.reaches_itself(id);
        let reserved = if cyclic {
            let node = self.engine.universe.reserve_object(&class_name);
            built.insert(id, node);
            Some(node)
        } else {
            None
        };

        let mut bindings = IndexMap::with_capacity(fields.len());
        for (selector, operand) in fields {
            let ty = match operand {
                Operand::Type(ty) => ty,
                Operand::Path(path) => self.path_type(&path, span)?,
                Operand::Fresh(child) => self.materialize_with(child, span, built)?,
            };
            bindings.insert(selector, ty);
        }

        let node = match reserved {
            Some(node) => {
                self.engine.universe.define_fields(node, bindings);
                node
            }
            None => self.engine.universe.intern_object(&class_name, bindings),
        };
        built.insert(id, node);
        Ok(node)
    }

    /// Whether an allocation can reach itself through frame-local fields
    fn reaches_itself(&self, id: AllocId) -> bool {
        let mut pending = self.local_children(id);
        let mut seen = HashSet::new();
        while let Some(next) = pending.pop() {
            if next == id {
                return true;
            }
            if seen.insert(next) {
                pending.extend(self.local_children(next));
            }
        }
        false
    }

    fn local_children(&self, id: AllocId) -> Vec<AllocId> {
        self.allocations[id]
            .fields
            .values()
            .filter_map(|operand| match self.settle(operand.clone()) {
                Operand::Fresh(child) => Some(child),
                _ => None,
            })
            .collect()
    }

    /// Publish an operand outside the frame
    fn publish(&mut self, operand: &Operand, span: Span) -> Result<Value, InferenceError> {
        match self.settle(operand.clone()) {
            Operand::Type(ty) => Ok(Value::Type(ty)),
            Operand::Path(path) => Ok(Value::Path(path)),
            Operand::Fresh(id) => Ok(Value::Type(self.materialize(id, span)?)),
        }
    }

    /// Publish the body's final value. A returned allocation becomes its concrete
    /// type, and every parameter path held inside it is recorded as a write
    /// relative to the return slot.
    fn publish_return(&mut self, last: Operand) -> Result<Value, InferenceError> {
        let span = self.definition.span;
        match self.settle(last) {
            Operand::Fresh(id) => {
                let ty = self.materialize(id, span)?;
                let mut visited = HashSet::new();
                self.record_aliases(id, &Path::new(RETURN_SLOT), &mut visited, false);
                Ok(Value::Type(ty))
            }
            other => self.publish(&other, span),
        }
    }

    /// Record a write of `value` to the parameter-rooted `target`
    fn record_write(&mut self, target: Path, value: Operand, span: Span) -> Result<(), InferenceError> {
        match value {
            Operand::Type(ty) => self.mutations.push(Mutation::new(target, ty)),
            Operand::Path(path) => self.mutations.push(Mutation::new(target, path)),
            Operand::Fresh(id) => {
                let ty = self.materialize(id, span)?;
                self.mutations.push(Mutation::new(target.clone(), ty));
                let mut visited = HashSet::new();
                self.record_aliases(id, &target, &mut visited, true);
            }
        }
        Ok(())
    }

    /// Walk an allocation placed at `prefix` and record a write for every path
    /// it holds. With `escape` set, the allocation and everything reachable from
    /// it are from now on referred to by their position under `prefix`.
    fn record_aliases(
        &mut self,
        id: AllocId,
        prefix: &Path,
        visited: &mut HashSet<AllocId>,
        escape: bool,
    ) {
        if !visited.insert(id) {
            return;
        }

        let fields = self.allocations[id].fields.clone();
        for (selector, operand) in fields {
            let target = prefix.child(selector);
            match self.settle(operand) {
                Operand::Path(path) => self.mutations.push(Mutation::new(target, path)),
                Operand::Fresh(child) => self.record_aliases(child, &target, visited, escape),
                Operand::Type(_) => {}
            }
        }

        if escape {
            self.allocations[id].escaped = Some(prefix.clone());
        }
    }
}
