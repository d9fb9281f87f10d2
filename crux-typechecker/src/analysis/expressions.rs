//! Expression transfer rules

use super::{BodyAnalyzer, Operand};
use crate::core_library::ARRAY_CLASS;
use crate::error::{to_source_span, InferenceError};
use crate::registry::DefId;
use crux_ast::{
    Allocation, AllocationKind, Assignment, AssignmentTarget, Expression, ExpressionKind,
    MethodCall, Selector, Span,
};
use indexmap::IndexMap;

impl BodyAnalyzer<'_> {
    pub(super) fn evaluate(&mut self, expression: &Expression) -> Result<Operand, InferenceError> {
        let span = expression.span;
        match &expression.kind {
            ExpressionKind::IntegerLiteral(_) => Ok(Operand::Type(self.engine.universe.primitive())),
            ExpressionKind::Variable(name) => self.variable(name, span),
            ExpressionKind::SelfReference => self.self_operand(span),
            ExpressionKind::InstanceVariable(name) => {
                let receiver = self.self_operand(span)?;
                self.read_field(receiver, &Selector::Field(name.clone()), span)
            }
            ExpressionKind::FieldAccess(access) => {
                let receiver = self.evaluate(&access.receiver)?;
                self.read_field(receiver, &access.selector, span)
            }
            ExpressionKind::Allocation(allocation) => self.allocate(allocation, span),
            ExpressionKind::ArrayLiteral(elements) => self.array_literal(elements),
            ExpressionKind::Assignment(assignment) => self.assign(assignment, span),
            ExpressionKind::MethodCall(call) => self.method_call(call, span),
        }
    }

    /// Locals shadow parameters
    fn variable(&self, name: &str, span: Span) -> Result<Operand, InferenceError> {
        if let Some(operand) = self.locals.get(name) {
            return Ok(self.settle(operand.clone()));
        }

        match self.engine.registry.def(self.def_id).parameter_slot(name) {
            Some(slot) => Ok(self.slot_operand(slot)),
            None => Err(InferenceError::UndefinedVariable {
                variable_name: name.to_string(),
                span: to_source_span(span),
            }),
        }
    }

    fn allocate(&mut self, allocation: &Allocation, span: Span) -> Result<Operand, InferenceError> {
        let class_name = &allocation.class_name;
        let initializer = match self.engine.registry.class(class_name) {
            Some(class) => class.method("initialize"),
            None => {
                return Err(InferenceError::UndefinedClass {
                    class_name: class_name.clone(),
                    span: to_source_span(span),
                })
            }
        };

        let id = self.new_allocation(class_name, IndexMap::new());
        if allocation.kind == AllocationKind::New {
            match initializer {
                Some(initializer) => {
                    let mut arguments = vec![Operand::Fresh(id)];
                    for argument in &allocation.arguments {
                        arguments.push(self.evaluate(argument)?);
                    }
                    self.bind_call("initialize", initializer, arguments, span)?;
                }
                None if !allocation.arguments.is_empty() => {
                    return Err(InferenceError::ArityMismatch {
                        def_name: format!("{class_name}#initialize"),
                        expected: 1,
                        found: allocation.arguments.len() + 1,
                    });
                }
                None => {}
            }
        }

        Ok(self.settle(Operand::Fresh(id)))
    }

    /// The element binding keeps the first element's identity; every element
    /// must have the same concrete type
    fn array_literal(&mut self, elements: &[Expression]) -> Result<Operand, InferenceError> {
        let id = self.new_allocation(ARRAY_CLASS, IndexMap::new());

        let mut element_type = None;
        for element in elements {
            let value = self.evaluate(element)?;
            let ty = self.concrete_type(&value, element.span)?;
            match element_type {
                Some(expected) if !self.engine.universe.structurally_equal(expected, ty) => {
                    let universe = &self.engine.universe;
                    return Err(InferenceError::HeterogeneousArray {
                        expected: universe.display(expected).to_string(),
                        found: universe.display(ty).to_string(),
                        span: to_source_span(element.span),
                    });
                }
                Some(_) => {}
                None => {
                    element_type = Some(ty);
                    self.allocations[id].fields.insert(Selector::Element, value);
                }
            }
        }

        Ok(Operand::Fresh(id))
    }

    fn assign(&mut self, assignment: &Assignment, span: Span) -> Result<Operand, InferenceError> {
        match &assignment.target {
            AssignmentTarget::Local(name) => {
                let value = self.evaluate(&assignment.value)?;
                self.locals.insert(name.clone(), value.clone());
                Ok(value)
            }
            AssignmentTarget::Field { receiver, selector } => {
                let base = self.evaluate(receiver)?;
                let value = self.evaluate(&assignment.value)?;
                self.write_field(base, selector, value, span)
            }
        }
    }

    fn method_call(&mut self, call: &MethodCall, span: Span) -> Result<Operand, InferenceError> {
        let (receiver, target) = match &call.receiver {
            Some(receiver) => {
                let receiver = self.evaluate(receiver)?;
                let target = self.dispatch(&receiver, &call.method_name, span)?;
                (Some(receiver), target)
            }
            None => {
                let self_method = self
                    .owner
                    .as_deref()
                    .and_then(|owner| self.engine.registry.method(owner, &call.method_name));
                match self_method {
                    Some(target) => (Some(self.self_operand(span)?), target),
                    None => match self.engine.registry.function(&call.method_name) {
                        Some(target) => (None, target),
                        None => {
                            return Err(InferenceError::UndefinedMethod {
                                receiver: self.owner.clone().unwrap_or_else(|| "main".to_string()),
                                method_name: call.method_name.clone(),
                                span: to_source_span(span),
                            })
                        }
                    },
                }
            }
        };

        let mut arguments: Vec<Operand> = receiver.into_iter().collect();
        for argument in &call.arguments {
            arguments.push(self.evaluate(argument)?);
        }
        self.bind_call(&call.method_name, target, arguments, span)
    }

    fn dispatch(
        &self,
        receiver: &Operand,
        method_name: &str,
        span: Span,
    ) -> Result<DefId, InferenceError> {
        let class_name = self.class_name_of(receiver, span)?;
        class_name
            .as_deref()
            .and_then(|class_name| self.engine.registry.method(class_name, method_name))
            .ok_or_else(|| InferenceError::UndefinedMethod {
                receiver: class_name.unwrap_or_else(|| "Scalar".to_string()),
                method_name: method_name.to_string(),
                span: to_source_span(span),
            })
    }

    /// `base.selector`
    pub(super) fn read_field(
        &mut self,
        base: Operand,
        selector: &Selector,
        span: Span,
    ) -> Result<Operand, InferenceError> {
        match self.settle(base) {
            Operand::Path(path) => {
                let object = self.path_type(&path, span)?;
                let field_type = self.field_type(object, selector, span)?;
                if self.engine.universe.is_scalar(field_type) {
                    Ok(Operand::Type(field_type))
                } else {
                    Ok(Operand::Path(path.child(selector.clone())))
                }
            }
            Operand::Type(object) => Ok(Operand::Type(self.field_type(object, selector, span)?)),
            Operand::Fresh(id) => match self.allocations[id].fields.get(selector).cloned() {
                Some(Operand::Type(field_type)) => match self.promote(field_type) {
                    Some(promoted) => {
                        self.allocations[id]
                            .fields
                            .insert(selector.clone(), Operand::Fresh(promoted));
                        Ok(Operand::Fresh(promoted))
                    }
                    None => Ok(Operand::Type(field_type)),
                },
                Some(operand) => Ok(self.settle(operand)),
                None => {
                    let class_name = self.allocations[id].class_name.clone();
                    Err(self.missing_field(&class_name, selector, span))
                }
            },
        }
    }

    /// `base.selector = value`.
    ///
    /// Writes through a parameter path are recorded and yield the target path.
    /// The target's previous contents are detached from the frame first.
    /// Writes into non-escaping objects only update the frame and yield `value`.
    pub(super) fn write_field(
        &mut self,
        base: Operand,
        selector: &Selector,
        value: Operand,
        span: Span,
    ) -> Result<Operand, InferenceError> {
        let base = self.settle(base);
        let value = self.settle(value);

        let class_name = match self.class_name_of(&base, span)? {
            Some(class_name) => class_name,
            None => {
                return Err(InferenceError::NotAnObject {
                    field: selector.to_string(),
                    span: to_source_span(span),
                })
            }
        };
        let declared = self
            .engine
            .registry
            .class(&class_name)
            .is_some_and(|class| class.declares(selector));
        if !declared {
            return Err(InferenceError::UnknownField {
                type_name: class_name,
                field: selector.to_string(),
                span: to_source_span(span),
            });
        }

        match base {
            Operand::Path(path) => {
                let target = path.child(selector.clone());
                let value = self.detach(&target, value, span)?;
                let written = self.concrete_type(&value, span)?;

                let slot = target.root() - 1;
                let current = self.slot_types[slot];
                match self
                    .engine
                    .universe
                    .with_field_at(current, target.selectors(), written)
                {
                    Some(updated) => self.slot_types[slot] = updated,
                    None => {
                        return Err(InferenceError::NotAnObject {
                            field: selector.to_string(),
                            span: to_source_span(span),
                        })
                    }
                }

                self.record_write(target.clone(), value, span)?;
                Ok(Operand::Path(target))
            }
            Operand::Fresh(id) => {
                self.allocations[id]
                    .fields
                    .insert(selector.clone(), value.clone());
                Ok(value)
            }
            Operand::Type(_) => Ok(value),
        }
    }
}
