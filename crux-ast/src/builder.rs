// Constructor helpers for AST producers
// Keeps hand-assembled programs readable (`call(var("f"), "value=", vec![int(1)])`)

use crate::ast::*;

pub fn int(value: i64) -> Expression {
    Expression::new(ExpressionKind::IntegerLiteral(value))
}

pub fn var(name: &str) -> Expression {
    Expression::new(ExpressionKind::Variable(name.to_string()))
}

pub fn self_ref() -> Expression {
    Expression::new(ExpressionKind::SelfReference)
}

/// `@name`; the leading `@` is added when missing
pub fn ivar(name: &str) -> Expression {
    Expression::new(ExpressionKind::InstanceVariable(ivar_name(name)))
}

pub fn field(receiver: Expression, selector: impl Into<Selector>) -> Expression {
    Expression::new(ExpressionKind::FieldAccess(FieldAccess {
        receiver: Box::new(receiver),
        selector: selector.into(),
    }))
}

pub fn element(receiver: Expression) -> Expression {
    field(receiver, Selector::Element)
}

pub fn new(class_name: &str, arguments: Vec<Expression>) -> Expression {
    Expression::new(ExpressionKind::Allocation(Allocation {
        class_name: class_name.to_string(),
        kind: AllocationKind::New,
        arguments,
    }))
}

pub fn alloc(class_name: &str) -> Expression {
    Expression::new(ExpressionKind::Allocation(Allocation {
        class_name: class_name.to_string(),
        kind: AllocationKind::Alloc,
        arguments: Vec::new(),
    }))
}

pub fn array(elements: Vec<Expression>) -> Expression {
    Expression::new(ExpressionKind::ArrayLiteral(elements))
}

pub fn assign(name: &str, value: Expression) -> Expression {
    Expression::new(ExpressionKind::Assignment(Assignment {
        target: AssignmentTarget::Local(name.to_string()),
        value: Box::new(value),
    }))
}

pub fn assign_field(
    receiver: Expression,
    selector: impl Into<Selector>,
    value: Expression,
) -> Expression {
    Expression::new(ExpressionKind::Assignment(Assignment {
        target: AssignmentTarget::Field {
            receiver: Box::new(receiver),
            selector: selector.into(),
        },
        value: Box::new(value),
    }))
}

/// `@name = value`
pub fn assign_ivar(name: &str, value: Expression) -> Expression {
    assign_field(self_ref(), ivar_name(name), value)
}

pub fn call(receiver: Expression, method_name: &str, arguments: Vec<Expression>) -> Expression {
    Expression::new(ExpressionKind::MethodCall(MethodCall {
        receiver: Some(Box::new(receiver)),
        method_name: method_name.to_string(),
        arguments,
    }))
}

/// Receiver-less call: `self` method inside a class, top-level function otherwise
pub fn call_fn(method_name: &str, arguments: Vec<Expression>) -> Expression {
    Expression::new(ExpressionKind::MethodCall(MethodCall {
        receiver: None,
        method_name: method_name.to_string(),
        arguments,
    }))
}

/// `receiver[index]`
pub fn index(receiver: Expression, index: Expression) -> Expression {
    call(receiver, "[]", vec![index])
}

/// `receiver[index] = value`
pub fn index_assign(receiver: Expression, index: Expression, value: Expression) -> Expression {
    call(receiver, "[]=", vec![index, value])
}

pub fn def(name: &str, parameters: &[&str], body: Vec<Expression>) -> MethodDefinition {
    MethodDefinition::new(name, parameters, body)
}

pub fn class(name: &str) -> ClassDefinition {
    ClassDefinition::new(name)
}

fn ivar_name(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{name}")
    }
}
