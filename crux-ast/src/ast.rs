// Crux AST Definitions
// Already-parsed method bodies and class declarations handed to the inference engine

use std::fmt;

/// Source position information for AST nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A complete program: class declarations, top-level functions and the
/// top-level expressions that run as the implicit entry point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub classes: Vec<ClassDefinition>,
    pub functions: Vec<MethodDefinition>,
    pub main: Block,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: ClassDefinition) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_function(mut self, function: MethodDefinition) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_main(mut self, expressions: Vec<Expression>) -> Self {
        self.main = Block::new(expressions);
        self
    }
}

/// Selector used to step from an object to one of its parts.
///
/// Fields keep their source spelling (`@value`); indexed collections use the
/// single generic `element` selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Selector {
    Field(String),
    Element,
}

impl Selector {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element)
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Field(name) => write!(f, "{name}"),
            Selector::Element => write!(f, "element"),
        }
    }
}

/// Class declaration: instance variables plus methods.
///
/// The same class name may be declared more than once; the registry merges
/// reopened declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    pub name: String,
    pub fields: Vec<Selector>,
    pub methods: Vec<MethodDefinition>,
    pub span: Span,
}

impl ClassDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
            span: Span::default(),
        }
    }

    /// Declare an instance variable (`@name`)
    pub fn with_field(mut self, field: impl Into<Selector>) -> Self {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    pub fn with_method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    /// Declare `@name` together with a reader `name` and a writer `name=`
    pub fn with_accessor(self, name: &str) -> Self {
        let ivar = format!("@{name}");
        let getter = MethodDefinition::new(name, &[], vec![Expression::new(
            ExpressionKind::InstanceVariable(ivar.clone()),
        )]);
        let setter = MethodDefinition::new(
            format!("{name}="),
            &[name],
            vec![Expression::new(ExpressionKind::Assignment(Assignment {
                target: AssignmentTarget::Field {
                    receiver: Box::new(Expression::new(ExpressionKind::SelfReference)),
                    selector: Selector::Field(ivar.clone()),
                },
                value: Box::new(Expression::new(ExpressionKind::Variable(name.to_string()))),
            }))],
        );

        self.with_field(ivar).with_method(getter).with_method(setter)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// A method or top-level function definition
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: Block,
    pub span: Span,
}

impl MethodDefinition {
    pub fn new(name: impl Into<String>, parameters: &[&str], body: Vec<Expression>) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.iter().map(|name| Parameter::new(*name)).collect(),
            body: Block::new(body),
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub span: Span,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }
}

/// Sequence of expressions; its value is the value of the last one
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub expressions: Vec<Expression>,
    pub span: Span,
}

impl Block {
    pub fn new(expressions: Vec<Expression>) -> Self {
        Self {
            expressions,
            span: Span::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

/// Expression node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExpressionKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    IntegerLiteral(i64),
    Variable(String),
    SelfReference,
    /// `@name`, shorthand for a field read on `self`
    InstanceVariable(String),
    FieldAccess(FieldAccess),
    Allocation(Allocation),
    ArrayLiteral(Vec<Expression>),
    Assignment(Assignment),
    MethodCall(MethodCall),
}

/// Raw selector read `receiver.selector`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccess {
    pub receiver: Box<Expression>,
    pub selector: Selector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKind {
    /// `Foo.new(...)`: allocate, then run `initialize` when the class has one
    New,
    /// `Foo.alloc`: allocate only
    Alloc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub class_name: String,
    pub kind: AllocationKind,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: AssignmentTarget,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentTarget {
    Local(String),
    Field {
        receiver: Box<Expression>,
        selector: Selector,
    },
}

/// Method call; a missing receiver means either `self` or a top-level function
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub receiver: Option<Box<Expression>>,
    pub method_name: String,
    pub arguments: Vec<Expression>,
}
