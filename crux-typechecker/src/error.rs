//! Error types for the Crux inference engine
//!
//! Following the miette diagnostic pattern: every failure carries a code, help
//! text and, where an expression is at fault, a labelled span.

use crux_ast::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum InferenceError {
    #[error("Unknown field {field} on {type_name}")]
    #[diagnostic(
        code(crux::infer::unknown_field),
        help("Declare {field} on class {type_name} before reading or writing it")
    )]
    UnknownField {
        type_name: String,
        field: String,
        #[label("{type_name} has no field {field}")]
        span: Option<SourceSpan>,
    },

    #[error("Field {field} of {type_name} is read before it is assigned")]
    #[diagnostic(
        code(crux::infer::unbound_field),
        help("Assign {field} before reading it so its type is known")
    )]
    UnboundField {
        type_name: String,
        field: String,
        #[label("{field} has no type yet")]
        span: Option<SourceSpan>,
    },

    #[error("Cannot select {field} on a primitive value")]
    #[diagnostic(
        code(crux::infer::not_an_object),
        help("Only object types have fields")
    )]
    NotAnObject {
        field: String,
        #[label("primitive value")]
        span: Option<SourceSpan>,
    },

    #[error("Undefined variable: {variable_name}")]
    #[diagnostic(
        code(crux::infer::undefined_variable),
        help("Ensure the variable is assigned or is a parameter before use")
    )]
    UndefinedVariable {
        variable_name: String,
        #[label("undefined variable")]
        span: Option<SourceSpan>,
    },

    #[error("Undefined class: {class_name}")]
    #[diagnostic(code(crux::infer::undefined_class))]
    UndefinedClass {
        class_name: String,
        #[label("undefined class")]
        span: Option<SourceSpan>,
    },

    #[error("Undefined method {method_name} for {receiver}")]
    #[diagnostic(
        code(crux::infer::undefined_method),
        help("Define {method_name} on the receiver's class or as a top-level function")
    )]
    UndefinedMethod {
        receiver: String,
        method_name: String,
        #[label("no method {method_name}")]
        span: Option<SourceSpan>,
    },

    #[error("`self` used outside of a class method")]
    #[diagnostic(code(crux::infer::self_outside_method))]
    SelfOutsideMethod {
        #[label("no receiver here")]
        span: Option<SourceSpan>,
    },

    #[error("Arity mismatch: {def_name} expects {expected} arguments, found {found}")]
    #[diagnostic(
        code(crux::infer::arity_mismatch),
        help("The receiver of a class method counts as its first argument")
    )]
    ArityMismatch {
        def_name: String,
        expected: usize,
        found: usize,
    },

    #[error("Recursive analysis of {signature}")]
    #[diagnostic(
        code(crux::infer::recursive_signature),
        help("Signatures are analyzed once without fixed-point iteration, so a call that re-enters an unfinished signature cannot be typed")
    )]
    RecursiveSignature { signature: String },

    #[error("Call depth limit of {limit} exceeded while analyzing {signature}")]
    #[diagnostic(
        code(crux::infer::call_depth_exceeded),
        help("Raise EngineOptions::max_call_depth if the call chain is legitimately this deep")
    )]
    CallDepthExceeded { signature: String, limit: usize },

    #[error("Array elements disagree: expected {expected}, found {found}")]
    #[diagnostic(
        code(crux::infer::heterogeneous_array),
        help("All elements of an array literal must have the same type")
    )]
    HeterogeneousArray {
        expected: String,
        found: String,
        #[label("element of type {found}")]
        span: Option<SourceSpan>,
    },

    #[error("Result of {method_name} refers to slot {slot}, which the call does not bind")]
    #[diagnostic(
        code(crux::infer::unbound_slot),
        help("This is an internal inconsistency between a cached instance and its call site")
    )]
    UnboundSlot {
        method_name: String,
        slot: usize,
        #[label("bound here")]
        span: Option<SourceSpan>,
    },

    #[error("While analyzing {signature}")]
    #[diagnostic(code(crux::infer::in_signature))]
    InSignature {
        signature: String,
        #[source]
        source: Box<InferenceError>,
    },
}

impl InferenceError {
    /// Attach the identity of the signature whose analysis failed.
    ///
    /// Errors already attributed to a signature keep their innermost attribution.
    pub fn within_signature(self, signature: impl Into<String>) -> Self {
        match self {
            InferenceError::InSignature { .. } => self,
            other => InferenceError::InSignature {
                signature: signature.into(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying failure with any signature attribution stripped
    pub fn root_cause(&self) -> &InferenceError {
        match self {
            InferenceError::InSignature { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The signature the failure was attributed to, if any
    pub fn signature(&self) -> Option<&str> {
        match self {
            InferenceError::InSignature { signature, .. } => Some(signature),
            InferenceError::RecursiveSignature { signature }
            | InferenceError::CallDepthExceeded { signature, .. } => Some(signature),
            _ => None,
        }
    }
}

/// Convert an AST span to a miette label span; zero-width spans carry no location
pub fn to_source_span(span: Span) -> Option<SourceSpan> {
    if span.is_empty() {
        None
    } else {
        Some(SourceSpan::new(span.start.into(), span.len()))
    }
}
