use crate::error::{to_source_span, InferenceError};
use crux_ast::Span;
use miette::Diagnostic;
use pretty_assertions::assert_eq;

fn unbound() -> InferenceError {
    InferenceError::UnboundField {
        type_name: "Foo".to_string(),
        field: "@value".to_string(),
        span: to_source_span(Span::new(4, 10)),
    }
}

#[test]
fn test_within_signature_keeps_innermost_attribution() {
    let error = unbound()
        .within_signature("Foo#value(Foo)")
        .within_signature("<main>()");

    assert_eq!(error.signature(), Some("Foo#value(Foo)"));
    assert_eq!(error.to_string(), "While analyzing Foo#value(Foo)");
    assert!(matches!(
        error.root_cause(),
        InferenceError::UnboundField { field, .. } if field == "@value"
    ));
}

#[test]
fn test_source_chain_reaches_root_cause() {
    let error = unbound().within_signature("Foo#value(Foo)");
    let source = std::error::Error::source(&error).map(ToString::to_string);
    assert_eq!(
        source.as_deref(),
        Some("Field @value of Foo is read before it is assigned")
    );
}

#[test]
fn test_diagnostic_codes_and_labels() {
    let error = unbound();
    assert_eq!(
        error.code().map(|code| code.to_string()).as_deref(),
        Some("crux::infer::unbound_field")
    );

    let labels: Vec<_> = error.labels().into_iter().flatten().collect();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].offset(), 4);
    assert_eq!(labels[0].len(), 6);
}

#[test]
fn test_empty_spans_carry_no_label() {
    assert!(to_source_span(Span::default()).is_none());

    let error = InferenceError::UndefinedVariable {
        variable_name: "x".to_string(),
        span: to_source_span(Span::default()),
    };
    assert_eq!(error.labels().into_iter().flatten().count(), 0);
}

#[test]
fn test_recursion_errors_name_their_signature() {
    let error = InferenceError::RecursiveSignature {
        signature: "foo(Scalar)".to_string(),
    };
    assert_eq!(error.signature(), Some("foo(Scalar)"));
    assert_eq!(error.to_string(), "Recursive analysis of foo(Scalar)");
}

#[test]
fn test_unbound_slot_is_its_own_failure() {
    let error = InferenceError::UnboundSlot {
        method_name: "foo".to_string(),
        slot: 2,
        span: to_source_span(Span::new(0, 6)),
    };
    assert_eq!(
        error.code().map(|code| code.to_string()).as_deref(),
        Some("crux::infer::unbound_slot")
    );
    assert_eq!(
        error.to_string(),
        "Result of foo refers to slot 2, which the call does not bind"
    );
    assert_eq!(error.signature(), None);
}
