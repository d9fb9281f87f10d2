// Inference failure tests
// Failures surface as InferenceError wrapped with the signature whose analysis failed

use crux_ast::builder::*;
use crux_ast::Program;
use crux_typechecker::{infer_program, infer_program_with_options, EngineOptions, InferenceEngine, InferenceError};
use pretty_assertions::assert_eq;

fn infer_error(program: &Program) -> InferenceError {
    match infer_program(program) {
        Ok(_) => panic!("expected inference to fail"),
        Err(error) => error,
    }
}

#[test]
fn test_direct_recursion_fails_fast() {
    let program = Program::new()
        .with_function(def("foo", &["x"], vec![call_fn("foo", vec![var("x")])]))
        .with_main(vec![call_fn("foo", vec![int(1)])]);

    let error = infer_error(&program);
    assert_eq!(error.signature(), Some("foo(Scalar)"));
    match error.root_cause() {
        InferenceError::RecursiveSignature { signature } => assert_eq!(signature, "foo(Scalar)"),
        other => panic!("Expected RecursiveSignature, got: {other:?}"),
    }
}

#[test]
fn test_mutual_recursion_fails_fast() {
    let program = Program::new()
        .with_function(def("ping", &["x"], vec![call_fn("pong", vec![var("x")])]))
        .with_function(def("pong", &["x"], vec![call_fn("ping", vec![var("x")])]))
        .with_main(vec![call_fn("ping", vec![new("Object", vec![])])]);

    let error = infer_error(&program);
    assert!(matches!(
        error.root_cause(),
        InferenceError::RecursiveSignature { signature } if signature == "ping(Object)"
    ));
}

#[test]
fn test_failed_analysis_leaves_no_cache_entry() {
    let program = Program::new()
        .with_function(def("foo", &["x"], vec![call_fn("foo", vec![var("x")])]));

    let mut engine = InferenceEngine::new(&program);
    let foo = engine.function("foo").unwrap();
    let int = engine.universe().primitive();

    assert!(engine.analyze(foo, &[int]).is_err());
    assert!(engine.cached_instance(foo, &[int]).is_none());
    assert!(engine.registry().def(foo).cache().is_empty());

    // The signature is not stuck in progress: a second attempt reports the same cycle
    let error = engine.analyze(foo, &[int]).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        InferenceError::RecursiveSignature { .. }
    ));
}

#[test]
fn test_arity_mismatch() {
    let program = Program::new()
        .with_function(def("foo", &["x"], vec![var("x")]))
        .with_main(vec![call_fn("foo", vec![])]);

    let error = infer_error(&program);
    assert_eq!(error.signature(), Some("<main>()"));
    match error.root_cause() {
        InferenceError::ArityMismatch {
            def_name,
            expected,
            found,
        } => {
            assert_eq!(def_name, "foo");
            assert_eq!(*expected, 1);
            assert_eq!(*found, 0);
        }
        other => panic!("Expected ArityMismatch, got: {other:?}"),
    }
}

#[test]
fn test_arity_counts_receiver() {
    let program = Program::new()
        .with_class(class("Foo").with_method(def("foo", &["x"], vec![var("x")])))
        .with_main(vec![call(new("Foo", vec![]), "foo", vec![])]);

    let error = infer_error(&program);
    match error.root_cause() {
        InferenceError::ArityMismatch {
            def_name,
            expected,
            found,
        } => {
            assert_eq!(def_name, "Foo#foo");
            assert_eq!(*expected, 2);
            assert_eq!(*found, 1);
        }
        other => panic!("Expected ArityMismatch, got: {other:?}"),
    }
}

#[test]
fn test_new_with_arguments_requires_initialize() {
    let program = Program::new()
        .with_class(class("Foo"))
        .with_main(vec![new("Foo", vec![int(1)])]);

    let error = infer_error(&program);
    assert!(matches!(
        error.root_cause(),
        InferenceError::ArityMismatch { def_name, .. } if def_name == "Foo#initialize"
    ));
}

#[test]
fn test_unknown_field_write() {
    let program = Program::new()
        .with_class(class("Foo"))
        .with_main(vec![
            assign("f", new("Foo", vec![])),
            assign_field(var("f"), "@bar", int(1)),
        ]);

    let error = infer_error(&program);
    match error.root_cause() {
        InferenceError::UnknownField {
            type_name, field, ..
        } => {
            assert_eq!(type_name, "Foo");
            assert_eq!(field, "@bar");
        }
        other => panic!("Expected UnknownField, got: {other:?}"),
    }
}

#[test]
fn test_unbound_field_read_is_attributed_to_reader() {
    let program = Program::new()
        .with_class(class("Foo").with_accessor("value"))
        .with_main(vec![call(new("Foo", vec![]), "value", vec![])]);

    let error = infer_error(&program);
    assert_eq!(error.signature(), Some("Foo#value(Foo)"));
    match error.root_cause() {
        InferenceError::UnboundField {
            type_name, field, ..
        } => {
            assert_eq!(type_name, "Foo");
            assert_eq!(field, "@value");
        }
        other => panic!("Expected UnboundField, got: {other:?}"),
    }
}

#[test]
fn test_field_read_on_primitive() {
    let program = Program::new().with_main(vec![field(int(1), "@value")]);

    let error = infer_error(&program);
    assert!(matches!(
        error.root_cause(),
        InferenceError::NotAnObject { field, .. } if field == "@value"
    ));
}

#[test]
fn test_undefined_names() {
    let cases = vec![
        (Program::new().with_main(vec![var("x")]), "Undefined variable: x"),
        (
            Program::new().with_main(vec![new("Missing", vec![])]),
            "Undefined class: Missing",
        ),
        (
            Program::new().with_main(vec![call(int(1), "foo", vec![])]),
            "Undefined method foo for Scalar",
        ),
        (
            Program::new().with_main(vec![call_fn("foo", vec![])]),
            "Undefined method foo for main",
        ),
        (
            Program::new().with_main(vec![self_ref()]),
            "`self` used outside of a class method",
        ),
    ];

    for (program, expected) in cases {
        let error = infer_error(&program);
        assert_eq!(error.root_cause().to_string(), expected);
    }
}

#[test]
fn test_heterogeneous_array_literal() {
    let program = Program::new().with_main(vec![array(vec![int(1), new("Object", vec![])])]);

    let error = infer_error(&program);
    match error.root_cause() {
        InferenceError::HeterogeneousArray {
            expected, found, ..
        } => {
            assert_eq!(expected, "Scalar");
            assert_eq!(found, "Object");
        }
        other => panic!("Expected HeterogeneousArray, got: {other:?}"),
    }
}

#[test]
fn test_call_depth_limit() {
    let program = Program::new()
        .with_function(def("a", &[], vec![call_fn("b", vec![])]))
        .with_function(def("b", &[], vec![call_fn("c", vec![])]))
        .with_function(def("c", &[], vec![int(1)]))
        .with_main(vec![call_fn("a", vec![])]);

    let options = EngineOptions::new().with_max_call_depth(2);
    let error = match infer_program_with_options(&program, options) {
        Ok(_) => panic!("expected the depth limit to trip"),
        Err(error) => error,
    };
    match error.root_cause() {
        InferenceError::CallDepthExceeded { signature, limit } => {
            assert_eq!(signature, "b()");
            assert_eq!(*limit, 2);
        }
        other => panic!("Expected CallDepthExceeded, got: {other:?}"),
    }

    assert!(infer_program(&program).is_ok());
}
