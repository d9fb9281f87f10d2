use crate::types::{TypeNode, TypeUniverse};
use crux_ast::Selector;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

#[test]
fn test_empty_object_types_are_canonical() {
    let mut universe = TypeUniverse::new();
    let first = universe.object_type("Foo");
    let second = universe.object_type("Foo");
    let other = universe.object_type("Bar");

    assert_eq!(first, second);
    assert!(!universe.structurally_equal(first, other));
    assert!(!universe.structurally_equal(first, universe.primitive()));
}

#[test]
fn test_with_field_builds_a_new_node() {
    let mut universe = TypeUniverse::new();
    let foo = universe.object_type("Foo");
    let int = universe.primitive();
    let with_value = universe.with_field(foo, "@value", int);

    assert_ne!(foo, with_value);
    assert!(universe.field(foo, &Selector::field("@value")).is_none());
    assert_eq!(universe.field(with_value, &Selector::field("@value")), Some(int));
    assert_eq!(universe.display(with_value).to_string(), "Foo{@value: Scalar}");
}

#[test]
fn test_structural_equality_ignores_identity_and_field_order() {
    let mut universe = TypeUniverse::new();
    let foo = universe.object_type("Foo");
    let int = universe.primitive();

    let left = universe.with_field(foo, "@a", int);
    let left = universe.with_field(left, "@b", foo);
    let right = universe.reserve_object("Foo");
    let mut fields = IndexMap::new();
    fields.insert(Selector::field("@b"), foo);
    fields.insert(Selector::field("@a"), int);
    universe.define_fields(right, fields);

    assert_ne!(left, right);
    assert!(universe.structurally_equal(left, right));
    assert_eq!(universe.fingerprint(left), universe.fingerprint(right));

    let different = universe.with_field(right, "@a", foo);
    assert!(!universe.structurally_equal(left, different));
}

#[test]
fn test_equal_field_builds_share_a_node() {
    let mut universe = TypeUniverse::new();
    let foo = universe.object_type("Foo");
    let int = universe.primitive();

    let first = universe.with_field(foo, "@a", int);
    let first = universe.with_field(first, "@b", foo);
    let allocated = universe.len();

    let second = universe.with_field(foo, "@b", foo);
    let second = universe.with_field(second, "@a", int);
    assert_eq!(first, second);
    assert_eq!(universe.len(), allocated + 1);

    // Rebinding a field to a structurally equal type is free
    let rebound = universe.with_field(first, "@b", foo);
    assert_eq!(rebound, first);
    assert_eq!(universe.len(), allocated + 1);

    let other = universe.with_field(foo, "@a", foo);
    assert_ne!(other, first);
    assert_eq!(universe.len(), allocated + 2);
    assert_eq!(other.index(), universe.len() - 1);
}

#[test]
fn test_with_field_at_rebuilds_enclosing_objects() {
    let mut universe = TypeUniverse::new();
    let foo = universe.object_type("Foo");
    let int = universe.primitive();
    let nested = universe.with_field(foo, "@value", foo);

    let path = [Selector::field("@value"), Selector::field("@value")];
    let updated = universe.with_field_at(nested, &path, int).unwrap();

    assert_eq!(universe.navigate(updated, &path), Some(int));
    assert_eq!(
        universe.display(updated).to_string(),
        "Foo{@value: Foo{@value: Scalar}}"
    );
    // The original binding is untouched
    assert_eq!(universe.navigate(nested, &path), None);

    assert_eq!(universe.with_field_at(int, &path[..1], int), None);
}

#[test]
fn test_cyclic_types_compare_coinductively() {
    let mut universe = TypeUniverse::new();

    let build_cycle = |universe: &mut TypeUniverse| {
        let node = universe.reserve_object("Node");
        let mut fields = IndexMap::new();
        fields.insert(Selector::field("@next"), node);
        universe.define_fields(node, fields);
        node
    };
    let first = build_cycle(&mut universe);
    let second = build_cycle(&mut universe);

    assert_ne!(first, second);
    assert!(universe.structurally_equal(first, second));
    assert_eq!(universe.fingerprint(first), universe.fingerprint(second));
    assert_eq!(universe.display(first).to_string(), "Node{@next: Node}");

    // Unrolled once, the cycle still describes the same infinite type
    let unrolled = universe.reserve_object("Node");
    let mut fields = IndexMap::new();
    fields.insert(Selector::field("@next"), first);
    universe.define_fields(unrolled, fields);
    assert!(universe.structurally_equal(unrolled, second));
}

#[test]
fn test_cycle_does_not_equal_finite_chain() {
    let mut universe = TypeUniverse::new();
    let node = universe.reserve_object("Node");
    let mut fields = IndexMap::new();
    fields.insert(Selector::field("@next"), node);
    universe.define_fields(node, fields);

    let leaf = universe.object_type("Node");
    let chain = universe.with_field(leaf, "@next", leaf);

    assert!(!universe.structurally_equal(node, chain));
}

#[test]
fn test_fields_iterates_in_binding_order() {
    let mut universe = TypeUniverse::new();
    let array = universe.object_type("Array");
    let int = universe.primitive();
    let with_element = universe.with_field(array, Selector::Element, int);

    let fields: Vec<_> = universe.fields(with_element).collect();
    assert_eq!(fields, vec![(&Selector::Element, int)]);
    assert!(universe.fields(int).next().is_none());
    assert!(matches!(universe.node(int), TypeNode::Scalar));
}
