use crate::cache::{CacheLookup, CacheStats, Instance, Signature, SignatureCache};
use crate::path::{Mutation, Path, Value};
use crate::types::TypeUniverse;
use crux_ast::Selector;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn instance(signature: Signature, return_value: Value) -> Rc<Instance> {
    Rc::new(Instance {
        signature,
        return_value,
        mutations: vec![Mutation::new(
            Path::with_selectors(1, ["@value"]),
            Path::new(2),
        )],
        calls: Vec::new(),
    })
}

#[test]
fn test_lookup_lifecycle() {
    let mut universe = TypeUniverse::new();
    let foo = universe.object_type("Foo");
    let int = universe.primitive();
    let arguments = [foo, int];

    let mut cache = SignatureCache::new();
    assert!(matches!(cache.lookup(&universe, &arguments), CacheLookup::Miss));

    cache.begin(&universe, &arguments);
    assert!(matches!(
        cache.lookup(&universe, &arguments),
        CacheLookup::InProgress
    ));
    assert!(cache.is_empty());

    let stored = instance(
        Signature::new("Foo#value=", arguments.to_vec()),
        Value::Path(Path::with_selectors(1, ["@value"])),
    );
    cache.complete(&universe, &arguments, Rc::clone(&stored));

    match cache.lookup(&universe, &arguments) {
        CacheLookup::Hit(found) => assert!(Rc::ptr_eq(&found, &stored)),
        other => panic!("Expected a cache hit, got: {other:?}"),
    }
    assert_eq!(cache.len(), 1);
    assert_eq!(
        cache.stats(),
        &CacheStats {
            cache_hits: 1,
            cache_misses: 1,
            recursive_entries: 1,
        }
    );
}

#[test]
fn test_lookup_is_structural() {
    let mut universe = TypeUniverse::new();
    let foo = universe.object_type("Foo");
    let int = universe.primitive();
    let first = universe.with_field(foo, "@value", int);
    let second = universe.reserve_object("Foo");
    let mut fields = IndexMap::new();
    fields.insert(Selector::field("@value"), int);
    universe.define_fields(second, fields);
    assert_ne!(first, second);

    let mut cache = SignatureCache::new();
    cache.begin(&universe, &[first]);
    cache.complete(
        &universe,
        &[first],
        instance(Signature::new("foo", vec![first]), Value::Type(int)),
    );

    assert!(cache.get(&universe, &[second]).is_some());
    assert!(cache.get(&universe, &[foo]).is_none());
    assert!(cache.get(&universe, &[first, int]).is_none());
}

#[test]
fn test_abandon_drops_only_the_in_progress_marker() {
    let mut universe = TypeUniverse::new();
    let foo = universe.object_type("Foo");
    let int = universe.primitive();

    let mut cache = SignatureCache::new();
    cache.begin(&universe, &[int]);
    cache.complete(
        &universe,
        &[int],
        instance(Signature::new("foo", vec![int]), Value::Type(int)),
    );
    cache.begin(&universe, &[foo]);

    cache.abandon(&universe, &[foo]);
    cache.abandon(&universe, &[int]);

    assert!(matches!(cache.lookup(&universe, &[foo]), CacheLookup::Miss));
    assert!(cache.get(&universe, &[int]).is_some());
    assert_eq!(cache.instances().count(), 1);
}

#[test]
fn test_signature_display_and_matching() {
    let mut universe = TypeUniverse::new();
    let foo = universe.object_type("Foo");
    let int = universe.primitive();
    let with_value = universe.with_field(foo, "@value", int);

    let signature = Signature::new("Foo#value=", vec![with_value, int]);
    assert_eq!(
        signature.display(&universe).to_string(),
        "Foo#value=(Foo{@value: Scalar}, Scalar)"
    );

    let rebuilt = universe.with_field(foo, "@value", int);
    assert!(signature.matches(&Signature::new("Foo#value=", vec![rebuilt, int]), &universe));
    assert!(!signature.matches(&Signature::new("Foo#value", vec![rebuilt, int]), &universe));
}
