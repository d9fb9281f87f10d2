//! Core library classes available to every program
//!
//! `Object` is the plain field-less heap type. `Array` is the indexed collection:
//! it has the single generic `element` selector and the index methods `[]` and
//! `[]=` that read and write it.

use crux_ast::builder::{assign_field, element, self_ref, var};
use crux_ast::{ClassDefinition, MethodDefinition, Selector};

pub const OBJECT_CLASS: &str = "Object";
pub const ARRAY_CLASS: &str = "Array";

pub fn classes() -> Vec<ClassDefinition> {
    vec![object_class(), array_class()]
}

fn object_class() -> ClassDefinition {
    ClassDefinition::new(OBJECT_CLASS)
}

fn array_class() -> ClassDefinition {
    // def [](index); self.element; end
    let getter = MethodDefinition::new("[]", &["index"], vec![element(self_ref())]);

    // def []=(index, value); self.element = value; end
    let setter = MethodDefinition::new(
        "[]=",
        &["index", "value"],
        vec![assign_field(self_ref(), Selector::Element, var("value"))],
    );

    ClassDefinition::new(ARRAY_CLASS)
        .with_field(Selector::Element)
        .with_method(getter)
        .with_method(setter)
}
