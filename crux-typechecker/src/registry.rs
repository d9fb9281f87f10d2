//! Definition registry
//!
//! Holds every analyzable definition (class methods, top-level functions and the
//! implicit `<main>` body) together with its signature cache, and the declared
//! field set of every class.

use crate::cache::SignatureCache;
use crate::core_library;
use crux_ast::{ClassDefinition, MethodDefinition, Program, Selector};
use indexmap::{IndexMap, IndexSet};
use std::rc::Rc;

/// Name of the implicit definition wrapping a program's top-level expressions
pub const MAIN_DEF_NAME: &str = "<main>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(usize);

impl DefId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A definition plus the memoized analyses observed for it
#[derive(Debug)]
pub struct Def {
    pub name: String,
    /// Class the method belongs to; `None` for top-level functions and `<main>`
    pub owner: Option<String>,
    pub definition: Rc<MethodDefinition>,
    pub(crate) cache: SignatureCache,
}

impl Def {
    fn new(owner: Option<&str>, definition: MethodDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            owner: owner.map(str::to_string),
            definition: Rc::new(definition),
            cache: SignatureCache::new(),
        }
    }

    /// Number of argument slots, counting the receiver of a class method
    pub fn arity(&self) -> usize {
        self.definition.parameters.len() + self.receiver_slots()
    }

    pub fn is_method(&self) -> bool {
        self.owner.is_some()
    }

    /// Slot bound to the named parameter
    pub fn parameter_slot(&self, name: &str) -> Option<usize> {
        self.definition
            .parameters
            .iter()
            .position(|parameter| parameter.name == name)
            .map(|position| position + 1 + self.receiver_slots())
    }

    /// `Class#method` for methods, the bare name otherwise
    pub fn qualified_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}#{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn cache(&self) -> &SignatureCache {
        &self.cache
    }

    fn receiver_slots(&self) -> usize {
        usize::from(self.owner.is_some())
    }
}

/// Declared shape of a class
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub fields: IndexSet<Selector>,
    pub methods: IndexMap<String, DefId>,
}

impl ClassInfo {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: IndexSet::new(),
            methods: IndexMap::new(),
        }
    }

    pub fn declares(&self, selector: &Selector) -> bool {
        self.fields.contains(selector)
    }

    pub fn method(&self, name: &str) -> Option<DefId> {
        self.methods.get(name).copied()
    }
}

#[derive(Debug)]
pub struct DefRegistry {
    defs: Vec<Def>,
    classes: IndexMap<String, ClassInfo>,
    functions: IndexMap<String, DefId>,
    main: DefId,
}

impl DefRegistry {
    /// Collect the core library plus every declaration in `program`.
    ///
    /// Reopened classes accumulate fields; a later definition of the same method
    /// or function replaces the earlier one.
    pub fn from_program(program: &Program) -> Self {
        let mut registry = Self {
            defs: Vec::new(),
            classes: IndexMap::new(),
            functions: IndexMap::new(),
            main: DefId(0),
        };

        for class in core_library::classes() {
            registry.register_class(&class);
        }
        for class in &program.classes {
            registry.register_class(class);
        }
        for function in &program.functions {
            let id = registry.push(Def::new(None, function.clone()));
            registry.functions.insert(function.name.clone(), id);
        }

        let main = MethodDefinition {
            name: MAIN_DEF_NAME.to_string(),
            parameters: Vec::new(),
            body: program.main.clone(),
            span: program.main.span,
        };
        registry.main = registry.push(Def::new(None, main));
        registry
    }

    fn register_class(&mut self, class: &ClassDefinition) {
        let mut method_ids = Vec::with_capacity(class.methods.len());
        for method in &class.methods {
            let id = self.push(Def::new(Some(&class.name), method.clone()));
            method_ids.push((method.name.clone(), id));
        }

        let info = self
            .classes
            .entry(class.name.clone())
            .or_insert_with(|| ClassInfo::new(&class.name));
        info.fields.extend(class.fields.iter().cloned());
        info.methods.extend(method_ids);
    }

    fn push(&mut self, def: Def) -> DefId {
        let id = DefId(self.defs.len());
        self.defs.push(def);
        id
    }

    pub fn def(&self, id: DefId) -> &Def {
        &self.defs[id.0]
    }

    pub(crate) fn def_mut(&mut self, id: DefId) -> &mut Def {
        &mut self.defs[id.0]
    }

    pub fn defs(&self) -> impl Iterator<Item = (DefId, &Def)> {
        self.defs.iter().enumerate().map(|(index, def)| (DefId(index), def))
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    pub fn function(&self, name: &str) -> Option<DefId> {
        self.functions.get(name).copied()
    }

    pub fn method(&self, class_name: &str, method_name: &str) -> Option<DefId> {
        self.class(class_name)?.method(method_name)
    }

    pub fn main(&self) -> DefId {
        self.main
    }
}
