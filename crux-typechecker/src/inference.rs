//! Inference engine orchestration
//!
//! The engine owns the type universe and the definition registry, and drives
//! body analysis on demand: every call site asks for the instance of its
//! target under the concrete argument types, and the engine either returns the
//! memoized instance or analyzes the body once and stores the result.

use crate::analysis::BodyAnalyzer;
use crate::cache::{CacheLookup, Instance, Signature};
use crate::error::InferenceError;
use crate::options::EngineOptions;
use crate::registry::{DefId, DefRegistry};
use crate::types::{TypeId, TypeUniverse};
use crux_ast::Program;
use std::rc::Rc;
use tracing::{debug, debug_span, trace};

pub struct InferenceEngine {
    options: EngineOptions,
    pub(crate) universe: TypeUniverse,
    pub(crate) registry: DefRegistry,
    /// Signature analyses currently in flight
    depth: usize,
}

impl InferenceEngine {
    pub fn new(program: &Program) -> Self {
        Self::with_options(program, EngineOptions::default())
    }

    pub fn with_options(program: &Program, options: EngineOptions) -> Self {
        Self {
            options,
            universe: TypeUniverse::new(),
            registry: DefRegistry::from_program(program),
            depth: 0,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    /// Build argument types for [`InferenceEngine::analyze`]
    pub fn universe_mut(&mut self) -> &mut TypeUniverse {
        &mut self.universe
    }

    pub fn registry(&self) -> &DefRegistry {
        &self.registry
    }

    pub fn function(&self, name: &str) -> Option<DefId> {
        self.registry.function(name)
    }

    pub fn method(&self, class_name: &str, method_name: &str) -> Option<DefId> {
        self.registry.method(class_name, method_name)
    }

    /// Analyze the implicit `<main>` definition
    pub fn analyze_main(&mut self) -> Result<Rc<Instance>, InferenceError> {
        let main = self.registry.main();
        self.analyze(main, &[])
    }

    /// Return the instance of `def` for `argument_types`, analyzing its body on
    /// first request.
    ///
    /// Re-entering a signature whose analysis has not finished fails with
    /// `RecursiveSignature`. A failed analysis leaves nothing in the cache.
    pub fn analyze(
        &mut self,
        def: DefId,
        argument_types: &[TypeId],
    ) -> Result<Rc<Instance>, InferenceError> {
        let definition = self.registry.def(def);
        let signature = Signature::new(definition.qualified_name(), argument_types.to_vec());

        if definition.arity() != argument_types.len() {
            return Err(InferenceError::ArityMismatch {
                def_name: signature.def_name,
                expected: definition.arity(),
                found: argument_types.len(),
            });
        }

        let lookup = self
            .registry
            .def_mut(def)
            .cache
            .lookup(&self.universe, argument_types);
        match lookup {
            CacheLookup::Hit(instance) => {
                trace!(signature = %signature.display(&self.universe), "signature cache hit");
                return Ok(instance);
            }
            CacheLookup::InProgress => {
                return Err(InferenceError::RecursiveSignature {
                    signature: signature.display(&self.universe).to_string(),
                });
            }
            CacheLookup::Miss => {}
        }

        if self.depth >= self.options.max_call_depth {
            return Err(InferenceError::CallDepthExceeded {
                signature: signature.display(&self.universe).to_string(),
                limit: self.options.max_call_depth,
            });
        }

        self.registry
            .def_mut(def)
            .cache
            .begin(&self.universe, argument_types);

        let span = debug_span!(
            "analyze",
            signature = %signature.display(&self.universe),
            depth = self.depth
        );
        let _guard = span.enter();

        self.depth += 1;
        let outcome = BodyAnalyzer::new(self, def, argument_types).analyze();
        self.depth -= 1;

        match outcome {
            Ok(result) => {
                let instance = Rc::new(Instance {
                    signature,
                    return_value: result.return_value,
                    mutations: result.mutations,
                    calls: result.calls,
                });
                debug!(
                    return_value = %instance.return_value.display(&self.universe),
                    mutations = instance.mutations.len(),
                    calls = instance.calls.len(),
                    "analyzed signature"
                );
                self.registry.def_mut(def).cache.complete(
                    &self.universe,
                    argument_types,
                    Rc::clone(&instance),
                );
                Ok(instance)
            }
            Err(error) => {
                self.registry
                    .def_mut(def)
                    .cache
                    .abandon(&self.universe, argument_types);
                let signature = signature.display(&self.universe).to_string();
                debug!(%signature, %error, "analysis failed");
                Err(error.within_signature(signature))
            }
        }
    }

    /// The completed instance of `def` for `argument_types`, if one is cached
    pub fn cached_instance(&self, def: DefId, argument_types: &[TypeId]) -> Option<Rc<Instance>> {
        self.registry
            .def(def)
            .cache()
            .get(&self.universe, argument_types)
    }
}
