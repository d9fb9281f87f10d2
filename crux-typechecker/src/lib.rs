//! Crux Typechecker
//!
//! Per-call-site type inference with mutation tracking for the Crux object
//! language.
//!
//! ## Architecture
//!
//! Every definition is analyzed on demand under the concrete types of the
//! arguments it is called with. The analysis of one definition under one
//! signature produces an [`Instance`]:
//!
//! - **Return value**: a concrete type, or a path into one of the arguments
//!   when the definition hands back (part of) something it was given
//! - **Mutations**: writes the body performs on argument-reachable state,
//!   with slot 0 standing for the returned object
//! - **Calls**: every call site bound inside the body, each with the
//!   callee instance it resolved to
//!
//! Instances are memoized per definition in a [`SignatureCache`] keyed by
//! structural type equality, so a definition called twice with equal argument
//! types is analyzed once.
//!
//! ## Usage
//!
//! ```
//! use crux_ast::builder::*;
//! use crux_ast::Program;
//! use crux_typechecker::{infer_program, Path, Value};
//!
//! let program = Program::new()
//!     .with_class(class("Foo").with_accessor("value"))
//!     .with_main(vec![call(new("Foo", vec![]), "value=", vec![int(1)])]);
//!
//! let inferred = infer_program(&program).unwrap();
//! let call = inferred.main.last_call().unwrap();
//! assert_eq!(call.instance.return_value, Value::Path(Path::with_selectors(1, ["@value"])));
//! ```

pub mod cache;
pub mod core_library;
pub mod error;
pub mod inference;
pub mod options;
pub mod path;
pub mod registry;
pub mod types;

mod analysis;

pub use cache::{BoundCall, CacheStats, Instance, Signature, SignatureCache};
pub use error::InferenceError;
pub use inference::InferenceEngine;
pub use options::EngineOptions;
pub use path::{Mutation, Path, Value, RETURN_SLOT};
pub use registry::{ClassInfo, Def, DefId, DefRegistry, MAIN_DEF_NAME};
pub use types::{TypeId, TypeNode, TypeUniverse};

use crux_ast::Program;
use std::rc::Rc;

/// A program whose top-level body has been analyzed
pub struct InferredProgram {
    pub engine: InferenceEngine,
    pub main: Rc<Instance>,
}

/// Analyze the top-level body of `program` with default options
pub fn infer_program(program: &Program) -> Result<InferredProgram, InferenceError> {
    infer_program_with_options(program, EngineOptions::default())
}

pub fn infer_program_with_options(
    program: &Program,
    options: EngineOptions,
) -> Result<InferredProgram, InferenceError> {
    let mut engine = InferenceEngine::with_options(program, options);
    let main = engine.analyze_main()?;
    Ok(InferredProgram { engine, main })
}

#[cfg(test)]
mod tests;
