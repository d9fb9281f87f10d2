// Crux AST Library
// Program model shared between AST producers and the inference engine

pub mod ast;
pub mod builder;

pub use ast::*;

// Version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
