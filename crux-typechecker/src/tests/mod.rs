//! Unit tests for the Crux inference engine building blocks
//!
//! End-to-end inference over whole programs lives in the crate's `tests/`
//! directory; these cover the type universe, the signature cache, the
//! definition registry and error reporting in isolation.

mod test_error_reporting;
mod test_signature_cache;
mod test_type_universe;
