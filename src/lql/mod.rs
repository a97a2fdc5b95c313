//! Tag conditions of the logrange query language.
//!
//! A condition tree (`Expression`) selects journals by their tags:
//!
//!   region = "us-east" AND (env = "prod" OR env LIKE "stag*")
//!
//! Supported operators: `<`, `>`, `<=`, `>=`, `!=`, `=` (lexicographic),
//! `LIKE` (glob), `CONTAINS`, `HAS_PREFIX`, `HAS_SUFFIX`. Operator keywords
//! are case-insensitive.
//!
//! Trees are compiled once into a `TagsPredicate` and then evaluated against
//! any number of tag maps.

mod ast;
mod error;
mod glob;
mod tags_eval;

pub use ast::*;
pub use error::CompileError;
pub use glob::{GlobPattern, PatternError};
pub use tags_eval::{CompareOp, TagsPredicate, compile_tags_expr};
