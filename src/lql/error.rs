use super::glob::PatternError;
use thiserror::Error;

/// Errors that can occur when compiling a tags expression
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("wrong 'like' expression '{pattern}' for tag '{tag}': {source}")]
    InvalidPattern {
        tag: String,
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("unsupported operation {op} for tag '{tag}'")]
    UnsupportedOperator { op: String, tag: String },
}
