pub mod app;
pub mod config;
pub mod journal;
pub mod lql;
pub mod model;

pub use journal::{JournalCatalog, JournalDesc};
pub use lql::{CompileError, Expression, TagsPredicate, compile_tags_expr};
pub use model::TagMap;
