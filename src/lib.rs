pub(crate) mod common;
pub(crate) mod core;
pub(crate) mod db;
pub mod output;
pub mod repl;
pub mod session;
pub mod source;
pub mod sql;

pub use common::error::{LoadError, Result, ShelectError};
pub use crate::core::types::{DataType, Value};
pub use db::{
    database::{Database, QueryResponse},
    table::*,
};
pub use output::{OutputFormat, ResultWriter};
pub use repl::Repl;
pub use session::Session;
pub use source::{FileSource, MemorySource, SourceReader};
