use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = ShelectError> = std::result::Result<T, E>;

/// Errors surfaced to the user while running a statement.
///
/// Each variant maps to one stage of the pipeline so the caller can tell a
/// bad statement apart from a bad file or a query the engine rejected.
#[derive(Debug, Error, Diagnostic)]
pub enum ShelectError {
    /// The parser rejected the statement text.
    #[error("SQL syntax error: {message}")]
    #[diagnostic(code(shelect::syntax))]
    Syntax {
        message: String,

        #[source_code]
        src: String,

        #[label("here")]
        span: Option<SourceSpan>,
    },

    /// A referenced table could not be read or materialized.
    #[error("error loading table data from {table}")]
    #[diagnostic(
        code(shelect::load),
        help("table names are read as file paths; use '-' or 'stdin' for standard input")
    )]
    Load {
        table: String,

        #[source]
        source: LoadError,
    },

    /// The engine rejected the statement after all tables were loaded.
    #[error("error running SQL")]
    #[diagnostic(code(shelect::execution))]
    Execution(#[from] rusqlite::Error),

    #[error("failed to write results")]
    #[diagnostic(code(shelect::output))]
    Output(#[from] std::io::Error),

    #[error("failed to encode results as JSON")]
    #[diagnostic(code(shelect::output))]
    Json(#[from] serde_json::Error),

    #[error("failed to encode results as CSV")]
    #[diagnostic(code(shelect::output))]
    Csv(#[from] csv::Error),

    #[error("line editor failed")]
    #[diagnostic(code(shelect::repl))]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Why a single table failed to load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no such file or directory: {path}")]
    NotFound { path: String },

    #[error("failed to read source")]
    Io(#[from] std::io::Error),

    /// Content was readable but does not describe a relation.
    #[error("{0}")]
    Schema(String),

    #[error("invalid JSON")]
    Json(#[from] serde_json::Error),

    #[error("invalid delimited text")]
    Csv(#[from] csv::Error),

    #[error("engine rejected the relation")]
    Engine(#[from] rusqlite::Error),
}

impl LoadError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }
}
