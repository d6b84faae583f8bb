//! Reading table content from files or standard input.

use std::{
    collections::HashMap,
    io::{self, Read},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::LoadError;

pub mod loader;
pub mod sniff;

/// Table names that denote the process's standard input.
pub const STDIN_NAMES: [&str; 2] = ["-", "stdin"];

/// Whether a table name refers to standard input rather than a path.
pub fn is_stdin(table: &str) -> bool {
    STDIN_NAMES.contains(&table)
}

/// Reads the raw content behind a table name.
///
/// Implementations must be shareable across threads: the session reads the
/// sources of one statement concurrently.
pub trait SourceReader: Send + Sync {
    fn read(&self, table: &str) -> Result<String, LoadError>;
}

/// Reads tables from the local filesystem and the process's standard input.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl SourceReader for FileSource {
    fn read(&self, table: &str) -> Result<String, LoadError> {
        if is_stdin(table) {
            let mut content = String::new();
            io::stdin().lock().read_to_string(&mut content)?;
            return Ok(content);
        }

        std::fs::read_to_string(table).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound {
                path: table.to_owned(),
            },
            _ => LoadError::Io(err),
        })
    }
}

/// In-memory files and standard input, for embedding and tests.
///
/// Standard input behaves like a stream: the first read drains it.
#[derive(Debug, Default)]
pub struct MemorySource {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<String, String>,
    stdin: String,
    reads: HashMap<String, usize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.insert_file(path, content);
        self
    }

    pub fn with_stdin(self, content: &str) -> Self {
        self.lock().stdin = content.to_owned();
        self
    }

    pub fn insert_file(&self, path: &str, content: &str) {
        self.lock().files.insert(path.to_owned(), content.to_owned());
    }

    /// How many times a table name has been read, successful or not.
    pub fn read_count(&self, table: &str) -> usize {
        self.lock().reads.get(table).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SourceReader for MemorySource {
    fn read(&self, table: &str) -> Result<String, LoadError> {
        let mut state = self.lock();
        *state.reads.entry(table.to_owned()).or_default() += 1;

        if is_stdin(table) {
            return Ok(std::mem::take(&mut state.stdin));
        }

        state
            .files
            .get(table)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: table.to_owned(),
            })
    }
}
