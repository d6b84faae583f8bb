//! Content-based format and dialect detection.
//!
//! Table names need not look like filenames, so the format is decided from
//! the content alone.

use csv::{ReaderBuilder, Terminator};

use crate::LoadError;

/// The two content families a table source can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Delimited,
}

/// JSON when the first non-whitespace character opens an object or array.
pub fn sniff_format(content: &str) -> SourceFormat {
    match content.trim_start().chars().next() {
        Some('{' | '[') => SourceFormat::Json,
        _ => SourceFormat::Delimited,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    Lf,
    CrLf,
}

/// Field delimiter and line terminator of a delimited source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub terminator: LineTerminator,
}

impl Dialect {
    /// Infers the dialect from the first line only.
    ///
    /// The delimiter is restricted to a comma or a tab, with the comma
    /// preferred when both appear.
    pub fn sniff(content: &str) -> Result<Self, LoadError> {
        let first_line = content
            .split_once('\n')
            .map_or(content, |(line, _)| line);

        let terminator = if first_line.ends_with('\r') {
            LineTerminator::CrLf
        } else {
            LineTerminator::Lf
        };

        let delimiter = sniff_delimiter(first_line.trim()).ok_or_else(|| {
            LoadError::schema("could not determine delimiter: header row has no ',' or tab")
        })?;

        Ok(Self {
            delimiter,
            terminator,
        })
    }

    /// A csv reader configured for this dialect.
    ///
    /// Rows are read flexibly so the loader can report arity problems itself.
    pub fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .terminator(match self.terminator {
                LineTerminator::CrLf => Terminator::CRLF,
                LineTerminator::Lf => Terminator::Any(b'\n'),
            });
        builder
    }
}

/// Counts candidate delimiters outside double-quoted segments.
fn sniff_delimiter(line: &str) -> Option<u8> {
    let mut in_quotes = false;
    let (mut commas, mut tabs) = (0usize, 0usize);

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => commas += 1,
            '\t' if !in_quotes => tabs += 1,
            _ => {}
        }
    }

    if commas > 0 {
        Some(b',')
    } else if tabs > 0 {
        Some(b'\t')
    } else {
        None
    }
}
