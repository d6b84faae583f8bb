//! Statement parsing through the SQLite dialect.

use miette::SourceSpan;
use sqlparser::{ast::Statement, dialect::SQLiteDialect, parser::Parser};

use crate::{Result, ShelectError};

/// Parses text into zero or more statements.
///
/// Comment-only input yields no statements at all.
pub fn parse_statements(sql: &str) -> Result<Vec<Statement>> {
    Parser::parse_sql(&SQLiteDialect {}, sql).map_err(|err| {
        let message = err.to_string();
        let message = message
            .strip_prefix("sql parser error: ")
            .or_else(|| message.strip_prefix("sql tokenizer error: "))
            .unwrap_or(&message)
            .to_owned();

        let span = error_offset(sql, &message).map(|offset| {
            let len = sql[offset..].chars().next().map_or(0, char::len_utf8);
            SourceSpan::from((offset, len))
        });

        ShelectError::Syntax {
            message,
            src: sql.to_owned(),
            span,
        }
    })
}

/// Byte offset of the `Line: N, Column: M` location the parser reports.
fn error_offset(sql: &str, message: &str) -> Option<usize> {
    let (_, location) = message.rsplit_once("Line: ")?;
    let (line, rest) = location.split_once(", Column: ")?;
    let line: usize = line.trim().parse().ok()?;
    let column: usize = rest
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;

    let line_start: usize = sql
        .split_inclusive('\n')
        .take(line.checked_sub(1)?)
        .map(str::len)
        .sum();
    let offset = line_start
        + sql[line_start..]
            .chars()
            .take(column.saturating_sub(1))
            .map(char::len_utf8)
            .sum::<usize>();

    Some(offset.min(sql.len()))
}
