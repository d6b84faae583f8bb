//! Buffering interactive input until a statement is complete.

use sqlparser::{
    dialect::SQLiteDialect,
    tokenizer::{Token, Tokenizer},
};

/// Outcome of feeding one line to a [`StatementAccumulator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulation {
    /// More input is needed.
    Collecting,

    /// The buffered text ends with a terminating `;`. The buffer is reset.
    Complete(String),
}

/// Joins input lines until the last real token is a semicolon.
///
/// Comments and whitespace after the semicolon do not count. Text the
/// tokenizer rejects, such as an unterminated string, keeps collecting since
/// the next line may close it.
#[derive(Debug, Default)]
pub struct StatementAccumulator {
    lines: Vec<String>,
}

impl StatementAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether part of a statement is buffered.
    pub fn is_collecting(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn push_line(&mut self, line: &str) -> Accumulation {
        if self.lines.is_empty() && line.trim().is_empty() {
            return Accumulation::Collecting;
        }

        self.lines.push(line.to_owned());
        let joined = self.lines.join("\n");
        let statement = joined.trim();

        if ends_with_terminator(statement) {
            let statement = statement.to_owned();
            self.lines.clear();
            Accumulation::Complete(statement)
        } else {
            Accumulation::Collecting
        }
    }

    /// Discards anything buffered.
    pub fn reset(&mut self) {
        self.lines.clear();
    }
}

fn ends_with_terminator(sql: &str) -> bool {
    let Ok(tokens) = Tokenizer::new(&SQLiteDialect {}, sql).tokenize() else {
        return false;
    };

    tokens
        .iter()
        .rev()
        .find(|token| !matches!(token, Token::Whitespace(_) | Token::EOF))
        .is_some_and(|token| matches!(token, Token::SemiColon))
}
