//! Interactive statement loop.

use std::io::Write;

use rustyline::{Config, DefaultEditor, error::ReadlineError};

use crate::{
    Result,
    session::Session,
    source::SourceReader,
    sql::{Accumulation, StatementAccumulator},
};

const INTRO: &str = "Type SQL statements ending in ';' or Ctrl+D to exit.";
const PROMPT: &str = ">>> ";
const CONTINUATION_PROMPT: &str = "... ";

/// What the loop should do after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Reads statements line by line and runs each one as soon as it is
/// terminated by `;`. A failing statement is reported and the session stays
/// alive with whatever tables it has already loaded.
pub struct Repl<R: SourceReader, W: Write> {
    session: Session<R, W>,
    accumulator: StatementAccumulator,
}

impl<R: SourceReader, W: Write> Repl<R, W> {
    pub fn new(session: Session<R, W>) -> Self {
        Self {
            session,
            accumulator: StatementAccumulator::new(),
        }
    }

    pub fn session(&self) -> &Session<R, W> {
        &self.session
    }

    pub fn prompt(&self) -> &'static str {
        if self.accumulator.is_collecting() {
            CONTINUATION_PROMPT
        } else {
            PROMPT
        }
    }

    /// Runs until end of input or an exit command.
    pub fn run(&mut self) -> Result<()> {
        let config = Config::builder()
            .auto_add_history(true)
            .history_ignore_space(true)
            .build();
        let mut editor = DefaultEditor::with_config(config)?;

        println!("{INTRO}");

        loop {
            match editor.readline(self.prompt()) {
                Ok(line) => {
                    if self.handle_line(&line) == Flow::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("KeyboardInterrupt");
                    self.accumulator.reset();
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    /// Feeds one line of input, running the buffered statement once it is
    /// complete. Errors are printed to stderr rather than returned.
    pub fn handle_line(&mut self, line: &str) -> Flow {
        if !self.accumulator.is_collecting() && is_exit_command(line) {
            return Flow::Exit;
        }

        if let Accumulation::Complete(sql) = self.accumulator.push_line(line) {
            if let Err(err) = self.session.run_sql(&sql) {
                eprintln!("{:?}", miette::Report::new(err));
            }
        }

        Flow::Continue
    }
}

fn is_exit_command(line: &str) -> bool {
    matches!(line.trim(), "exit" | "quit")
}
