use std::io::{self, IsTerminal};

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use shelect::{FileSource, OutputFormat, Repl, Session};

/// Run SQL over CSV and JSON files. Table names in FROM and JOIN clauses are
/// file paths; `-` or `stdin` reads standard input.
#[derive(Debug, Parser)]
#[command(name = "shelect", version, about)]
struct Cli {
    /// SQL to run, one batch per argument. Starts a prompt when omitted and
    /// standard input is a terminal.
    query: Vec<String>,

    /// Output format [default: table on a terminal, csv otherwise]
    #[arg(short = 'o', long, value_enum, env = "SHELECT_FORMAT", ignore_case = true)]
    format: Option<OutputFormat>,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(false)
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();

    init_tracing();

    let cli = Cli::parse();
    let format = cli.format.unwrap_or_else(default_format);
    let mut session = Session::new(FileSource, format, io::stdout().lock())?;

    if cli.query.is_empty() {
        if io::stdin().is_terminal() {
            Repl::new(session).run()?;
        }
        return Ok(());
    }

    for query in &cli.query {
        session.run_sql(query)?;
    }

    Ok(())
}

fn default_format() -> OutputFormat {
    if io::stdout().is_terminal() {
        OutputFormat::Table
    } else {
        OutputFormat::Csv
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
