//! Rendering query responses as csv, json or an aligned text table.

use std::io::Write;

use strum::{Display, EnumString};

use crate::{
    Result,
    core::types::Value,
    db::{database::QueryResponse, table::Row},
};

/// Output encoding, chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, clap::ValueEnum)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Comma separated values with a header row
    Csv,
    /// A pretty-printed array of objects
    Json,
    /// A column-aligned text table
    Table,
}

/// Writes each response to a sink in the session's output format.
#[derive(Debug)]
pub struct ResultWriter<W: Write> {
    format: OutputFormat,
    sink: W,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(format: OutputFormat, sink: W) -> Self {
        Self { format, sink }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Writes one response. A response without columns writes nothing.
    pub fn write(&mut self, response: &QueryResponse) -> Result<()> {
        if response.columns.is_empty() {
            return Ok(());
        }

        match self.format {
            OutputFormat::Csv => self.write_csv(response)?,
            OutputFormat::Json => self.write_json(response)?,
            OutputFormat::Table => self.write_table(response)?,
        }

        self.sink.flush()?;
        Ok(())
    }

    /// The header is emitted with the first row, so no rows means no output.
    pub fn write_csv(&mut self, response: &QueryResponse) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(&mut self.sink);

        for (idx, row) in response.rows.iter().enumerate() {
            if idx == 0 {
                writer.write_record(&response.columns)?;
            }
            writer.write_record(row.values.iter().map(Value::to_csv_field))?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn write_json(&mut self, response: &QueryResponse) -> Result<()> {
        let rows: Vec<serde_json::Value> = response
            .rows
            .iter()
            .map(|row| {
                serde_json::Value::Object(
                    response
                        .columns
                        .iter()
                        .cloned()
                        .zip(row.values.iter().map(Value::to_json))
                        .collect(),
                )
            })
            .collect();

        serde_json::to_writer_pretty(&mut self.sink, &rows)?;
        writeln!(self.sink)?;
        Ok(())
    }

    pub fn write_table(&mut self, response: &QueryResponse) -> Result<()> {
        let rendered: Vec<Vec<String>> = response.rows.iter().map(render_row).collect();

        let mut widths: Vec<usize> = response
            .columns
            .iter()
            .map(|col| col.chars().count())
            .collect();
        for row in &rendered {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let divider = widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-");

        writeln!(self.sink, "{}", format_row(&response.columns, &widths))?;
        writeln!(self.sink, "{divider}")?;
        for row in &rendered {
            writeln!(self.sink, "{}", format_row(row, &widths))?;
        }

        Ok(())
    }
}

fn render_row(row: &Row) -> Vec<String> {
    row.values.iter().map(ToString::to_string).collect()
}

fn format_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join(" | ")
}
