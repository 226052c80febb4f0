//! Typed row output for columnar text, either as a fixed-width table or CSV.

use chrono::{DateTime, Local};
use std::io::Write;

use crate::error::Result;

const COLUMN_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
}

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Int(u64),
    /// Duration or raw timestamp in milliseconds
    Millis(u64),
    /// Epoch milliseconds rendered as a local date
    Clock(u64),
    Str(String),
}

impl Field {
    pub fn render(&self) -> String {
        match self {
            Field::Int(v) | Field::Millis(v) => v.to_string(),
            Field::Clock(ms) => format_local_time(*ms),
            Field::Str(s) => s.clone(),
        }
    }
}

/// `<locale date>.<millis>` in local time
pub fn format_local_time(epoch_ms: u64) -> String {
    let date = DateTime::from_timestamp_millis(epoch_ms as i64)
        .map(|utc| utc.with_timezone(&Local).format("%c").to_string())
        .unwrap_or_else(|| "<invalid time>".to_string());
    format!("{}.{:03}", date, epoch_ms % 1000)
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<(&'static str, Field)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, field: Field) -> Self {
        self.cells.push((name, field));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = String> + '_ {
        self.cells.iter().map(|(_, field)| field.render())
    }
}

enum Sink<W: Write> {
    Table(W),
    Csv(csv::Writer<W>),
}

/// Writes rows in the chosen format, emitting the header before the first row
pub struct RowWriter<W: Write> {
    sink: Sink<W>,
    rows_written: u64,
}

impl<W: Write> RowWriter<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        let sink = match format {
            OutputFormat::Table => Sink::Table(out),
            OutputFormat::Csv => Sink::Csv(
                csv::WriterBuilder::new().has_headers(false).from_writer(out),
            ),
        };
        Self { sink, rows_written: 0 }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        if self.rows_written == 0 {
            self.write_line(row.names().map(str::to_string), true)?;
        }
        self.write_line(row.values(), false)?;
        self.rows_written += 1;
        Ok(())
    }

    fn write_line(&mut self, cells: impl Iterator<Item = String>, header: bool) -> Result<()> {
        match &mut self.sink {
            Sink::Table(out) => {
                for cell in cells {
                    if header {
                        write!(out, "| {:>width$.width$}", cell, width = COLUMN_WIDTH)?;
                    } else {
                        write!(out, "| {:>width$} ", cell, width = COLUMN_WIDTH)?;
                    }
                }
                writeln!(out)?;
                out.flush()?;
            }
            Sink::Csv(writer) => {
                writer.write_record(cells)?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}
