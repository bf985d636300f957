//! Record rendering
//!
//! Sinks consume batches in the order the sequencer produced them and must
//! neither reorder nor drop records.

use crate::types::Record;
use crate::{LogTailError, Result};
use std::io::{self, Stdout, Write};

/// Output format of rendered lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `timestamp source LEVEL message`
    Text,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    /// Parse a known format name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "t" => Some(OutputFormat::Text),
            "json" | "j" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    /// Parse a format name; unknown names fall back to text
    pub fn from_name(s: &str) -> Self {
        Self::parse(s).unwrap_or(OutputFormat::Text)
    }
}

/// Consumer of ordered record batches
pub trait RecordSink: Send {
    /// Emit one ordered batch
    fn emit(&mut self, records: &[Record]) -> Result<()>;
}

/// Collects records in memory
impl RecordSink for Vec<Record> {
    fn emit(&mut self, records: &[Record]) -> Result<()> {
        self.extend_from_slice(records);
        Ok(())
    }
}

/// Writes one line per record
pub struct LineRenderer<W: Write + Send> {
    out: W,
    format: OutputFormat,
}

impl LineRenderer<Stdout> {
    /// Renderer writing to standard output
    pub fn stdout(format: &str) -> Self {
        Self::new(io::stdout(), OutputFormat::from_name(format))
    }
}

impl<W: Write + Send> LineRenderer<W> {
    /// Renderer writing to `out`
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&self, record: &Record) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(record.to_human_readable()),
            OutputFormat::Json => Ok(record.to_json()?),
        }
    }
}

impl<W: Write + Send> RecordSink for LineRenderer<W> {
    fn emit(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            let line = self.line(record)?;
            writeln!(self.out, "{}", line)
                .map_err(|e| LogTailError::Render(format!("failed to write record: {}", e)))?;
        }
        self.out
            .flush()
            .map_err(|e| LogTailError::Render(format!("failed to flush output: {}", e)))
    }
}
