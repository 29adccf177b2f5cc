//! CSV-backed record streams.
//!
//! The file is read once on open; rows are parsed as they are consumed so a
//! malformed row fails at its own position rather than up front.

use std::path::Path;

use seqsweep_core::error::PipelineError;
use seqsweep_core::pipeline::{DataSource, Record, RecordStream};

/// Replayable stream over the rows of an `x,y,label` CSV file.
#[derive(Debug, Clone)]
pub struct FileRecordStream {
    rows: Vec<String>,
    value_column: usize,
    label_column: usize,
    cursor: usize,
}

impl FileRecordStream {
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Build a stream from CSV text. The header must name `y` and `label`.
    pub fn parse(content: &str) -> Result<Self, PipelineError> {
        let mut lines = content.lines();
        let header: Vec<String> = lines
            .next()
            .ok_or_else(|| PipelineError::Stream {
                line: 1,
                message: "empty file".into(),
            })?
            .split(',')
            .map(|s| s.trim().trim_matches('"').to_string())
            .collect();

        let column = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PipelineError::Stream {
                    line: 1,
                    message: format!("missing '{name}' column"),
                })
        };
        let value_column = column("y")?;
        let label_column = column("label")?;

        Ok(Self {
            rows: lines.map(String::from).collect(),
            value_column,
            label_column,
            cursor: 0,
        })
    }

    /// Number of rows, including any that would fail to parse.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn parse_row(&self, index: usize) -> Result<Record, PipelineError> {
        // header is line 1
        let line = index + 2;
        let fields: Vec<&str> = self.rows[index].split(',').map(str::trim).collect();
        let field = |column: usize, name: &str| {
            fields.get(column).copied().ok_or_else(|| PipelineError::Stream {
                line,
                message: format!("missing {name} field"),
            })
        };

        let raw_value = field(self.value_column, "value")?;
        let value: f64 = raw_value.parse().map_err(|_| PipelineError::Stream {
            line,
            message: format!("invalid value '{raw_value}'"),
        })?;
        if !value.is_finite() {
            return Err(PipelineError::Stream {
                line,
                message: format!("non-finite value '{raw_value}'"),
            });
        }

        let raw_label = field(self.label_column, "label")?;
        let category: u32 = raw_label.parse().map_err(|_| PipelineError::Stream {
            line,
            message: format!("invalid label '{raw_label}'"),
        })?;

        Ok(Record { value, category })
    }
}

impl RecordStream for FileRecordStream {
    fn next_record(&mut self) -> Result<Option<Record>, PipelineError> {
        // Trailing blank lines end the stream.
        while self.cursor < self.rows.len() && self.rows[self.cursor].trim().is_empty() {
            self.cursor += 1;
        }
        if self.cursor >= self.rows.len() {
            return Ok(None);
        }
        let record = self.parse_row(self.cursor)?;
        self.cursor += 1;
        Ok(Some(record))
    }

    fn rewind(&mut self) -> Result<(), PipelineError> {
        self.cursor = 0;
        Ok(())
    }
}

/// Opens [`FileRecordStream`]s by path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDataSource;

impl DataSource for FileDataSource {
    fn open(&self, identifier: &Path) -> Result<Box<dyn RecordStream>, PipelineError> {
        let stream = FileRecordStream::open(identifier)?;
        tracing::debug!(path = %identifier.display(), rows = stream.len(), "Opened record stream");
        Ok(Box::new(stream))
    }
}
