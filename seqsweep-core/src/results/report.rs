//! Persist traces and summaries, and render the results table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use unicode_width::UnicodeWidthStr;

use crate::descriptor::RunDescriptor;
use crate::error::WriteError;
use crate::results::aggregate::ResultRow;
use crate::structure::Stage;
use crate::training::trace::Trace;

pub const RESULTS_FILE: &str = "seq_classification_results.csv";
pub const RESULTS_JSON_FILE: &str = "seq_classification_results.json";

/// Artifacts of a completed sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub sweep_id: String,
    pub summary_path: PathBuf,
    pub json_path: PathBuf,
    pub trace_paths: Vec<PathBuf>,
    pub rows: Vec<ResultRow>,
    pub table: String,
}

#[derive(Serialize)]
struct SweepSummary<'a> {
    sweep_id: &'a str,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    columns: Vec<&'static str>,
    rows: &'a [ResultRow],
    traces: &'a [PathBuf],
}

/// Accumulates result rows in completion order and writes all artifacts.
pub struct Reporter {
    results_dir: PathBuf,
    sweep_id: String,
    started_at: DateTime<Utc>,
    rows: Vec<ResultRow>,
    trace_paths: Vec<PathBuf>,
}

impl Reporter {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            sweep_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            rows: Vec::new(),
            trace_paths: Vec::new(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Create the results directory.
    pub fn prepare(&self) -> Result<(), WriteError> {
        std::fs::create_dir_all(&self.results_dir)
            .map_err(|e| WriteError::new(&self.results_dir, e))
    }

    /// Trace file of a run.
    pub fn trace_path(&self, descriptor: &RunDescriptor) -> PathBuf {
        self.results_dir
            .join(format!("traces_{}.csv", run_key(descriptor)))
    }

    /// Persist a completed run: its full trace first, then its row.
    pub fn record(
        &mut self,
        descriptor: &RunDescriptor,
        row: ResultRow,
        trace: &Trace,
    ) -> Result<PathBuf, WriteError> {
        self.prepare()?;
        let path = self.trace_path(descriptor);
        write_atomic(&path, &trace_to_csv(trace))?;
        tracing::info!(exp_id = row.exp_id, path = %path.display(), "Trace saved");
        self.rows.push(row);
        self.trace_paths.push(path.clone());
        Ok(path)
    }

    /// Remove any trace left under this run's key by an earlier sweep, so a
    /// failed run never appears to have produced one.
    pub fn discard(&self, descriptor: &RunDescriptor) -> Result<(), WriteError> {
        let path = self.trace_path(descriptor);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::warn!(exp_id = descriptor.exp_id, path = %path.display(), "Removed stale trace");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WriteError::new(&path, e)),
        }
    }

    /// Write the summary CSV and JSON, render the table and hand back the
    /// artifact paths.
    pub fn finish(self) -> Result<SweepReport, WriteError> {
        self.prepare()?;

        let summary_path = self.results_dir.join(RESULTS_FILE);
        write_atomic(&summary_path, &rows_to_csv(&self.rows))?;

        let json_path = self.results_dir.join(RESULTS_JSON_FILE);
        let summary = SweepSummary {
            sweep_id: &self.sweep_id,
            started_at: self.started_at,
            completed_at: Utc::now(),
            columns: ResultRow::columns(),
            rows: &self.rows,
            traces: &self.trace_paths,
        };
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| WriteError::new(&json_path, std::io::Error::other(e)))?;
        write_atomic(&json_path, &json)?;

        let table = render_table(&self.rows);
        tracing::info!(
            sweep_id = %self.sweep_id,
            rows = self.rows.len(),
            path = %summary_path.display(),
            "Results saved"
        );

        Ok(SweepReport {
            sweep_id: self.sweep_id,
            summary_path,
            json_path,
            trace_paths: self.trace_paths,
            rows: self.rows,
            table,
        })
    }
}

/// Stable, collision-free key of a run: its structural signature plus a
/// digest over every axis value.
pub fn run_key(descriptor: &RunDescriptor) -> String {
    let structure = &descriptor.structure;
    let mut hasher = Sha256::new();
    for (name, value) in descriptor.axis_values() {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    let digest = format!("{:x}", hasher.finalize());

    format!(
        "{}_sp-{}_tm-{}_tp-{}_{}_{}",
        sanitize(&descriptor.signal_type),
        structure.is_enabled(Stage::SpatialPooler),
        structure.is_enabled(Stage::TemporalMemory),
        structure.is_enabled(Stage::TemporalPooler),
        sanitize(structure.classifier_label()),
        &digest[..8],
    )
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Write through a temporary file so a failed write never leaves a file that
/// looks complete.
fn write_atomic(path: &Path, content: &str) -> Result<(), WriteError> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content).map_err(|e| WriteError::new(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        WriteError::new(path, e)
    })
}

/// Minimal CSV field escaping: wrap the value in double-quotes if it contains
/// a comma, newline, or double-quote, doubling any embedded double-quotes.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn rows_to_csv(rows: &[ResultRow]) -> String {
    let mut buf = ResultRow::columns().join(",");
    buf.push('\n');
    for row in rows {
        let cells: Vec<_> = row.cells(None).iter().map(|c| csv_escape(c)).collect();
        buf.push_str(&cells.join(","));
        buf.push('\n');
    }
    buf
}

fn trace_to_csv(trace: &Trace) -> String {
    let mut buf = String::from("step");
    for name in trace.names() {
        buf.push(',');
        buf.push_str(&csv_escape(name));
    }
    buf.push('\n');
    for step in 0..trace.len() {
        buf.push_str(&step.to_string());
        for series in trace.series() {
            buf.push(',');
            let value = series.values[step];
            if !value.is_nan() {
                buf.push_str(&value.to_string());
            }
        }
        buf.push('\n');
    }
    buf
}

/// Render rows as a boxed, column-aligned table.
pub fn render_table(rows: &[ResultRow]) -> String {
    let header: Vec<String> = ResultRow::columns().iter().map(|c| c.to_string()).collect();
    let body: Vec<Vec<String>> = rows.iter().map(|r| r.cells(Some(4))).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.width()).collect();
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.width());
        }
    }

    let rule = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };
    let line = |cells: &[String]| {
        let mut out = String::from("|");
        for (cell, width) in cells.iter().zip(&widths) {
            out.push(' ');
            out.push_str(cell);
            out.push_str(&" ".repeat(width - cell.width()));
            out.push_str(" |");
        }
        out
    };

    let mut out = vec![rule.clone(), line(header.as_slice()), rule.clone()];
    for cells in &body {
        out.push(line(cells.as_slice()));
    }
    out.push(rule);
    out.join("\n")
}
