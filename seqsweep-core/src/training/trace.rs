//! Per-step output traces.

use serde::{Deserialize, Serialize};

use crate::structure::{Stage, StructuralConfiguration};

pub const SENSOR_VALUE: &str = "sensor_value";
pub const ACTUAL_CATEGORY: &str = "actual_category";
pub const INFERRED_CATEGORY: &str = "inferred_category";
pub const ANOMALY_SCORE: &str = "anomaly_score";
pub const CLASSIFICATION_ACCURACY: &str = "classification_accuracy";
pub const TEST_CLASSIFICATION_ACCURACY: &str = "test_classification_accuracy";

/// One named series of per-step values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// A completed trace: every series has exactly `len()` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    series: Vec<TraceSeries>,
    len: usize,
}

impl Trace {
    /// Number of steps.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn series(&self) -> &[TraceSeries] {
        &self.series
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.values.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.name.as_str())
    }

    /// Final value of a series, if the series exists and is non-empty.
    pub fn last(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|values| values.last().copied())
    }
}

/// Series tracked for a given structure, in column order.
pub fn tracked_series(structure: &StructuralConfiguration) -> Vec<String> {
    let mut names = vec![
        SENSOR_VALUE.to_string(),
        ACTUAL_CATEGORY.to_string(),
        INFERRED_CATEGORY.to_string(),
    ];
    if structure.is_enabled(Stage::TemporalMemory) {
        names.push(ANOMALY_SCORE.to_string());
    }
    for stage in structure.enabled_upstream() {
        names.push(activity_series(stage));
    }
    names.push(CLASSIFICATION_ACCURACY.to_string());
    names.push(TEST_CLASSIFICATION_ACCURACY.to_string());
    names
}

/// Name of the active-unit-count series of a stage.
pub fn activity_series(stage: Stage) -> String {
    format!("{}_active", stage.short_name())
}

/// Accumulates a trace one step at a time.
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    series: Vec<TraceSeries>,
    steps: usize,
}

impl TraceBuilder {
    pub fn new(names: Vec<String>, capacity: usize) -> Self {
        Self {
            series: names
                .into_iter()
                .map(|name| TraceSeries {
                    name,
                    values: Vec::with_capacity(capacity),
                })
                .collect(),
            steps: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.series.len()
    }

    /// Append one step. `row` holds one value per series, in series order.
    pub fn push_step(&mut self, row: &[f64]) -> Result<(), String> {
        if row.len() != self.series.len() {
            return Err(format!(
                "step has {} values for {} series",
                row.len(),
                self.series.len()
            ));
        }
        for (series, value) in self.series.iter_mut().zip(row) {
            series.values.push(*value);
        }
        self.steps += 1;
        Ok(())
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Seal the trace. Fails unless every series holds exactly `expected` values.
    pub fn finish(self, expected: usize) -> Result<Trace, String> {
        if let Some(short) = self.series.iter().find(|s| s.values.len() != expected) {
            return Err(format!(
                "series '{}' has {} values, expected {}",
                short.name,
                short.values.len(),
                expected
            ));
        }
        Ok(Trace {
            series: self.series,
            len: expected,
        })
    }
}
