//! First-order sequence memory.
//!
//! Learns which columns tend to follow which, predicts the next step's columns
//! from the current ones and scores how much of each input was unexpected.
//! The output has two bits per column: the column bit, plus a second bit when
//! the column was correctly predicted, so downstream stages see sequence
//! context.

use std::collections::{BTreeSet, HashMap};

use seqsweep_core::error::PipelineError;
use seqsweep_core::structure::{RegionConfig, Stage};

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceParams {
    /// Times a transition must be seen before it counts as learned.
    pub min_threshold: u32,
    /// Fraction of the current columns that must vote for a prediction.
    pub activation_fraction: f64,
    /// Cap on a transition's count.
    pub max_count: u32,
}

impl Default for SequenceParams {
    fn default() -> Self {
        Self {
            min_threshold: 2,
            activation_fraction: 0.3,
            max_count: 255,
        }
    }
}

impl SequenceParams {
    pub fn from_region(region: &RegionConfig) -> Result<Self, PipelineError> {
        let defaults = Self::default();
        let params = Self {
            min_threshold: region
                .param_usize("minThreshold")
                .map(|v| v as u32)
                .unwrap_or(defaults.min_threshold),
            activation_fraction: region
                .param_f64("activationFraction")
                .unwrap_or(defaults.activation_fraction),
            max_count: region
                .param_usize("maxCount")
                .map(|v| v as u32)
                .unwrap_or(defaults.max_count),
        };
        if !(params.activation_fraction > 0.0 && params.activation_fraction <= 1.0) {
            return Err(PipelineError::stage(
                Stage::TemporalMemory,
                format!(
                    "activationFraction {} must be in (0, 1]",
                    params.activation_fraction
                ),
            ));
        }
        Ok(params)
    }
}

/// Output of one sequence-memory step.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceOutput {
    pub active: Vec<usize>,
    pub anomaly_score: f64,
}

#[derive(Debug, Clone)]
pub struct SequenceMemory {
    params: SequenceParams,
    column_count: usize,
    transitions: HashMap<usize, HashMap<usize, u32>>,
    previous: Vec<usize>,
    predicted: BTreeSet<usize>,
}

impl SequenceMemory {
    pub fn new(column_count: usize, params: SequenceParams) -> Self {
        Self {
            params,
            column_count,
            transitions: HashMap::new(),
            previous: Vec::new(),
            predicted: BTreeSet::new(),
        }
    }

    /// Output width in bits.
    pub fn width(&self) -> usize {
        self.column_count * 2
    }

    pub fn compute(&mut self, columns: &[usize], learn: bool) -> SequenceOutput {
        let hits = columns.iter().filter(|c| self.predicted.contains(c)).count();
        let anomaly_score = if columns.is_empty() {
            0.0
        } else {
            1.0 - hits as f64 / columns.len() as f64
        };

        let mut active: Vec<usize> = columns.to_vec();
        active.extend(
            columns
                .iter()
                .filter(|c| self.predicted.contains(c))
                .map(|c| self.column_count + c),
        );
        active.sort_unstable();

        if learn {
            for &from in &self.previous {
                let next = self.transitions.entry(from).or_default();
                for &to in columns {
                    let count = next.entry(to).or_insert(0);
                    *count = (*count + 1).min(self.params.max_count);
                }
            }
        }

        self.predicted = self.predict(columns);
        self.previous = columns.to_vec();
        SequenceOutput {
            active,
            anomaly_score,
        }
    }

    fn predict(&self, columns: &[usize]) -> BTreeSet<usize> {
        let mut votes: HashMap<usize, usize> = HashMap::new();
        for from in columns {
            if let Some(next) = self.transitions.get(from) {
                for (&to, &count) in next {
                    if count >= self.params.min_threshold {
                        *votes.entry(to).or_insert(0) += 1;
                    }
                }
            }
        }
        let needed = ((columns.len() as f64 * self.params.activation_fraction).ceil() as usize).max(1);
        votes
            .into_iter()
            .filter(|(_, n)| *n >= needed)
            .map(|(column, _)| column)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_novel_input_is_fully_anomalous() {
        let mut tm = SequenceMemory::new(16, SequenceParams::default());
        let out = tm.compute(&[1, 2, 3], true);
        assert_eq!(out.anomaly_score, 1.0);
        assert_eq!(out.active, vec![1, 2, 3]);
    }

    #[test]
    fn test_learned_sequence_is_predicted() {
        let mut tm = SequenceMemory::new(16, SequenceParams::default());
        let a = [1, 2, 3];
        let b = [7, 8, 9];
        for _ in 0..4 {
            tm.compute(&a, true);
            tm.compute(&b, true);
        }
        tm.compute(&a, false);
        let out = tm.compute(&b, false);
        assert_eq!(out.anomaly_score, 0.0);
        // Predicted columns light their context bits.
        assert_eq!(out.active, vec![7, 8, 9, 23, 24, 25]);
    }

    #[test]
    fn test_no_learning_keeps_memory_empty() {
        let mut tm = SequenceMemory::new(16, SequenceParams::default());
        for _ in 0..4 {
            tm.compute(&[1], false);
            tm.compute(&[2], false);
        }
        assert_eq!(tm.compute(&[1], false).anomaly_score, 1.0);
        assert_eq!(tm.width(), 32);
    }
}
