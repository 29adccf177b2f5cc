//! Collaborator contracts consumed by the sweep: data generation, record
//! streams and the classification pipeline itself.
//!
//! Implementations live outside this crate (see `seqsweep-pipeline`); tests use
//! scripted ones.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::descriptor::RunDescriptor;
use crate::error::PipelineError;
use crate::structure::{Stage, StructuralConfiguration};
use crate::training::learning::LearningMode;

/// One labelled input point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub value: f64,
    pub category: u32,
}

/// A finite, replayable stream of records.
pub trait RecordStream {
    /// Next record, or `None` once the stream is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>, PipelineError>;

    /// Restart from the first record.
    fn rewind(&mut self) -> Result<(), PipelineError>;
}

/// Opens record streams by identifier (for file-backed sources, a path).
pub trait DataSource {
    fn open(&self, identifier: &Path) -> Result<Box<dyn RecordStream>, PipelineError>;
}

/// Parameters for one synthetic data set.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRequest {
    pub signal_type: String,
    pub num_phases: usize,
    pub num_reps: usize,
    pub signal_mean: f64,
    pub signal_amplitude: f64,
    pub num_categories: usize,
    pub noise_amplitude: f64,
    pub noise_lengths: Vec<usize>,
}

impl From<&RunDescriptor> for SignalRequest {
    fn from(d: &RunDescriptor) -> Self {
        Self {
            signal_type: d.signal_type.clone(),
            num_phases: d.num_phases,
            num_reps: d.num_reps,
            signal_mean: d.signal_mean,
            signal_amplitude: d.signal_amplitude,
            num_categories: d.num_categories,
            noise_amplitude: d.noise_amplitude,
            noise_lengths: d.noise_lengths.clone(),
        }
    }
}

/// What a generator produced for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedData {
    pub input_file: PathBuf,
    pub num_points: usize,
    pub sequence_length: usize,
}

/// Produces the input data set for a run.
pub trait SignalGenerator {
    fn generate(&self, request: &SignalRequest, out_dir: &Path) -> Result<GeneratedData, PipelineError>;
}

/// Per-step outputs of a pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepOutput {
    pub sensor_value: f64,
    pub actual_category: u32,
    /// `None` when the classifier has nothing to go on yet.
    pub inferred_category: Option<u32>,
    /// Sequence-memory anomaly score, when that stage is enabled.
    pub anomaly_score: Option<f64>,
    /// Active unit count per enabled upstream stage.
    pub activity: Vec<(Stage, usize)>,
}

impl StepOutput {
    pub fn activity_of(&self, stage: Stage) -> Option<usize> {
        self.activity
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, count)| *count)
    }
}

/// A runnable pipeline instance owned by exactly one run.
pub trait Pipeline {
    /// Consume the next record and return every stage's output.
    fn step(&mut self) -> Result<StepOutput, PipelineError>;

    /// Switch a stage's learning mode.
    fn set_learning(&mut self, stage: Stage, mode: LearningMode) -> Result<(), PipelineError>;
}

/// Builds a pipeline over a record stream.
pub trait PipelineBuilder {
    fn build(
        &self,
        stream: Box<dyn RecordStream>,
        structure: &StructuralConfiguration,
    ) -> Result<Box<dyn Pipeline>, PipelineError>;
}
