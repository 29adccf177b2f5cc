//! Error types for the seqsweep core library.
//!
//! Uses `thiserror` for structured error variants covering configuration,
//! partition planning, run execution, aggregation and artifact persistence.

use std::path::PathBuf;

use crate::descriptor::RunDescriptor;
use crate::structure::Stage;
use crate::training::learning::{LearningMode, Transition};

/// Top-level error type for the sweep harness.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("Run error: {0}")]
    Run(#[from] RunError),

    #[error("Missing metric '{series}' for experiment {exp_id}")]
    MissingMetric { series: String, exp_id: usize },

    #[error("Write error: {0}")]
    Write(#[from] WriteError),
}

impl SweepError {
    /// Whether this error must stop the whole sweep rather than a single run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Write(_))
    }
}

/// Errors raised while loading settings or structural configurations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("missing required key '{key}' in {section}")]
    MissingKey { section: String, key: String },

    #[error("invalid value for '{key}' in {section}: {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },

    #[error("{origin} contains no structural configurations")]
    Empty { origin: String },

    #[error("settings error: {0}")]
    Settings(#[from] Box<figment::Error>),
}

/// Errors raised when a learning partition cannot be built for a run.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("at least 2 phases are required, got {num_phases}")]
    InvalidPhaseCount { num_phases: usize },

    #[error(
        "{num_points} points cannot hold {num_phases} phases of {num_categories} categories (need at least {minimum})"
    )]
    TooFewPoints {
        num_points: usize,
        num_phases: usize,
        num_categories: usize,
        minimum: usize,
    },

    #[error("breakpoint {position} is outside [0, {num_points})")]
    OutOfBounds { position: usize, num_points: usize },

    #[error("breakpoint {position} does not follow breakpoint {previous}")]
    NotIncreasing { position: usize, previous: usize },

    #[error("breakpoint {position} references disabled stage {stage}")]
    DisabledStage { stage: Stage, position: usize },

    #[error("breakpoint {position} applies {transition} to {stage} while it is {mode}")]
    IllegalTransition {
        stage: Stage,
        transition: Transition,
        mode: LearningMode,
        position: usize,
    },

    #[error("phase boundary {position} collapses onto another phase (evaluation starts at {eval_start})")]
    DegeneratePhase { position: usize, eval_start: usize },
}

/// A run that failed after it was set up. Carries the full descriptor so the
/// operator can see which combination failed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("run setup failed for [{descriptor}]: {message}")]
    Setup {
        descriptor: Box<RunDescriptor>,
        message: String,
    },

    #[error("pipeline failed at position {position} for [{descriptor}]: {message}")]
    Pipeline {
        position: usize,
        descriptor: Box<RunDescriptor>,
        message: String,
    },
}

impl RunError {
    pub fn setup(descriptor: &RunDescriptor, message: impl Into<String>) -> Self {
        Self::Setup {
            descriptor: Box::new(descriptor.clone()),
            message: message.into(),
        }
    }

    pub fn pipeline(position: usize, descriptor: &RunDescriptor, message: impl Into<String>) -> Self {
        Self::Pipeline {
            position,
            descriptor: Box::new(descriptor.clone()),
            message: message.into(),
        }
    }

    /// Stream position at which the pipeline failed, if training had started.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Setup { .. } => None,
            Self::Pipeline { position, .. } => Some(*position),
        }
    }

    pub fn descriptor(&self) -> &RunDescriptor {
        match self {
            Self::Setup { descriptor, .. } | Self::Pipeline { descriptor, .. } => descriptor,
        }
    }
}

/// An artifact could not be persisted.
#[derive(Debug, thiserror::Error)]
#[error("failed to write {}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Errors reported by pipeline collaborators (data sources, generators,
/// pipeline builders and the pipelines themselves).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("malformed record at line {line}: {message}")]
    Stream { line: usize, message: String },

    #[error("stream ended after {consumed} records")]
    EndOfStream { consumed: usize },

    #[error("unsupported {stage} type '{region_type}'")]
    UnsupportedStage { stage: Stage, region_type: String },

    #[error("{stage} failed: {message}")]
    Stage { stage: Stage, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn stage(stage: Stage, message: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            message: message.into(),
        }
    }
}

pub type Result<T, E = SweepError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds() {
        let write = SweepError::from(WriteError::new(
            "results/x.csv",
            std::io::Error::other("disk full"),
        ));
        assert!(write.is_fatal());

        let plan = SweepError::from(PlanError::InvalidPhaseCount { num_phases: 1 });
        assert!(!plan.is_fatal());

        let metric = SweepError::MissingMetric {
            series: "test_classification_accuracy".into(),
            exp_id: 3,
        };
        assert!(!metric.is_fatal());
        assert!(metric.to_string().contains("experiment 3"));
    }

    #[test]
    fn test_write_error_names_path() {
        let err = WriteError::new("/nowhere/out.csv", std::io::Error::other("denied"));
        assert!(err.to_string().contains("/nowhere/out.csv"));
    }
}
