//! # seqsweep-core
//!
//! Parameter sweeps over phased sequence-classification experiments.
//!
//! A sweep enumerates every combination of its axes ([`space`]), lays out when
//! each pipeline stage learns and freezes ([`partition`]), feeds the generated
//! data through a pipeline while recording per-step outputs ([`training`]), and
//! reduces each run to a result row written alongside its trace ([`results`]).
//!
//! The data generator, record source and pipeline are collaborators behind the
//! traits in [`pipeline`]; the reference implementations live in
//! `seqsweep-pipeline`.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod partition;
pub mod pipeline;
pub mod results;
pub mod runner;
pub mod space;
pub mod structure;
pub mod training;

// Re-exports
pub use config::{SweepAxes, SweepSettings, load_settings};
pub use descriptor::{PhaseSchedule, RunDescriptor};
pub use error::{
    ConfigError, PipelineError, PlanError, Result, RunError, SweepError, WriteError,
};
pub use partition::{Breakpoint, Partition, PartitionPlanner};
pub use results::{Reporter, ResultRow, ResultsAggregator, SweepReport};
pub use runner::{FailedRun, SweepOutcome, SweepRunner};
pub use space::ConfigurationSpace;
pub use structure::{Stage, StructuralConfiguration, load_configurations};
pub use training::{LearningMode, Trace, TrainingController, Transition};
