//! # seqsweep-pipeline
//!
//! Reference collaborators for `seqsweep-core`: a synthetic sensor-data
//! generator, a CSV record stream, and a small classification network built
//! from a structural configuration.
//!
//! Stage selection follows each section's `regionType`:
//!
//! | Section | Accepted types |
//! |---------|----------------|
//! | sensor | `*RecordSensor*` |
//! | spatial pooler | `*SP*` |
//! | sequence memory | `*TM*`, `*TemporalMemory*` |
//! | temporal pooler | `*TemporalPooler*` |
//! | classifier | `*KNNClassifier*`, `*CLAClassifier*` |
//!
//! Anything else fails the build with `PipelineError::UnsupportedStage`.

pub mod classifier;
pub mod encoder;
pub mod generator;
pub mod network;
pub mod spatial;
pub mod stream;
pub mod temporal;
pub mod union;

pub use generator::SyntheticSensorData;
pub use network::{ClassificationNetwork, ReferencePipelineBuilder};
pub use stream::{FileDataSource, FileRecordStream};
