//! Learning modes, traces and the training loop.

pub mod controller;
pub mod learning;
pub mod trace;

pub use controller::TrainingController;
pub use learning::{LearningMode, LearningState, Transition};
pub use trace::{Trace, TraceBuilder, TraceSeries};
