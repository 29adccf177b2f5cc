//! Result rows, artifact persistence and the results table.

pub mod aggregate;
pub mod report;

pub use aggregate::{ResultRow, ResultsAggregator};
pub use report::{Reporter, SweepReport, run_key};
