//! Reduce a finished run into one flat result row.

use serde::Serialize;

use crate::descriptor::{RunDescriptor, format_lengths};
use crate::error::SweepError;
use crate::structure::Stage;
use crate::training::trace::{ANOMALY_SCORE, CLASSIFICATION_ACCURACY, Trace};

/// Descriptor-derived columns, in report order.
pub const DESCRIPTOR_COLUMNS: [&str; 14] = [
    "exp_id",
    "signal_type",
    "noise_amplitude",
    "signal_mean",
    "signal_amplitude",
    "num_categories",
    "num_reps",
    "num_phases",
    "noise_lengths",
    "num_points",
    "sp_enabled",
    "tm_enabled",
    "tp_enabled",
    "classifier_type",
];

/// Trace-derived columns, in report order.
pub const METRIC_COLUMNS: [&str; 3] = [
    "classification_accuracy",
    "overall_accuracy",
    "mean_anomaly_score",
];

/// One reportable summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub exp_id: usize,
    pub signal_type: String,
    pub noise_amplitude: f64,
    pub signal_mean: f64,
    pub signal_amplitude: f64,
    pub num_categories: usize,
    pub num_reps: usize,
    pub num_phases: usize,
    pub noise_lengths: Vec<usize>,
    pub num_points: usize,
    pub sp_enabled: bool,
    pub tm_enabled: bool,
    pub tp_enabled: bool,
    pub classifier_type: String,
    /// Final value of the designated accuracy series.
    pub classification_accuracy: f64,
    pub overall_accuracy: Option<f64>,
    pub mean_anomaly_score: Option<f64>,
}

impl ResultRow {
    /// Header: descriptor columns then metric columns.
    pub fn columns() -> Vec<&'static str> {
        DESCRIPTOR_COLUMNS
            .iter()
            .chain(METRIC_COLUMNS.iter())
            .copied()
            .collect()
    }

    /// Cell values aligned with [`ResultRow::columns`]. Metrics are rounded to
    /// `precision` decimals when given; absent metrics render empty.
    pub fn cells(&self, precision: Option<usize>) -> Vec<String> {
        let metric = |value: Option<f64>| match (value, precision) {
            (None, _) => String::new(),
            (Some(v), Some(p)) => format!("{v:.p$}"),
            (Some(v), None) => v.to_string(),
        };
        vec![
            self.exp_id.to_string(),
            self.signal_type.clone(),
            self.noise_amplitude.to_string(),
            self.signal_mean.to_string(),
            self.signal_amplitude.to_string(),
            self.num_categories.to_string(),
            self.num_reps.to_string(),
            self.num_phases.to_string(),
            format_lengths(&self.noise_lengths),
            self.num_points.to_string(),
            self.sp_enabled.to_string(),
            self.tm_enabled.to_string(),
            self.tp_enabled.to_string(),
            self.classifier_type.clone(),
            metric(Some(self.classification_accuracy)),
            metric(self.overall_accuracy),
            metric(self.mean_anomaly_score),
        ]
    }
}

/// Builds result rows from descriptors and traces.
#[derive(Debug, Clone)]
pub struct ResultsAggregator {
    /// Series whose final value becomes the headline accuracy.
    pub metric_series: String,
}

impl Default for ResultsAggregator {
    fn default() -> Self {
        Self {
            metric_series: crate::training::trace::TEST_CLASSIFICATION_ACCURACY.to_string(),
        }
    }
}

impl ResultsAggregator {
    pub fn new(metric_series: impl Into<String>) -> Self {
        Self {
            metric_series: metric_series.into(),
        }
    }

    pub fn summarize(
        &self,
        descriptor: &RunDescriptor,
        trace: &Trace,
        num_points: usize,
    ) -> Result<ResultRow, SweepError> {
        let headline = trace
            .last(&self.metric_series)
            .ok_or_else(|| SweepError::MissingMetric {
                series: self.metric_series.clone(),
                exp_id: descriptor.exp_id,
            })?;

        let mean_anomaly_score = trace
            .get(ANOMALY_SCORE)
            .filter(|values| !values.is_empty())
            .map(|values| values.iter().sum::<f64>() / values.len() as f64);

        let structure = &descriptor.structure;
        Ok(ResultRow {
            exp_id: descriptor.exp_id,
            signal_type: descriptor.signal_type.clone(),
            noise_amplitude: descriptor.noise_amplitude,
            signal_mean: descriptor.signal_mean,
            signal_amplitude: descriptor.signal_amplitude,
            num_categories: descriptor.num_categories,
            num_reps: descriptor.num_reps,
            num_phases: descriptor.num_phases,
            noise_lengths: descriptor.noise_lengths.clone(),
            num_points,
            sp_enabled: structure.is_enabled(Stage::SpatialPooler),
            tm_enabled: structure.is_enabled(Stage::TemporalMemory),
            tp_enabled: structure.is_enabled(Stage::TemporalPooler),
            classifier_type: structure.classifier_label().to_string(),
            classification_accuracy: headline,
            overall_accuracy: trace.last(CLASSIFICATION_ACCURACY),
            mean_anomaly_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::StructuralConfiguration;
    use crate::structure::tests::config_value;
    use crate::training::trace::{TEST_CLASSIFICATION_ACCURACY, TraceBuilder};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn descriptor() -> RunDescriptor {
        RunDescriptor {
            exp_id: 4,
            signal_type: "sine".into(),
            noise_amplitude: 0.1,
            signal_mean: 0.0,
            signal_amplitude: 2.0,
            num_categories: 3,
            num_reps: 2,
            num_phases: 3,
            noise_lengths: vec![0, 2],
            structure: Arc::new(
                StructuralConfiguration::from_value(
                    &config_value(true, true, false, "py.CLAClassifierRegion"),
                    "t",
                )
                .unwrap(),
            ),
        }
    }

    fn trace(names: &[&str], rows: &[&[f64]]) -> Trace {
        let mut builder = TraceBuilder::new(names.iter().map(|n| n.to_string()).collect(), rows.len());
        for row in rows {
            builder.push_step(row).unwrap();
        }
        builder.finish(rows.len()).unwrap()
    }

    #[test]
    fn test_summarize_takes_final_value() {
        let trace = trace(
            &[ANOMALY_SCORE, CLASSIFICATION_ACCURACY, TEST_CLASSIFICATION_ACCURACY],
            &[&[1.0, 0.5, 0.0], &[0.0, 0.6, 0.25], &[0.5, 0.7, 0.75]],
        );
        let row = ResultsAggregator::default()
            .summarize(&descriptor(), &trace, 3)
            .unwrap();
        assert_eq!(row.classification_accuracy, 0.75);
        assert_eq!(row.overall_accuracy, Some(0.7));
        assert_eq!(row.mean_anomaly_score, Some(0.5));
        assert!(row.sp_enabled && row.tm_enabled && !row.tp_enabled);
        assert_eq!(row.classifier_type, "py.CLAClassifierRegion");
        assert_eq!(row.num_points, 3);
    }

    #[test]
    fn test_missing_metric() {
        let trace = trace(&[CLASSIFICATION_ACCURACY], &[&[0.5]]);
        let err = ResultsAggregator::default()
            .summarize(&descriptor(), &trace, 1)
            .unwrap_err();
        assert!(matches!(err, SweepError::MissingMetric { exp_id: 4, .. }));
    }

    #[test]
    fn test_empty_series_is_missing() {
        let trace = trace(&[TEST_CLASSIFICATION_ACCURACY], &[]);
        assert!(ResultsAggregator::default()
            .summarize(&descriptor(), &trace, 0)
            .is_err());
    }

    #[test]
    fn test_summarize_does_not_mutate_inputs() {
        let descriptor = descriptor();
        let trace = trace(&[TEST_CLASSIFICATION_ACCURACY], &[&[0.1], &[0.9]]);
        let (d_before, t_before) = (descriptor.clone(), trace.clone());
        ResultsAggregator::default()
            .summarize(&descriptor, &trace, 2)
            .unwrap();
        assert_eq!(descriptor, d_before);
        assert_eq!(trace, t_before);
    }

    #[test]
    fn test_columns_and_cells_align() {
        let trace = trace(&[TEST_CLASSIFICATION_ACCURACY], &[&[2.0 / 3.0]]);
        let row = ResultsAggregator::default()
            .summarize(&descriptor(), &trace, 1)
            .unwrap();
        let columns = ResultRow::columns();
        let cells = row.cells(Some(3));
        assert_eq!(columns.len(), cells.len());
        assert_eq!(columns[0], "exp_id");
        assert_eq!(columns[14], "classification_accuracy");
        assert_eq!(cells[8], "0|2");
        assert_eq!(cells[14], "0.667");
        assert_eq!(cells[15], "");
    }
}
