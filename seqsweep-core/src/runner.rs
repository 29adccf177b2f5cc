//! Sweep runner: drives every run of a configuration space end to end.

use std::path::PathBuf;

use crate::config::SweepSettings;
use crate::descriptor::RunDescriptor;
use crate::error::{RunError, SweepError};
use crate::partition::PartitionPlanner;
use crate::pipeline::{DataSource, PipelineBuilder, SignalGenerator, SignalRequest};
use crate::results::{Reporter, ResultsAggregator, SweepReport};
use crate::space::ConfigurationSpace;
use crate::training::TrainingController;

/// A run that did not produce a result row.
#[derive(Debug)]
pub struct FailedRun {
    pub descriptor: RunDescriptor,
    pub error: SweepError,
}

/// Everything a sweep produced.
#[derive(Debug)]
pub struct SweepOutcome {
    pub report: SweepReport,
    pub failures: Vec<FailedRun>,
}

impl SweepOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs descriptors one at a time in enumeration order.
pub struct SweepRunner {
    data_dir: PathBuf,
    abort_on_run_error: bool,
    generator: Box<dyn SignalGenerator>,
    source: Box<dyn DataSource>,
    builder: Box<dyn PipelineBuilder>,
    controller: TrainingController,
    aggregator: ResultsAggregator,
    reporter: Reporter,
}

impl SweepRunner {
    pub fn new(
        settings: &SweepSettings,
        generator: Box<dyn SignalGenerator>,
        source: Box<dyn DataSource>,
        builder: Box<dyn PipelineBuilder>,
    ) -> Self {
        Self {
            data_dir: settings.data_dir.clone(),
            abort_on_run_error: settings.abort_on_run_error,
            generator,
            source,
            builder,
            controller: TrainingController::new(settings.verbosity),
            aggregator: ResultsAggregator::new(settings.metric_series.clone()),
            reporter: Reporter::new(settings.results_dir.clone()),
        }
    }

    /// Process every descriptor of `space`, then write the summary.
    ///
    /// Configuration and write failures end the sweep with an error. Any other
    /// failure is logged and collected, and the sweep moves on to the next run
    /// unless `abort_on_run_error` is set.
    pub fn run(mut self, space: &ConfigurationSpace) -> Result<SweepOutcome, SweepError> {
        self.reporter.prepare()?;
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| crate::error::WriteError::new(&self.data_dir, e))?;

        let total = space.len();
        tracing::info!(runs = total, axes = ?space.axes(), "Sweep started");

        let mut failures = Vec::new();
        for descriptor in space.iter() {
            match self.run_one(&descriptor) {
                Ok(path) => {
                    tracing::info!(
                        exp_id = descriptor.exp_id,
                        total,
                        trace = %path.display(),
                        "Run completed"
                    );
                }
                Err(error) if error.is_fatal() => {
                    tracing::error!(run = %descriptor, error = %error, "Sweep aborted");
                    return Err(error);
                }
                Err(error) => {
                    tracing::error!(run = %descriptor, error = %error, "Run failed");
                    self.reporter.discard(&descriptor)?;
                    failures.push(FailedRun { descriptor, error });
                    if self.abort_on_run_error {
                        tracing::warn!("Stopping sweep after first failed run");
                        break;
                    }
                }
            }
        }

        let report = self.reporter.finish()?;
        tracing::info!(
            completed = report.rows.len(),
            failed = failures.len(),
            "Sweep finished"
        );
        Ok(SweepOutcome { report, failures })
    }

    fn run_one(&mut self, descriptor: &RunDescriptor) -> Result<PathBuf, SweepError> {
        tracing::info!(run = %descriptor, "Run started");

        let request = SignalRequest::from(descriptor);
        let data = self
            .generator
            .generate(&request, &self.data_dir)
            .map_err(|e| RunError::setup(descriptor, format!("data generation: {e}")))?;

        let partition =
            PartitionPlanner.plan(&descriptor.structure, &descriptor.schedule(), data.num_points)?;

        let stream = self
            .source
            .open(&data.input_file)
            .map_err(|e| RunError::setup(descriptor, format!("open {}: {e}", data.input_file.display())))?;
        let mut pipeline = self
            .builder
            .build(stream, &descriptor.structure)
            .map_err(|e| RunError::setup(descriptor, format!("pipeline build: {e}")))?;

        let trace = self
            .controller
            .run(descriptor, pipeline.as_mut(), &partition, data.num_points)?;
        let row = self.aggregator.summarize(descriptor, &trace, data.num_points)?;
        Ok(self.reporter.record(descriptor, row, &trace)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::pipeline::{GeneratedData, Pipeline, Record, RecordStream, StepOutput};
    use crate::structure::tests::config_value;
    use crate::structure::{Stage, StructuralConfiguration};
    use crate::training::LearningMode;
    use std::path::Path;
    use std::sync::Arc;

    struct FixedGenerator(usize);

    impl SignalGenerator for FixedGenerator {
        fn generate(&self, _: &SignalRequest, out_dir: &Path) -> Result<GeneratedData, PipelineError> {
            Ok(GeneratedData {
                input_file: out_dir.join("input.csv"),
                num_points: self.0,
                sequence_length: 5,
            })
        }
    }

    struct CountingSource;

    struct CountingStream(u32);

    impl RecordStream for CountingStream {
        fn next_record(&mut self) -> Result<Option<Record>, PipelineError> {
            self.0 += 1;
            Ok(Some(Record { value: f64::from(self.0), category: self.0 % 2 }))
        }

        fn rewind(&mut self) -> Result<(), PipelineError> {
            self.0 = 0;
            Ok(())
        }
    }

    impl DataSource for CountingSource {
        fn open(&self, _: &Path) -> Result<Box<dyn RecordStream>, PipelineError> {
            Ok(Box::new(CountingStream(0)))
        }
    }

    struct Oracle(Box<dyn RecordStream>);

    impl Pipeline for Oracle {
        fn step(&mut self) -> Result<StepOutput, PipelineError> {
            let record = self.0.next_record()?.ok_or(PipelineError::EndOfStream { consumed: 0 })?;
            Ok(StepOutput {
                sensor_value: record.value,
                actual_category: record.category,
                inferred_category: Some(record.category),
                ..StepOutput::default()
            })
        }

        fn set_learning(&mut self, _: Stage, _: LearningMode) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    struct OracleBuilder;

    impl PipelineBuilder for OracleBuilder {
        fn build(
            &self,
            stream: Box<dyn RecordStream>,
            _: &StructuralConfiguration,
        ) -> Result<Box<dyn Pipeline>, PipelineError> {
            Ok(Box::new(Oracle(stream)))
        }
    }

    fn space(num_phases: Vec<usize>) -> ConfigurationSpace {
        let structure = StructuralConfiguration::from_value(
            &config_value(false, false, false, "py.KNNClassifierRegion"),
            "t",
        )
        .unwrap();
        let settings = SweepSettings::default();
        let mut space = ConfigurationSpace::from_settings(&settings, vec![Arc::new(structure)]);
        space.signal_types = vec!["binary".into()];
        space.noise_amplitudes = vec![0.0];
        space.num_categories = vec![2];
        space.num_phases = num_phases;
        space
    }

    fn settings(dir: &Path) -> SweepSettings {
        SweepSettings {
            data_dir: dir.join("data"),
            results_dir: dir.join("results"),
            ..SweepSettings::default()
        }
    }

    #[test]
    fn test_runs_every_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SweepRunner::new(
            &settings(dir.path()),
            Box::new(FixedGenerator(40)),
            Box::new(CountingSource),
            Box::new(OracleBuilder),
        );
        let outcome = runner.run(&space(vec![2, 4])).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.report.rows.len(), 2);
        assert!(outcome.report.rows.iter().all(|r| r.classification_accuracy == 1.0));
        assert!(outcome.report.summary_path.exists());
    }

    #[test]
    fn test_plan_failure_is_collected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SweepRunner::new(
            &settings(dir.path()),
            Box::new(FixedGenerator(40)),
            Box::new(CountingSource),
            Box::new(OracleBuilder),
        );
        // one phase cannot hold both training and evaluation
        let outcome = runner.run(&space(vec![1, 2])).unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].descriptor.exp_id, 0);
        assert!(matches!(outcome.failures[0].error, SweepError::Plan(_)));
        assert_eq!(outcome.report.rows.len(), 1);
        assert_eq!(outcome.report.rows[0].exp_id, 1);
    }

    #[test]
    fn test_failed_run_leaves_no_trace_from_earlier_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let space = space(vec![1]);
        let failing = space.iter().next().unwrap();
        let stale = Reporter::new(settings.results_dir.clone()).trace_path(&failing);
        std::fs::create_dir_all(&settings.results_dir).unwrap();
        std::fs::write(&stale, "step,test_classification_accuracy\n0,1\n").unwrap();

        let runner = SweepRunner::new(
            &settings,
            Box::new(FixedGenerator(40)),
            Box::new(CountingSource),
            Box::new(OracleBuilder),
        );
        let outcome = runner.run(&space).unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert!(!stale.exists());
        assert!(outcome.report.trace_paths.is_empty());
    }

    #[test]
    fn test_abort_on_run_error_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SweepSettings {
            abort_on_run_error: true,
            ..settings(dir.path())
        };
        let runner = SweepRunner::new(
            &settings,
            Box::new(FixedGenerator(40)),
            Box::new(CountingSource),
            Box::new(OracleBuilder),
        );
        let outcome = runner.run(&space(vec![1, 2])).unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.report.rows.is_empty());
    }
}
