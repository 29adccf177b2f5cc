//! Drives one pipeline through its stream under a learning partition.

use crate::descriptor::RunDescriptor;
use crate::error::{PipelineError, RunError, SweepError};
use crate::partition::Partition;
use crate::pipeline::{Pipeline, StepOutput};
use crate::structure::Stage;
use crate::training::learning::{LearningMode, LearningState};
use crate::training::trace::{Trace, TraceBuilder, tracked_series};

/// Running classification accuracy, overall and for the evaluation phase.
#[derive(Debug, Clone, Copy, Default)]
struct AccuracyTally {
    seen: usize,
    correct: usize,
    test_seen: usize,
    test_correct: usize,
}

impl AccuracyTally {
    fn observe(&mut self, actual: u32, inferred: Option<u32>, testing: bool) {
        let hit = inferred == Some(actual);
        self.seen += 1;
        self.correct += usize::from(hit);
        if testing {
            self.test_seen += 1;
            self.test_correct += usize::from(hit);
        }
    }

    fn overall(&self) -> f64 {
        ratio(self.correct, self.seen)
    }

    fn test(&self) -> f64 {
        ratio(self.test_correct, self.test_seen)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Runs the training loop for a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingController {
    /// 0 = quiet, 1 = progress events, 2 = per-step events.
    pub verbosity: u8,
}

impl TrainingController {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    /// Feed `num_points` records through `pipeline`, applying the partition's
    /// transitions before the point at each breakpoint.
    ///
    /// On a pipeline failure the partial trace is dropped and a [`RunError`]
    /// tagged with the position and descriptor is returned.
    pub fn run(
        &self,
        descriptor: &RunDescriptor,
        pipeline: &mut dyn Pipeline,
        partition: &Partition,
        num_points: usize,
    ) -> Result<Trace, SweepError> {
        let structure = &descriptor.structure;
        partition.validate(structure, num_points)?;

        let upstream = structure.enabled_upstream();
        let track_anomaly = structure.is_enabled(Stage::TemporalMemory);
        let mut state = LearningState::new(
            structure
                .enabled_stages()
                .into_iter()
                .filter(|s| s.can_learn()),
        );
        let mut builder = TraceBuilder::new(tracked_series(structure), num_points);
        let mut tally = AccuracyTally::default();
        let mut testing = false;
        let progress_every = (num_points / 10).max(1);

        tracing::info!(
            exp_id = descriptor.exp_id,
            num_points,
            breakpoints = partition.breakpoints().len(),
            "Training started"
        );

        for position in 0..num_points {
            if let Some(breakpoint) = partition.at(position) {
                for (stage, transition) in &breakpoint.transitions {
                    let mode = state.apply(*stage, *transition).map_err(|rejected| {
                        RunError::pipeline(
                            position,
                            descriptor,
                            format!(
                                "refused to {} {} while {}",
                                rejected.transition, rejected.stage, rejected.mode
                            ),
                        )
                    })?;
                    pipeline
                        .set_learning(*stage, mode)
                        .map_err(|e| RunError::pipeline(position, descriptor, e.to_string()))?;
                    tracing::debug!(position, stage = %stage, %transition, %mode, "Learning mode changed");
                }
                testing = matches!(
                    state.mode(Stage::Classifier),
                    Some(LearningMode::Frozen | LearningMode::Finalized)
                );
                if self.verbosity >= 1 {
                    tracing::info!(exp_id = descriptor.exp_id, position, testing, "Reached breakpoint");
                }
            }

            let output = pipeline
                .step()
                .map_err(|e| RunError::pipeline(position, descriptor, e.to_string()))?;

            let mut row = Vec::with_capacity(builder.width());
            row.push(output.sensor_value);
            row.push(f64::from(output.actual_category));
            row.push(output.inferred_category.map_or(f64::NAN, f64::from));
            if track_anomaly {
                let score = output.anomaly_score.ok_or_else(|| {
                    missing_output(position, descriptor, Stage::TemporalMemory, "anomaly score")
                })?;
                row.push(score);
            }
            for stage in &upstream {
                let active = output
                    .activity_of(*stage)
                    .ok_or_else(|| missing_output(position, descriptor, *stage, "activity"))?;
                row.push(active as f64);
            }
            tally.observe(output.actual_category, output.inferred_category, testing);
            row.push(tally.overall());
            row.push(tally.test());

            builder
                .push_step(&row)
                .map_err(|message| RunError::pipeline(position, descriptor, message))?;

            self.report_progress(descriptor, position, num_points, progress_every, &output, &tally);
        }

        let trace = builder
            .finish(num_points)
            .map_err(|message| RunError::pipeline(num_points, descriptor, message))?;
        tracing::info!(
            exp_id = descriptor.exp_id,
            accuracy = tally.overall(),
            test_accuracy = tally.test(),
            "Training finished"
        );
        Ok(trace)
    }

    fn report_progress(
        &self,
        descriptor: &RunDescriptor,
        position: usize,
        num_points: usize,
        every: usize,
        output: &StepOutput,
        tally: &AccuracyTally,
    ) {
        if self.verbosity >= 2 {
            tracing::debug!(
                exp_id = descriptor.exp_id,
                position,
                value = output.sensor_value,
                actual = output.actual_category,
                inferred = ?output.inferred_category,
                "Step"
            );
        }
        if self.verbosity >= 1 && (position + 1) % every == 0 {
            tracing::info!(
                exp_id = descriptor.exp_id,
                "{}/{} points, accuracy {:.3}",
                position + 1,
                num_points,
                tally.overall()
            );
        }
    }
}

fn missing_output(position: usize, descriptor: &RunDescriptor, stage: Stage, what: &str) -> RunError {
    RunError::pipeline(
        position,
        descriptor,
        PipelineError::stage(stage, format!("no {what} reported")).to_string(),
    )
}
