//! Learning partitions: where in the stream each stage starts or stops
//! learning.
//!
//! A run is laid out as `num_phases` equal phases. The last phase is the
//! evaluation phase where nothing learns. Before it, enabled upstream stages
//! learn together with the classifier for the first half of the training
//! phases, then they are finalized and only the classifier keeps learning.

use serde::Serialize;

use crate::descriptor::PhaseSchedule;
use crate::error::PlanError;
use crate::structure::{Stage, StructuralConfiguration};
use crate::training::learning::{LearningState, Transition};

/// Transitions applied before the point at `position` is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakpoint {
    pub position: usize,
    pub transitions: Vec<(Stage, Transition)>,
}

/// Ordered breakpoints for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    breakpoints: Vec<Breakpoint>,
}

impl Partition {
    /// Build a partition, checking it against `structure` and `num_points`.
    pub fn new(
        breakpoints: Vec<Breakpoint>,
        structure: &StructuralConfiguration,
        num_points: usize,
    ) -> Result<Self, PlanError> {
        let partition = Self { breakpoints };
        partition.validate(structure, num_points)?;
        Ok(partition)
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn at(&self, position: usize) -> Option<&Breakpoint> {
        self.breakpoints
            .binary_search_by_key(&position, |b| b.position)
            .ok()
            .map(|i| &self.breakpoints[i])
    }

    /// Positions strictly increasing and in bounds, stages enabled, and the
    /// transitions legal when replayed from an idle start.
    pub fn validate(
        &self,
        structure: &StructuralConfiguration,
        num_points: usize,
    ) -> Result<(), PlanError> {
        let mut state = LearningState::new(
            structure
                .enabled_stages()
                .into_iter()
                .filter(|s| s.can_learn()),
        );
        let mut previous: Option<usize> = None;

        for breakpoint in &self.breakpoints {
            let position = breakpoint.position;
            if position >= num_points {
                return Err(PlanError::OutOfBounds {
                    position,
                    num_points,
                });
            }
            if let Some(previous) = previous {
                if position <= previous {
                    return Err(PlanError::NotIncreasing { position, previous });
                }
            }
            previous = Some(position);

            for (stage, transition) in &breakpoint.transitions {
                if !structure.is_enabled(*stage) || !stage.can_learn() {
                    return Err(PlanError::DisabledStage {
                        stage: *stage,
                        position,
                    });
                }
                state
                    .apply(*stage, *transition)
                    .map_err(|rejected| PlanError::IllegalTransition {
                        stage: rejected.stage,
                        transition: rejected.transition,
                        mode: rejected.mode,
                        position,
                    })?;
            }
        }
        Ok(())
    }
}

/// Computes the learning partition of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionPlanner;

impl PartitionPlanner {
    /// Smallest stream that can hold `schedule`.
    pub fn minimum_points(schedule: &PhaseSchedule) -> usize {
        schedule.num_phases * schedule.num_categories.max(1)
    }

    pub fn plan(
        &self,
        structure: &StructuralConfiguration,
        schedule: &PhaseSchedule,
        num_points: usize,
    ) -> Result<Partition, PlanError> {
        if schedule.num_phases < 2 {
            return Err(PlanError::InvalidPhaseCount {
                num_phases: schedule.num_phases,
            });
        }
        let minimum = Self::minimum_points(schedule);
        if num_points < minimum {
            return Err(PlanError::TooFewPoints {
                num_points,
                num_phases: schedule.num_phases,
                num_categories: schedule.num_categories,
                minimum,
            });
        }

        let phase_len = num_points / schedule.num_phases;
        let train_phases = schedule.num_phases - 1;
        let eval_start = train_phases * phase_len;

        let upstream = structure.enabled_upstream();
        let mut breakpoints = Vec::with_capacity(3);

        let mut start: Vec<_> = upstream
            .iter()
            .map(|s| (*s, Transition::Enable))
            .collect();
        start.push((Stage::Classifier, Transition::Enable));
        breakpoints.push(Breakpoint {
            position: 0,
            transitions: start,
        });

        if !upstream.is_empty() {
            let upstream_end = if train_phases >= 2 {
                train_phases.div_ceil(2) * phase_len
            } else {
                phase_len / 2
            };
            if upstream_end == 0 || upstream_end >= eval_start {
                return Err(PlanError::DegeneratePhase {
                    position: upstream_end,
                    eval_start,
                });
            }
            breakpoints.push(Breakpoint {
                position: upstream_end,
                transitions: upstream
                    .iter()
                    .map(|s| (*s, Transition::Finalize))
                    .collect(),
            });
        }

        breakpoints.push(Breakpoint {
            position: eval_start,
            transitions: vec![(Stage::Classifier, Transition::Finalize)],
        });

        let partition = Partition::new(breakpoints, structure, num_points)?;
        tracing::debug!(
            num_points,
            phase_len,
            eval_start,
            breakpoints = partition.breakpoints.len(),
            "Planned learning partition"
        );
        Ok(partition)
    }
}
