//! The reference classification network and its builder.

use std::collections::BTreeMap;

use seqsweep_core::error::PipelineError;
use seqsweep_core::pipeline::{Pipeline, PipelineBuilder, RecordStream, StepOutput};
use seqsweep_core::structure::{Stage, StructuralConfiguration};
use seqsweep_core::training::LearningMode;

use crate::classifier::Classifier;
use crate::encoder::ScalarEncoder;
use crate::spatial::{SpatialParams, SpatialPooler};
use crate::temporal::{SequenceMemory, SequenceParams};
use crate::union::{UnionParams, UnionPooler};

/// Encoder, optional upstream stages and a classifier, fed one record per step.
pub struct ClassificationNetwork {
    stream: Box<dyn RecordStream>,
    encoder: ScalarEncoder,
    spatial: Option<SpatialPooler>,
    sequence: Option<SequenceMemory>,
    union: Option<UnionPooler>,
    classifier: Classifier,
    modes: BTreeMap<Stage, LearningMode>,
    consumed: usize,
}

impl ClassificationNetwork {
    fn learning(&self, stage: Stage) -> bool {
        self.modes.get(&stage).is_some_and(|m| m.is_learning())
    }

    pub fn mode(&self, stage: Stage) -> Option<LearningMode> {
        self.modes.get(&stage).copied()
    }

    /// Records consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl Pipeline for ClassificationNetwork {
    fn step(&mut self) -> Result<StepOutput, PipelineError> {
        let record = self
            .stream
            .next_record()?
            .ok_or(PipelineError::EndOfStream {
                consumed: self.consumed,
            })?;
        self.consumed += 1;

        let mut activity = Vec::new();
        let mut pattern = self.encoder.encode(record.value);

        let learn = self.learning(Stage::SpatialPooler);
        if let Some(sp) = self.spatial.as_mut() {
            pattern = sp.compute(&pattern, learn);
            activity.push((Stage::SpatialPooler, pattern.len()));
        }

        let mut anomaly_score = None;
        let learn = self.learning(Stage::TemporalMemory);
        if let Some(tm) = self.sequence.as_mut() {
            let out = tm.compute(&pattern, learn);
            anomaly_score = Some(out.anomaly_score);
            pattern = out.active;
            activity.push((Stage::TemporalMemory, pattern.len()));
        }

        let learn = self.learning(Stage::TemporalPooler);
        if let Some(tp) = self.union.as_mut() {
            pattern = tp.compute(&pattern, learn);
            activity.push((Stage::TemporalPooler, pattern.len()));
        }

        // Infer before learning so training accuracy is not self-fulfilling.
        let inferred_category = self.classifier.infer(&pattern);
        if self.learning(Stage::Classifier) {
            self.classifier.learn(&pattern, record.category);
        }

        Ok(StepOutput {
            sensor_value: record.value,
            actual_category: record.category,
            inferred_category,
            anomaly_score,
            activity,
        })
    }

    fn set_learning(&mut self, stage: Stage, mode: LearningMode) -> Result<(), PipelineError> {
        match self.modes.get_mut(&stage) {
            Some(current) => {
                *current = mode;
                Ok(())
            }
            None => Err(PipelineError::stage(
                stage,
                format!("cannot switch to {mode}: stage is not part of this network"),
            )),
        }
    }
}

/// Builds [`ClassificationNetwork`]s from structural configurations.
#[derive(Debug, Clone, Copy)]
pub struct ReferencePipelineBuilder {
    pub seed: u64,
}

impl ReferencePipelineBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

fn require_type(structure: &StructuralConfiguration, stage: Stage, markers: &[&str]) -> Result<(), PipelineError> {
    let region_type = &structure.region(stage).region_type;
    if markers.iter().any(|m| region_type.contains(m)) {
        Ok(())
    } else {
        Err(PipelineError::UnsupportedStage {
            stage,
            region_type: region_type.clone(),
        })
    }
}

impl PipelineBuilder for ReferencePipelineBuilder {
    fn build(
        &self,
        stream: Box<dyn RecordStream>,
        structure: &StructuralConfiguration,
    ) -> Result<Box<dyn Pipeline>, PipelineError> {
        require_type(structure, Stage::Sensor, &["RecordSensor"])?;
        let encoder = ScalarEncoder::new(&structure.encoder())?;
        let mut width = encoder.width();
        let mut modes = BTreeMap::new();

        let spatial = if structure.is_enabled(Stage::SpatialPooler) {
            require_type(structure, Stage::SpatialPooler, &["SP"])?;
            let params = SpatialParams::from_region(structure.region(Stage::SpatialPooler))?;
            let sp = SpatialPooler::new(width, params, self.seed);
            width = sp.column_count();
            modes.insert(Stage::SpatialPooler, LearningMode::Idle);
            Some(sp)
        } else {
            None
        };

        let sequence = if structure.is_enabled(Stage::TemporalMemory) {
            require_type(structure, Stage::TemporalMemory, &["TM", "TemporalMemory"])?;
            let params = SequenceParams::from_region(structure.region(Stage::TemporalMemory))?;
            let tm = SequenceMemory::new(width, params);
            width = tm.width();
            modes.insert(Stage::TemporalMemory, LearningMode::Idle);
            Some(tm)
        } else {
            None
        };

        let union = if structure.is_enabled(Stage::TemporalPooler) {
            require_type(structure, Stage::TemporalPooler, &["TemporalPooler"])?;
            let params = UnionParams::from_region(structure.region(Stage::TemporalPooler))?;
            modes.insert(Stage::TemporalPooler, LearningMode::Idle);
            Some(UnionPooler::new(width, params))
        } else {
            None
        };

        let classifier = Classifier::from_region(structure.region(Stage::Classifier))?;
        modes.insert(Stage::Classifier, LearningMode::Idle);

        tracing::debug!(
            stages = ?modes.keys().collect::<Vec<_>>(),
            classifier = structure.classifier_label(),
            "Built classification network"
        );
        Ok(Box::new(ClassificationNetwork {
            stream,
            encoder,
            spatial,
            sequence,
            union,
            classifier,
            modes,
            consumed: 0,
        }))
    }
}
