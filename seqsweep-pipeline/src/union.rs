//! Decaying union pooler.
//!
//! Keeps a leaky activity trace per input bit and emits the most active bits,
//! so its output changes slowly across a sequence. While learning, bits that
//! keep recurring gain persistence and decay more slowly.

use seqsweep_core::error::PipelineError;
use seqsweep_core::structure::{RegionConfig, Stage};

#[derive(Debug, Clone, PartialEq)]
pub struct UnionParams {
    /// Per-step multiplicative decay of the activity trace.
    pub decay: f64,
    /// Maximum number of output bits.
    pub num_active: usize,
    /// Persistence gained per learning step a bit is active.
    pub persistence_rate: f64,
    pub max_persistence: f64,
}

impl Default for UnionParams {
    fn default() -> Self {
        Self {
            decay: 0.8,
            num_active: 40,
            persistence_rate: 0.01,
            max_persistence: 1.0,
        }
    }
}

impl UnionParams {
    pub fn from_region(region: &RegionConfig) -> Result<Self, PipelineError> {
        let defaults = Self::default();
        let params = Self {
            decay: region.param_f64("decay").unwrap_or(defaults.decay),
            num_active: region.param_usize("numActiveCells").unwrap_or(defaults.num_active),
            persistence_rate: region
                .param_f64("persistenceRate")
                .unwrap_or(defaults.persistence_rate),
            max_persistence: region
                .param_f64("maxPersistence")
                .unwrap_or(defaults.max_persistence),
        };
        if !(0.0..1.0).contains(&params.decay) || params.num_active == 0 {
            return Err(PipelineError::stage(
                Stage::TemporalPooler,
                format!(
                    "decay {} must be in [0, 1) and numActiveCells positive",
                    params.decay
                ),
            ));
        }
        Ok(params)
    }
}

#[derive(Debug, Clone)]
pub struct UnionPooler {
    params: UnionParams,
    activity: Vec<f64>,
    persistence: Vec<f64>,
}

impl UnionPooler {
    pub fn new(input_width: usize, params: UnionParams) -> Self {
        Self {
            params,
            activity: vec![0.0; input_width],
            persistence: vec![0.0; input_width],
        }
    }

    pub fn width(&self) -> usize {
        self.activity.len()
    }

    pub fn compute(&mut self, input: &[usize], learn: bool) -> Vec<usize> {
        for (bit, activity) in self.activity.iter_mut().enumerate() {
            let decay = self.params.decay + (1.0 - self.params.decay) * self.persistence[bit] / 2.0;
            *activity *= decay;
        }
        for &bit in input {
            let Some(activity) = self.activity.get_mut(bit) else {
                continue;
            };
            *activity += 1.0;
            if learn {
                self.persistence[bit] =
                    (self.persistence[bit] + self.params.persistence_rate).min(self.params.max_persistence);
            }
        }

        let mut ranked: Vec<(usize, f64)> = self
            .activity
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, a)| *a > 1e-3)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut out: Vec<usize> = ranked
            .into_iter()
            .take(self.params.num_active)
            .map(|(bit, _)| bit)
            .collect();
        out.sort_unstable();
        out
    }
}
