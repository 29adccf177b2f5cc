//! k-winners spatial pooler with permanence learning.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seqsweep_core::error::PipelineError;
use seqsweep_core::structure::{RegionConfig, Stage};

/// Tunables read from `regionParams`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialParams {
    pub column_count: usize,
    pub num_active_columns: usize,
    pub potential_pct: f64,
    pub syn_perm_connected: f64,
    pub syn_perm_active_inc: f64,
    pub syn_perm_inactive_dec: f64,
}

impl Default for SpatialParams {
    fn default() -> Self {
        Self {
            column_count: 512,
            num_active_columns: 20,
            potential_pct: 0.5,
            syn_perm_connected: 0.2,
            syn_perm_active_inc: 0.05,
            syn_perm_inactive_dec: 0.01,
        }
    }
}

impl SpatialParams {
    pub fn from_region(region: &RegionConfig) -> Result<Self, PipelineError> {
        let defaults = Self::default();
        let params = Self {
            column_count: region.param_usize("columnCount").unwrap_or(defaults.column_count),
            num_active_columns: region
                .param_usize("numActiveColumnsPerInhArea")
                .unwrap_or(defaults.num_active_columns),
            potential_pct: region.param_f64("potentialPct").unwrap_or(defaults.potential_pct),
            syn_perm_connected: region
                .param_f64("synPermConnected")
                .unwrap_or(defaults.syn_perm_connected),
            syn_perm_active_inc: region
                .param_f64("synPermActiveInc")
                .unwrap_or(defaults.syn_perm_active_inc),
            syn_perm_inactive_dec: region
                .param_f64("synPermInactiveDec")
                .unwrap_or(defaults.syn_perm_inactive_dec),
        };
        if params.column_count == 0
            || params.num_active_columns == 0
            || params.num_active_columns > params.column_count
        {
            return Err(PipelineError::stage(
                Stage::SpatialPooler,
                format!(
                    "{} active columns out of {} is not a valid sparsity",
                    params.num_active_columns, params.column_count
                ),
            ));
        }
        if !(0.0..=1.0).contains(&params.potential_pct) || params.potential_pct == 0.0 {
            return Err(PipelineError::stage(
                Stage::SpatialPooler,
                format!("potentialPct {} must be in (0, 1]", params.potential_pct),
            ));
        }
        Ok(params)
    }
}

#[derive(Debug, Clone)]
struct Synapse {
    input: usize,
    permanence: f64,
}

/// Maps an input SDR onto a fixed number of winning columns.
#[derive(Debug, Clone)]
pub struct SpatialPooler {
    params: SpatialParams,
    columns: Vec<Vec<Synapse>>,
}

impl SpatialPooler {
    pub fn new(input_width: usize, params: SpatialParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let potential = ((input_width as f64 * params.potential_pct).round() as usize).clamp(1, input_width.max(1));
        let threshold = params.syn_perm_connected;
        let columns = (0..params.column_count)
            .map(|_| {
                let mut inputs = rand::seq::index::sample(&mut rng, input_width.max(1), potential).into_vec();
                inputs.sort_unstable();
                inputs
                    .into_iter()
                    .map(|input| Synapse {
                        input,
                        permanence: (threshold + rng.gen_range(-0.1..0.1)).clamp(0.0, 1.0),
                    })
                    .collect()
            })
            .collect();
        Self { params, columns }
    }

    pub fn column_count(&self) -> usize {
        self.params.column_count
    }

    /// Winning columns for `input` (sorted active bit indices), adapting
    /// winners' permanences when `learn` is set.
    pub fn compute(&mut self, input: &[usize], learn: bool) -> Vec<usize> {
        let connected = self.params.syn_perm_connected;
        let mut overlaps: Vec<(usize, usize)> = self
            .columns
            .iter()
            .enumerate()
            .map(|(column, synapses)| {
                let overlap = synapses
                    .iter()
                    .filter(|s| s.permanence >= connected && input.binary_search(&s.input).is_ok())
                    .count();
                (column, overlap)
            })
            .filter(|(_, overlap)| *overlap > 0)
            .collect();
        // Highest overlap first, lowest index breaks ties.
        overlaps.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut winners: Vec<usize> = overlaps
            .into_iter()
            .take(self.params.num_active_columns)
            .map(|(column, _)| column)
            .collect();
        winners.sort_unstable();

        if learn {
            let (inc, dec) = (self.params.syn_perm_active_inc, self.params.syn_perm_inactive_dec);
            for &column in &winners {
                for synapse in &mut self.columns[column] {
                    synapse.permanence = if input.binary_search(&synapse.input).is_ok() {
                        (synapse.permanence + inc).min(1.0)
                    } else {
                        (synapse.permanence - dec).max(0.0)
                    };
                }
            }
        }
        winners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pooler() -> SpatialPooler {
        let params = SpatialParams {
            column_count: 64,
            num_active_columns: 8,
            potential_pct: 0.8,
            ..SpatialParams::default()
        };
        SpatialPooler::new(100, params, 3)
    }

    #[test]
    fn test_output_is_sparse_and_sorted() {
        let mut sp = pooler();
        let input: Vec<usize> = (10..30).collect();
        let active = sp.compute(&input, false);
        assert!(!active.is_empty());
        assert!(active.len() <= 8);
        assert!(active.windows(2).all(|w| w[0] < w[1]));
        assert!(active.iter().all(|c| *c < 64));
    }

    #[test]
    fn test_inference_is_stable() {
        let mut sp = pooler();
        let input: Vec<usize> = (40..60).collect();
        assert_eq!(sp.compute(&input, false), sp.compute(&input, false));
    }

    #[test]
    fn test_learning_reinforces_winners() {
        let mut sp = pooler();
        let input: Vec<usize> = (0..20).collect();
        let first = sp.compute(&input, true);
        for _ in 0..20 {
            sp.compute(&input, true);
        }
        let last = sp.compute(&input, false);
        let kept = first.iter().filter(|c| last.contains(c)).count();
        assert!(kept >= first.len() / 2);
    }

    #[test]
    fn test_params_validation() {
        let mut region: RegionConfig = serde_json::from_value(serde_json::json!({
            "regionEnabled": true,
            "regionType": "py.SPRegion",
            "regionParams": {"columnCount": 16, "numActiveColumnsPerInhArea": 32}
        }))
        .unwrap();
        assert!(SpatialParams::from_region(&region).is_err());
        region.region_params.insert("numActiveColumnsPerInhArea".into(), 4.into());
        let params = SpatialParams::from_region(&region).unwrap();
        assert_eq!(params.column_count, 16);
        assert_eq!(params.num_active_columns, 4);
    }
}
