//! Sweep enumeration: the Cartesian product of all sweep axes.
//!
//! Axes are enumerated lexicographically with the first-declared axis varying
//! slowest, so `exp_id` (the ordinal position) is stable across re-runs.

use std::sync::Arc;

use crate::config::SweepSettings;
use crate::descriptor::RunDescriptor;
use crate::structure::StructuralConfiguration;

/// Lazy odometer over the index tuples of a set of axis lengths.
///
/// The last axis turns fastest. Any zero-length axis makes the product empty.
#[derive(Debug, Clone)]
pub struct IndexProduct {
    lengths: Vec<usize>,
    next: Option<Vec<usize>>,
    remaining: usize,
}

impl IndexProduct {
    pub fn new(lengths: Vec<usize>) -> Self {
        let remaining = lengths.iter().product();
        let next = (remaining > 0).then(|| vec![0; lengths.len()]);
        Self {
            lengths,
            next,
            remaining,
        }
    }
}

impl Iterator for IndexProduct {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.remaining -= 1;

        let mut following = current.clone();
        let mut axis = following.len();
        let mut carried = true;
        while carried && axis > 0 {
            axis -= 1;
            following[axis] += 1;
            if following[axis] < self.lengths[axis] {
                carried = false;
            } else {
                following[axis] = 0;
            }
        }
        if !carried {
            self.next = Some(following);
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for IndexProduct {}

/// All sweep axes, in enumeration order.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationSpace {
    pub signal_types: Vec<String>,
    pub structures: Vec<Arc<StructuralConfiguration>>,
    pub noise_amplitudes: Vec<f64>,
    pub signal_means: Vec<f64>,
    pub signal_amplitudes: Vec<f64>,
    pub num_categories: Vec<usize>,
    pub num_reps: Vec<usize>,
    pub num_phases: Vec<usize>,
    pub noise_lengths: Vec<Vec<usize>>,
}

impl ConfigurationSpace {
    /// Build the space from the static axes in `settings` plus the loaded
    /// structural configurations.
    pub fn from_settings(
        settings: &SweepSettings,
        structures: Vec<Arc<StructuralConfiguration>>,
    ) -> Self {
        let axes = &settings.axes;
        Self {
            signal_types: axes.signal_types.clone(),
            structures,
            noise_amplitudes: axes.white_noise_amplitudes.clone(),
            signal_means: axes.signal_means.clone(),
            signal_amplitudes: axes.signal_amplitudes.clone(),
            num_categories: axes.num_categories.clone(),
            num_reps: axes.num_reps.clone(),
            num_phases: axes.num_phases.clone(),
            noise_lengths: axes.noise_lengths.clone(),
        }
    }

    /// `(axis name, number of candidate values)` in enumeration order.
    pub fn axes(&self) -> [(&'static str, usize); 9] {
        [
            ("signal_type", self.signal_types.len()),
            ("structure", self.structures.len()),
            ("noise_amplitude", self.noise_amplitudes.len()),
            ("signal_mean", self.signal_means.len()),
            ("signal_amplitude", self.signal_amplitudes.len()),
            ("num_categories", self.num_categories.len()),
            ("num_reps", self.num_reps.len()),
            ("num_phases", self.num_phases.len()),
            ("noise_lengths", self.noise_lengths.len()),
        ]
    }

    /// Total number of runs.
    pub fn len(&self) -> usize {
        self.axes().iter().map(|(_, n)| n).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerate every descriptor. Each call starts a fresh enumeration.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = RunDescriptor> + '_ {
        let lengths = self.axes().iter().map(|(_, n)| *n).collect();
        IndexProduct::new(lengths)
            .enumerate()
            .map(move |(exp_id, idx)| RunDescriptor {
                exp_id,
                signal_type: self.signal_types[idx[0]].clone(),
                structure: Arc::clone(&self.structures[idx[1]]),
                noise_amplitude: self.noise_amplitudes[idx[2]],
                signal_mean: self.signal_means[idx[3]],
                signal_amplitude: self.signal_amplitudes[idx[4]],
                num_categories: self.num_categories[idx[5]],
                num_reps: self.num_reps[idx[6]],
                num_phases: self.num_phases[idx[7]],
                noise_lengths: self.noise_lengths[idx[8]].clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::tests::config_value;

    fn structure(classifier: &str) -> Arc<StructuralConfiguration> {
        Arc::new(
            StructuralConfiguration::from_value(&config_value(false, false, false, classifier), "t")
                .unwrap(),
        )
    }

    fn space() -> ConfigurationSpace {
        ConfigurationSpace {
            signal_types: vec!["binary".into(), "sine".into()],
            structures: vec![structure("py.KNNClassifierRegion"), structure("py.CLAClassifierRegion")],
            noise_amplitudes: vec![0.0, 0.5, 1.0],
            signal_means: vec![0.0],
            signal_amplitudes: vec![1.0],
            num_categories: vec![3],
            num_reps: vec![2],
            num_phases: vec![3],
            noise_lengths: vec![vec![0]],
        }
    }

    #[test]
    fn test_index_product_order() {
        let tuples: Vec<_> = IndexProduct::new(vec![2, 3]).collect();
        assert_eq!(
            tuples,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
    }

    #[test]
    fn test_index_product_empty_axis() {
        let mut product = IndexProduct::new(vec![2, 0, 4]);
        assert_eq!(product.len(), 0);
        assert!(product.next().is_none());
    }

    #[test]
    fn test_index_product_exact_size() {
        let mut product = IndexProduct::new(vec![2, 2]);
        assert_eq!(product.len(), 4);
        product.next();
        assert_eq!(product.len(), 3);
    }

    #[test]
    fn test_space_len_and_ids() {
        let space = space();
        assert_eq!(space.len(), 12);
        let ids: Vec<_> = space.iter().map(|d| d.exp_id).collect();
        assert_eq!(ids, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_first_axis_varies_slowest() {
        let space = space();
        let runs: Vec<_> = space.iter().collect();
        assert!(runs[..6].iter().all(|d| d.signal_type == "binary"));
        assert!(runs[6..].iter().all(|d| d.signal_type == "sine"));
        // Innermost varying axis here is the noise amplitude.
        assert_eq!(runs[0].noise_amplitude, 0.0);
        assert_eq!(runs[1].noise_amplitude, 0.5);
        assert_eq!(runs[2].noise_amplitude, 1.0);
        assert_eq!(runs[3].structure.classifier_label(), "py.CLAClassifierRegion");
    }

    #[test]
    fn test_reenumeration_is_identical() {
        let space = space();
        let first: Vec<_> = space.iter().collect();
        let second: Vec<_> = space.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_axis_yields_no_runs() {
        let mut space = space();
        space.noise_lengths.clear();
        assert!(space.is_empty());
        assert_eq!(space.iter().count(), 0);
    }
}
