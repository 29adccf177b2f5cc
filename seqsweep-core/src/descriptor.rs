//! Run descriptors, one immutable point of the sweep each.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::structure::{Stage, StructuralConfiguration};

/// One point of the sweep. Built by [`crate::space::ConfigurationSpace`] and
/// only ever handed out by reference or clone afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunDescriptor {
    /// Ordinal position in the enumeration.
    pub exp_id: usize,
    pub signal_type: String,
    pub noise_amplitude: f64,
    pub signal_mean: f64,
    pub signal_amplitude: f64,
    pub num_categories: usize,
    pub num_reps: usize,
    pub num_phases: usize,
    pub noise_lengths: Vec<usize>,
    #[serde(skip)]
    pub structure: Arc<StructuralConfiguration>,
}

/// Phase layout inputs the partition planner needs from a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSchedule {
    pub num_phases: usize,
    pub num_categories: usize,
}

impl RunDescriptor {
    pub fn schedule(&self) -> PhaseSchedule {
        PhaseSchedule {
            num_phases: self.num_phases,
            num_categories: self.num_categories,
        }
    }

    /// Every axis value as `(name, rendered value)`, in axis order.
    pub fn axis_values(&self) -> Vec<(&'static str, String)> {
        let structure = &self.structure;
        vec![
            ("signal_type", self.signal_type.clone()),
            (
                "structure",
                format!(
                    "sp-{}_tm-{}_tp-{}_{}@{}",
                    structure.is_enabled(Stage::SpatialPooler),
                    structure.is_enabled(Stage::TemporalMemory),
                    structure.is_enabled(Stage::TemporalPooler),
                    structure.classifier_label(),
                    structure.fingerprint(),
                ),
            ),
            ("noise_amplitude", self.noise_amplitude.to_string()),
            ("signal_mean", self.signal_mean.to_string()),
            ("signal_amplitude", self.signal_amplitude.to_string()),
            ("num_categories", self.num_categories.to_string()),
            ("num_reps", self.num_reps.to_string()),
            ("num_phases", self.num_phases.to_string()),
            ("noise_lengths", format_lengths(&self.noise_lengths)),
        ]
    }
}

/// Render noise lengths as `a|b|c` so the value stays inside one CSV cell.
pub fn format_lengths(lengths: &[usize]) -> String {
    lengths
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

impl fmt::Display for RunDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exp_id={}", self.exp_id)?;
        for (name, value) in self.axis_values() {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::expand_template;
    use crate::structure::tests::config_value;

    fn descriptor() -> RunDescriptor {
        let structure = StructuralConfiguration::from_value(
            &config_value(true, false, false, "py.KNNClassifierRegion"),
            "t",
        )
        .unwrap();
        RunDescriptor {
            exp_id: 7,
            signal_type: "sine".into(),
            noise_amplitude: 0.5,
            signal_mean: 0.0,
            signal_amplitude: 1.0,
            num_categories: 3,
            num_reps: 2,
            num_phases: 4,
            noise_lengths: vec![0, 5],
            structure: Arc::new(structure),
        }
    }

    #[test]
    fn test_display_lists_every_axis() {
        let text = descriptor().to_string();
        assert!(text.starts_with("exp_id=7"));
        for key in [
            "signal_type=sine",
            "structure=sp-true_tm-false_tp-false_py.KNNClassifierRegion",
            "noise_amplitude=0.5",
            "num_phases=4",
            "noise_lengths=0|5",
        ] {
            assert!(text.contains(key), "missing {key} in {text}");
        }
    }

    #[test]
    fn test_structures_differing_only_in_params_are_told_apart() {
        let template = config_value(true, true, false, "py.KNNClassifierRegion");
        let structures = expand_template(&template, &[3, 5], "template").unwrap();
        let mut a = descriptor();
        let mut b = descriptor();
        a.structure = Arc::clone(&structures[0]);
        b.structure = Arc::clone(&structures[1]);
        b.exp_id = a.exp_id;

        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
        assert_ne!(a.axis_values(), b.axis_values());
        assert_eq!(a.structure.fingerprint(), structures[0].fingerprint());
    }

    #[test]
    fn test_schedule() {
        let schedule = descriptor().schedule();
        assert_eq!(schedule.num_phases, 4);
        assert_eq!(schedule.num_categories, 3);
    }
}
