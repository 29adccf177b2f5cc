//! Property-based tests for sweep enumeration and partition planning.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use seqsweep_core::space::IndexProduct;
use seqsweep_core::training::LearningState;
use seqsweep_core::{
    ConfigurationSpace, LearningMode, PartitionPlanner, PhaseSchedule, Stage,
    StructuralConfiguration, Transition,
};

fn structure(sp: bool, tm: bool, tp: bool, label: &str) -> Arc<StructuralConfiguration> {
    let region = |enabled: bool, region_type: &str| {
        json!({"regionEnabled": enabled, "regionType": region_type, "regionParams": {}})
    };
    let value = json!({
        "sensorRegionConfig": region(true, "py.RecordSensor"),
        "spRegionConfig": region(sp, "py.SPRegion"),
        "tmRegionConfig": region(tm, "py.TMRegion"),
        "tpRegionConfig": region(tp, "py.UnionTemporalPoolerRegion"),
        "classifierRegionConfig": {
            "regionEnabled": true,
            "regionType": "py.KNNClassifierRegion",
            "label": label
        }
    });
    Arc::new(StructuralConfiguration::from_value(&value, "proptest").unwrap())
}

fn space_with_sizes(sizes: &[usize]) -> ConfigurationSpace {
    ConfigurationSpace {
        signal_types: (0..sizes[0]).map(|i| format!("signal{i}")).collect(),
        structures: (0..sizes[1])
            .map(|i| structure(i % 2 == 0, false, false, &format!("c{i}")))
            .collect(),
        noise_amplitudes: (0..sizes[2]).map(|i| i as f64 / 10.0).collect(),
        signal_means: (0..sizes[3]).map(|i| i as f64).collect(),
        signal_amplitudes: (0..sizes[4]).map(|i| 1.0 + i as f64).collect(),
        num_categories: (0..sizes[5]).map(|i| 2 + i).collect(),
        num_reps: (0..sizes[6]).map(|i| 1 + i).collect(),
        num_phases: (0..sizes[7]).map(|i| 2 + i).collect(),
        noise_lengths: (0..sizes[8]).map(|i| vec![i]).collect(),
    }
}

// --- Enumeration properties ---

proptest! {
    #[test]
    fn product_yields_every_tuple_once_in_order(
        lengths in prop::collection::vec(0usize..4, 1..6)
    ) {
        let tuples: Vec<_> = IndexProduct::new(lengths.clone()).collect();
        let expected: usize = lengths.iter().product();
        prop_assert_eq!(tuples.len(), expected);

        let unique: HashSet<_> = tuples.iter().cloned().collect();
        prop_assert_eq!(unique.len(), expected);

        for pair in tuples.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for tuple in &tuples {
            for (index, length) in tuple.iter().zip(&lengths) {
                prop_assert!(index < length);
            }
        }
    }

    #[test]
    fn space_count_matches_axis_product(
        sizes in prop::collection::vec(1usize..3, 9)
    ) {
        let space = space_with_sizes(&sizes);
        let descriptors: Vec<_> = space.iter().collect();
        prop_assert_eq!(descriptors.len(), sizes.iter().product::<usize>());
        prop_assert_eq!(space.len(), descriptors.len());

        for (i, d) in descriptors.iter().enumerate() {
            prop_assert_eq!(d.exp_id, i);
        }
        let rendered: HashSet<_> = descriptors
            .iter()
            .map(|d| format!("{:?}", d.axis_values()))
            .collect();
        prop_assert_eq!(rendered.len(), descriptors.len());
    }

    #[test]
    fn re_enumeration_is_identical(
        sizes in prop::collection::vec(1usize..3, 9)
    ) {
        let space = space_with_sizes(&sizes);
        let first: Vec<_> = space.iter().collect();
        let second: Vec<_> = space.iter().collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn first_axis_varies_slowest(
        sizes in prop::collection::vec(1usize..3, 9)
    ) {
        let space = space_with_sizes(&sizes);
        let block = space.len() / sizes[0];
        for d in space.iter() {
            prop_assert_eq!(&d.signal_type, &format!("signal{}", d.exp_id / block));
        }
    }
}

// --- Partition properties ---

proptest! {
    #[test]
    fn plan_is_ordered_in_bounds_and_enabled_only(
        sp in any::<bool>(),
        tm in any::<bool>(),
        tp in any::<bool>(),
        num_phases in 2usize..8,
        num_categories in 1usize..6,
        extra in 0usize..500,
    ) {
        let structure = structure(sp, tm, tp, "knn");
        let schedule = PhaseSchedule { num_phases, num_categories };
        let num_points = PartitionPlanner::minimum_points(&schedule) + extra;

        let partition = match PartitionPlanner.plan(&structure, &schedule, num_points) {
            Ok(partition) => partition,
            // Short training windows cannot fit an upstream phase.
            Err(seqsweep_core::PlanError::DegeneratePhase { .. }) => {
                prop_assert!(!structure.enabled_upstream().is_empty());
                return Ok(());
            }
            Err(other) => return Err(TestCaseError::fail(other.to_string())),
        };

        let positions: Vec<_> = partition.breakpoints().iter().map(|b| b.position).collect();
        prop_assert_eq!(positions[0], 0);
        for pair in positions.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        prop_assert!(positions.iter().all(|p| *p < num_points));

        let mut state = LearningState::new(structure.enabled_stages().into_iter().filter(|s| s.can_learn()));
        let mut finalized = HashSet::new();
        for breakpoint in partition.breakpoints() {
            for (stage, transition) in &breakpoint.transitions {
                prop_assert!(structure.is_enabled(*stage));
                prop_assert!(!(finalized.contains(stage) && *transition == Transition::Enable));
                let mode = state.apply(*stage, *transition).unwrap();
                if mode == LearningMode::Finalized {
                    finalized.insert(*stage);
                }
            }
        }
        prop_assert_eq!(state.mode(Stage::Classifier), Some(LearningMode::Finalized));
    }
}
