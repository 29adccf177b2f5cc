//! Per-stage learning modes and the transitions between them.
//!
//! Modes only move forward: a stage that was frozen or finalized never learns
//! again within the same run, and a finalized stage accepts no transition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::structure::Stage;

/// Learning mode of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningMode {
    /// Infers only; nothing has been enabled yet.
    Idle,
    Learning,
    /// Learning disabled.
    Frozen,
    /// Terminal.
    Finalized,
}

impl LearningMode {
    pub fn is_learning(&self) -> bool {
        matches!(self, Self::Learning)
    }
}

impl fmt::Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Learning => "learning",
            Self::Frozen => "frozen",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// A requested change of learning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Enable,
    Disable,
    Finalize,
}

impl Transition {
    /// Mode reached by applying this transition to `from`, or `None` if the
    /// move is not allowed.
    pub fn apply(self, from: LearningMode) -> Option<LearningMode> {
        use LearningMode::*;
        match (self, from) {
            (_, Finalized) => None,
            (Transition::Enable, Idle) => Some(Learning),
            (Transition::Enable, _) => None,
            (Transition::Disable, Idle | Learning) => Some(Frozen),
            (Transition::Disable, Frozen) => None,
            (Transition::Finalize, _) => Some(Finalized),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Learning modes of every stage of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningState {
    modes: BTreeMap<Stage, LearningMode>,
}

/// A transition the state machine refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    pub stage: Stage,
    pub transition: Transition,
    pub mode: LearningMode,
}

impl LearningState {
    /// Every listed stage starts idle.
    pub fn new(stages: impl IntoIterator<Item = Stage>) -> Self {
        Self {
            modes: stages
                .into_iter()
                .map(|s| (s, LearningMode::Idle))
                .collect(),
        }
    }

    pub fn mode(&self, stage: Stage) -> Option<LearningMode> {
        self.modes.get(&stage).copied()
    }

    /// Apply a transition; the state is left untouched when it is rejected.
    pub fn apply(&mut self, stage: Stage, transition: Transition) -> Result<LearningMode, Rejected> {
        let current = self.modes.get(&stage).copied().ok_or(Rejected {
            stage,
            transition,
            mode: LearningMode::Idle,
        })?;
        let next = transition.apply(current).ok_or(Rejected {
            stage,
            transition,
            mode: current,
        })?;
        self.modes.insert(stage, next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let mut state = LearningState::new([Stage::SpatialPooler]);
        assert_eq!(state.mode(Stage::SpatialPooler), Some(LearningMode::Idle));
        assert_eq!(
            state.apply(Stage::SpatialPooler, Transition::Enable),
            Ok(LearningMode::Learning)
        );
        assert_eq!(
            state.apply(Stage::SpatialPooler, Transition::Disable),
            Ok(LearningMode::Frozen)
        );
        assert_eq!(
            state.apply(Stage::SpatialPooler, Transition::Finalize),
            Ok(LearningMode::Finalized)
        );
    }

    #[test]
    fn test_no_reenable_after_freeze() {
        let mut state = LearningState::new([Stage::TemporalMemory]);
        state.apply(Stage::TemporalMemory, Transition::Enable).unwrap();
        state.apply(Stage::TemporalMemory, Transition::Disable).unwrap();
        let err = state
            .apply(Stage::TemporalMemory, Transition::Enable)
            .unwrap_err();
        assert_eq!(err.mode, LearningMode::Frozen);
        assert_eq!(state.mode(Stage::TemporalMemory), Some(LearningMode::Frozen));
    }

    #[test]
    fn test_finalized_is_terminal() {
        for transition in [Transition::Enable, Transition::Disable, Transition::Finalize] {
            assert_eq!(transition.apply(LearningMode::Finalized), None);
        }
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let mut state = LearningState::new([Stage::Classifier]);
        assert!(state.apply(Stage::TemporalPooler, Transition::Enable).is_err());
    }
}
