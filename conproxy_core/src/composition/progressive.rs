//! Progressive composition: the fixed six-level refactoring ladder.

use super::NextOutcome;
use crate::activation::{ActivationReason, ConstraintActivation};
use crate::context::TriggerContext;
use crate::error::{ConstraintError, Result, SkipFailureReason};
use crate::ids::{ConstraintId, Priority};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 6;
const BARRIER_LEVELS: [u8; 2] = [3, 5];

/// State of a progressive refactoring workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressiveState {
    pub current_level: u8,
    pub completed: HashSet<u8>,
    pub tests_passing: bool,
    pub ready_for_refactor: bool,
}

impl Default for ProgressiveState {
    fn default() -> Self {
        Self {
            current_level: MIN_LEVEL,
            completed: HashSet::new(),
            tests_passing: false,
            ready_for_refactor: false,
        }
    }
}

impl ProgressiveState {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_barrier(level: u8) -> bool {
        BARRIER_LEVELS.contains(&level)
    }
}

/// `level -> constraint id` for each of the six fixed levels.
pub type ProgressiveUniverse = BTreeMap<u8, ConstraintId>;

pub fn next(
    state: &ProgressiveState,
    universe: &ProgressiveUniverse,
    context: &TriggerContext,
) -> Option<NextOutcome> {
    let id = universe.get(&state.current_level)?;
    let context_label = context.context_type.map(|c| c.as_str()).unwrap_or("unknown");

    let guidance = if ProgressiveState::is_barrier(state.current_level) {
        format!(
            "Level {} (barrier): pause and confirm readiness before continuing — context: context_type={}",
            state.current_level, context_label
        )
    } else {
        format!(
            "Level {}, context: context_type={}",
            state.current_level, context_label
        )
    };

    Some(NextOutcome::Activation(ConstraintActivation {
        id: id.clone(),
        score: 1.0,
        priority: Priority::new(1.0).expect("1.0 is a valid priority"),
        reason: ActivationReason::CompositionNext,
        layer_or_step: Some(format!("level {}", state.current_level)),
        guidance,
        timestamp: Utc::now(),
    }))
}

/// Mark `level` completed and advance to `min(level + 1, MAX_LEVEL)`.
pub fn complete(state: &mut ProgressiveState, level: u8) {
    state.completed.insert(level);
    state.current_level = (level + 1).min(MAX_LEVEL);
}

/// Attempt to jump directly to `target`. Succeeds only if `target` is
/// exactly `current + 1` and every level below it is completed (or is the
/// current level itself).
pub fn try_skip(state: &mut ProgressiveState, target: u8) -> Result<()> {
    if target == 0 || target > MAX_LEVEL || target <= state.current_level {
        return Err(ConstraintError::SkipFailure(SkipFailureReason::InvalidTargetLevel));
    }

    if target != state.current_level + 1 {
        return Err(ConstraintError::SkipFailure(
            SkipFailureReason::SystematicProgressionRequired,
        ));
    }

    let prerequisites_met = (MIN_LEVEL..target)
        .all(|lvl| state.completed.contains(&lvl) || lvl == state.current_level);
    if !prerequisites_met {
        return Err(ConstraintError::SkipFailure(SkipFailureReason::MissingPrerequisites));
    }

    state.current_level = target;
    Ok(())
}
