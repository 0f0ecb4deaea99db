//! Sequential composition: an ordered list of expected constraint ids that
//! must each complete once, in order.

use super::NextOutcome;
use crate::activation::{ActivationReason, ConstraintActivation};
use crate::context::TriggerContext;
use crate::error::{ConstraintError, Result};
use crate::ids::{ConstraintId, Priority};
use chrono::Utc;
use std::collections::HashSet;

/// A sequential workflow's state: which ids have completed so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequentialState {
    pub completed: HashSet<ConstraintId>,
}

impl SequentialState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A sequential constraint id whose entry is invalid while the context
/// reports a given status value — e.g. entering "green" while the context
/// still reports `status: not-run`. Generalises to any id/status pair
/// configured here.
#[derive(Debug, Clone)]
pub struct ForbiddenEntry {
    pub target: ConstraintId,
    pub status_key: String,
    pub forbidden_value: String,
}

/// Compute the next step of a sequential workflow, or report that it
/// already completed, or reject entry into a step the context says isn't
/// ready for yet.
pub fn next(
    state: &SequentialState,
    universe: &[ConstraintId],
    context: &TriggerContext,
    forbidden: &[ForbiddenEntry],
) -> Result<NextOutcome> {
    let Some((step, id)) = universe
        .iter()
        .enumerate()
        .find(|(_, id)| !state.completed.contains(id))
    else {
        return Ok(NextOutcome::Complete {
            message: "All sequential steps completed.".to_string(),
        });
    };

    for rule in forbidden {
        if &rule.target == id {
            if let Some(value) = context.metadata.get(&rule.status_key).and_then(|v| v.as_str()) {
                if value == rule.forbidden_value {
                    return Err(ConstraintError::InvalidWorkflowTransition {
                        from: current_label(state, universe),
                        to: id.to_string(),
                    });
                }
            }
        }
    }

    let context_label = context
        .context_type
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(NextOutcome::Activation(ConstraintActivation {
        id: id.clone(),
        score: 1.0,
        priority: Priority::new(1.0).expect("1.0 is a valid priority"),
        reason: ActivationReason::CompositionNext,
        layer_or_step: Some(format!("step {} of {}", step + 1, universe.len())),
        guidance: format!(
            "Step {} of {}, context: context_type={}",
            step + 1,
            universe.len(),
            context_label
        ),
        timestamp: Utc::now(),
    }))
}

/// Mark an activation's constraint complete. Idempotent: advancing with the
/// same activation twice is the same as advancing once, because completion
/// is tracked as a set.
pub fn advance(state: &mut SequentialState, activation: &ConstraintActivation) {
    state.completed.insert(activation.id.clone());
}

fn current_label(state: &SequentialState, universe: &[ConstraintId]) -> String {
    universe
        .iter()
        .rev()
        .find(|id| state.completed.contains(*id))
        .map(|id| id.to_string())
        .unwrap_or_else(|| "start".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextType;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn id(s: &str) -> ConstraintId {
        ConstraintId::new(s).unwrap()
    }

    fn ctx(status: Option<&str>) -> TriggerContext {
        let mut metadata = BTreeMap::new();
        if let Some(s) = status {
            metadata.insert("status".to_string(), json!(s));
        }
        TriggerContext {
            keywords: vec![],
            file_path: None,
            context_type: Some(ContextType::Testing),
            metadata,
            timestamp: Utc::now(),
            session_id: None,
        }
    }

    #[test]
    fn next_returns_first_incomplete_step() {
        let universe = vec![id("red"), id("green"), id("refactor")];
        let state = SequentialState::new();
        let outcome = next(&state, &universe, &ctx(None), &[]).unwrap();
        match outcome {
            NextOutcome::Activation(a) => assert_eq!(a.id, id("red")),
            _ => panic!("expected activation"),
        }
    }

    #[test]
    fn next_reports_complete_when_all_done() {
        let universe = vec![id("red"), id("green")];
        let mut state = SequentialState::new();
        state.completed.insert(id("red"));
        state.completed.insert(id("green"));
        let outcome = next(&state, &universe, &ctx(None), &[]).unwrap();
        assert!(matches!(outcome, NextOutcome::Complete { .. }));
    }

    #[test]
    fn invalid_transition_rejected() {
        let universe = vec![id("red"), id("green")];
        let mut state = SequentialState::new();
        state.completed.insert(id("red"));
        let forbidden = vec![ForbiddenEntry {
            target: id("green"),
            status_key: "status".to_string(),
            forbidden_value: "not-run".to_string(),
        }];
        let err = next(&state, &universe, &ctx(Some("not-run")), &forbidden);
        assert!(matches!(err, Err(ConstraintError::InvalidWorkflowTransition { .. })));
    }

    #[test]
    fn advance_is_idempotent() {
        let universe = vec![id("red"), id("green")];
        let mut state = SequentialState::new();
        let activation = match next(&state, &universe, &ctx(None), &[]).unwrap() {
            NextOutcome::Activation(a) => a,
            _ => panic!("expected activation"),
        };
        advance(&mut state, &activation);
        let after_one = state.clone();
        advance(&mut state, &activation);
        assert_eq!(state, after_one);
    }
}
