//! Per-connection session state: the interaction counter, the live workflow
//! phase, and one composition state per active composite constraint.

use crate::composition::CompositionState;
use crate::ids::ConstraintId;
use std::collections::HashMap;

/// User-defined `(name, description)` — the live phase of a session, e.g.
/// red/green/refactor in a TDD pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowState {
    pub name: String,
    pub description: String,
}

impl WorkflowState {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new("red", "default starting phase")
    }
}

/// Created on the first `initialize`, torn down on `shutdown` or stream end.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub interaction_counter: u32,
    pub workflow_state: WorkflowState,
    pub composition_states: HashMap<ConstraintId, CompositionState>,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            interaction_counter: 0,
            workflow_state: WorkflowState::default(),
            composition_states: HashMap::new(),
        }
    }

    /// Advance the interaction counter and return the new value, as seen by
    /// the scheduler on the next call.
    pub fn record_interaction(&mut self) -> u32 {
        self.interaction_counter += 1;
        self.interaction_counter
    }

    pub fn set_workflow_state(&mut self, state: WorkflowState) {
        self.workflow_state = state;
    }

    pub fn composition_state(&self, composite_id: &ConstraintId) -> Option<&CompositionState> {
        self.composition_states.get(composite_id)
    }

    pub fn composition_state_mut(
        &mut self,
        composite_id: &ConstraintId,
    ) -> Option<&mut CompositionState> {
        self.composition_states.get_mut(composite_id)
    }

    pub fn ensure_composition_state(
        &mut self,
        composite_id: ConstraintId,
        init: impl FnOnce() -> CompositionState,
    ) -> &mut CompositionState {
        self.composition_states.entry(composite_id).or_insert_with(init)
    }
}
