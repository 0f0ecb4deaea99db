//! The composition engine: four fixed strategies for coordinating
//! multi-constraint workflows. Deliberately a closed sum, not an open
//! plugin boundary — see the design notes on why confidence boosts (in
//! `matcher`) are the one extension point that *is* open.

pub mod hierarchical;
pub mod layered;
pub mod progressive;
pub mod sequential;

pub use hierarchical::{HierarchicalEntry, HierarchicalState};
pub use layered::{LayerDefinition, LayerViolation, LayeredState};
pub use progressive::ProgressiveState;
pub use sequential::SequentialState;

use crate::activation::ConstraintActivation;
use crate::constraint::CompositionType;

/// What a strategy's `next` step yields.
#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    Activation(ConstraintActivation),
    None,
    Complete { message: String },
}

/// Per-session state for each of the four strategies. A session may have
/// more than one of these live at once (one per composite constraint that
/// is currently driving a workflow).
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionState {
    Sequential(SequentialState),
    Hierarchical(HierarchicalState),
    Progressive(ProgressiveState),
    Layered(LayeredState),
}

impl CompositionState {
    pub fn composition_type(&self) -> CompositionType {
        match self {
            CompositionState::Sequential(_) => CompositionType::Sequential,
            CompositionState::Hierarchical(_) => CompositionType::Hierarchical,
            CompositionState::Progressive(_) => CompositionType::Progressive,
            CompositionState::Layered(_) => CompositionType::Layered,
        }
    }
}
