//! Activation decisions: the output of the trigger matcher and the
//! composition engine.

use crate::ids::{ConstraintId, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a constraint activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationReason {
    KeywordMatch,
    FilePatternMatch,
    ContextPatternMatch,
    CombinedFactors,
    CompositionNext,
    ArchitecturalViolation,
    Unknown,
}

/// A constraint judged relevant to the current context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintActivation {
    pub id: ConstraintId,
    pub score: f64,
    /// The constraint's own priority, carried through so tie-broken
    /// selection (equal score) can prefer the higher-priority constraint
    /// deterministically instead of falling back to collection order.
    pub priority: Priority,
    pub reason: ActivationReason,
    /// Layer name or sequential-step label, when the composition engine
    /// produced this activation; `None` for a bare trigger-matcher hit.
    pub layer_or_step: Option<String>,
    pub guidance: String,
    pub timestamp: DateTime<Utc>,
}
