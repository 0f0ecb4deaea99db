//! Domain error taxonomy.
//!
//! Mirrors the closed set of recoverable failures a conforming implementation
//! must surface as values, never as a panic or an aborted dispatcher loop.

use crate::ids::ConstraintId;
use thiserror::Error;

/// Errors the constraint model and composition engine can return.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConstraintError {
    /// Input violates a stated invariant (blank title, out-of-range priority,
    /// empty reminders, duplicate id on admission).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Resolver lookup missed an id.
    #[error("constraint not found: {0}")]
    ConstraintNotFound(ConstraintId),

    /// Defensive cycle detection fired during resolution.
    #[error("circular reference: {}", chain.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(" -> "))]
    CircularReference { chain: Vec<ConstraintId> },

    /// A composite was admitted (or would be) with references that do not
    /// resolve within the library.
    #[error("unresolved constraint references: {}", missing.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", "))]
    ConstraintReferenceValidation { missing: Vec<ConstraintId> },

    /// Removal of a constraint still referenced by another.
    #[error("constraint {id} is still referenced by: {}", referers.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", "))]
    ConstraintInUse {
        id: ConstraintId,
        referers: Vec<ConstraintId>,
    },

    /// Sequential composition observed a forbidden state transition.
    #[error("invalid workflow transition from {from} to {to}")]
    InvalidWorkflowTransition { from: String, to: String },

    /// Progressive `try_skip` rejected a requested level jump.
    #[error("skip rejected: {0:?}")]
    SkipFailure(SkipFailureReason),
}

/// Why a progressive-level skip was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipFailureReason {
    /// Target level is not greater than the current one, or out of [1,6].
    InvalidTargetLevel,
    /// Levels below the target have not all been completed (or aren't current).
    MissingPrerequisites,
    /// Target is more than one level ahead of current; multi-step skips are
    /// never permitted regardless of what's been completed.
    SystematicProgressionRequired,
}

pub type Result<T> = std::result::Result<T, ConstraintError>;
