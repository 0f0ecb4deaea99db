//! Domain model, scheduling, context analysis, trigger matching, and the
//! composition engine for the constraint-reinforcement proxy. No I/O, no MCP
//! framing — this crate is a pure library consumed by `conproxy_mcp`.

pub mod activation;
pub mod composition;
pub mod constraint;
pub mod context;
pub mod error;
pub mod ids;
pub mod library;
pub mod matcher;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod trigger;

pub use activation::{ActivationReason, ConstraintActivation};
pub use constraint::{
    AtomicConstraint, CompositeConstraint, CompositionType, Constraint, ConstraintReference,
};
pub use context::{ContextAnalyser, ContextType, TriggerContext};
pub use error::{ConstraintError, Result, SkipFailureReason};
pub use ids::{ConstraintId, Priority, UserDefinedContext};
pub use library::ConstraintLibrary;
pub use matcher::{ConfidenceBoostStrategy, TddKeywordBoost, TriggerMatcher};
pub use resolver::{ResolvedConstraint, ResolvedKind, Resolver, ResolverMetrics};
pub use scheduler::{schedule, Decision, SchedulerConfig};
pub use session::{Session, WorkflowState};
pub use trigger::TriggerConfiguration;
