//! Atomic and composite constraint entities.
//!
//! The source this system was distilled from models constraints through an
//! interface hierarchy (`IConstraint` with atomic/composite subclasses). We
//! re-architect that as a tagged variant: functions that need "any
//! constraint" pattern-match on `Constraint` instead of dispatching through a
//! trait object.

use crate::error::{ConstraintError, Result};
use crate::ids::{ConstraintId, Priority};
use crate::trigger::TriggerConfiguration;
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// A constraint reference inside a composite holds only an id; resolving it
/// into a concrete component is the resolver's job, not the model's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReference(pub ConstraintId);

/// Closed sum of ways several constraints can cooperate to form a
/// methodology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionType {
    Sequential,
    Hierarchical,
    Progressive,
    Layered,
}

/// A single, indivisible constraint: an id, a title, a priority, a trigger
/// configuration, and the reminders it injects when active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicConstraint {
    pub id: ConstraintId,
    pub title: String,
    pub priority: Priority,
    pub trigger: TriggerConfiguration,
    pub reminders: Vec<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, serde_json::Value>>,
}

impl AtomicConstraint {
    pub fn new(
        id: ConstraintId,
        title: impl Into<String>,
        priority: Priority,
        trigger: TriggerConfiguration,
        reminders: Vec<String>,
        metadata: Option<Map<String, serde_json::Value>>,
    ) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ConstraintError::Validation(format!(
                "constraint {id} has a blank title"
            )));
        }
        if reminders.is_empty() {
            return Err(ConstraintError::Validation(format!(
                "constraint {id} has no reminders"
            )));
        }
        if reminders.iter().any(|r| r.trim().is_empty()) {
            return Err(ConstraintError::Validation(format!(
                "constraint {id} has a blank reminder"
            )));
        }
        Ok(Self {
            id,
            title,
            priority,
            trigger,
            reminders,
            metadata,
        })
    }
}

/// A constraint composed from other constraints via a `CompositionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeConstraint {
    pub id: ConstraintId,
    pub title: String,
    pub priority: Priority,
    pub trigger: TriggerConfiguration,
    pub composition: CompositionType,
    pub components: Vec<ConstraintReference>,
}

impl CompositeConstraint {
    pub fn new(
        id: ConstraintId,
        title: impl Into<String>,
        priority: Priority,
        trigger: TriggerConfiguration,
        composition: CompositionType,
        components: Vec<ConstraintReference>,
    ) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ConstraintError::Validation(format!(
                "constraint {id} has a blank title"
            )));
        }
        if components.is_empty() {
            return Err(ConstraintError::Validation(format!(
                "composite {id} has no component references"
            )));
        }
        Ok(Self {
            id,
            title,
            priority,
            trigger,
            composition,
            components,
        })
    }
}

/// Any constraint, atomic or composite.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Atomic(AtomicConstraint),
    Composite(CompositeConstraint),
}

impl Constraint {
    pub fn id(&self) -> &ConstraintId {
        match self {
            Constraint::Atomic(c) => &c.id,
            Constraint::Composite(c) => &c.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Constraint::Atomic(c) => &c.title,
            Constraint::Composite(c) => &c.title,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Constraint::Atomic(c) => c.priority,
            Constraint::Composite(c) => c.priority,
        }
    }

    pub fn trigger(&self) -> &TriggerConfiguration {
        match self {
            Constraint::Atomic(c) => &c.trigger,
            Constraint::Composite(c) => &c.trigger,
        }
    }
}
