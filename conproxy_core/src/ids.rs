//! Opaque identifiers and validated value types shared across the model.

use crate::error::{ConstraintError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, non-empty constraint identifier. Immutable once constructed, and
/// used as the equality/hash key everywhere a constraint is referenced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintId(String);

impl ConstraintId {
    /// Construct a `ConstraintId`, rejecting an empty or whitespace-only string.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConstraintError::Validation(
                "constraint id must be non-empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ConstraintId> for String {
    fn from(id: ConstraintId) -> Self {
        id.0
    }
}

/// A real number in the closed interval `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(f64);

impl Priority {
    /// Construct a `Priority`, rejecting NaN, infinities, and values outside
    /// `[0.0, 1.0]`.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ConstraintError::Validation(format!(
                "priority {value} is not in [0.0, 1.0]"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// A `(category, value, priority)` cell of the user's workflow taxonomy, e.g.
/// `category="workflow", value="red"`. Two contexts are equal when both
/// strings match case-sensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDefinedContext {
    pub category: String,
    pub value: String,
    pub priority: Priority,
}

impl UserDefinedContext {
    pub fn new(
        category: impl Into<String>,
        value: impl Into<String>,
        priority: Priority,
    ) -> Result<Self> {
        let category = category.into();
        let value = value.into();
        if category.trim().is_empty() || value.trim().is_empty() {
            return Err(ConstraintError::Validation(
                "user-defined context category/value must be non-empty".into(),
            ));
        }
        Ok(Self {
            category,
            value,
            priority,
        })
    }
}
