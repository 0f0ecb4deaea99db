//! Hierarchical composition: a pure ordering over `(id, level, priority)`
//! triples. Stateless by design — `advance` is a no-op, `next` always
//! re-derives from `order()` plus whatever has already activated.

use super::NextOutcome;
use crate::activation::{ActivationReason, ConstraintActivation};
use crate::context::TriggerContext;
use crate::ids::{ConstraintId, Priority};
use chrono::Utc;
use std::collections::HashSet;

/// One entry in a hierarchical universe.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalEntry {
    pub id: ConstraintId,
    pub level: u32,
    pub priority: Priority,
}

/// Tracks which hierarchical entries have already been activated, purely so
/// `next` doesn't repeat itself within a session — this is bookkeeping, not
/// strategy state, per the "stateless" design decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchicalState {
    pub activated: HashSet<ConstraintId>,
}

/// Sort entries first by ascending level, then by descending priority
/// within each level.
pub fn order(universe: &[HierarchicalEntry]) -> Vec<&HierarchicalEntry> {
    let mut sorted: Vec<&HierarchicalEntry> = universe.iter().collect();
    sorted.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| b.priority.cmp(&a.priority))
    });
    sorted
}

pub fn next(
    state: &HierarchicalState,
    universe: &[HierarchicalEntry],
    context: &TriggerContext,
) -> NextOutcome {
    match order(universe).into_iter().find(|e| !state.activated.contains(&e.id)) {
        None => NextOutcome::Complete {
            message: "All hierarchical levels activated.".to_string(),
        },
        Some(entry) => NextOutcome::Activation(ConstraintActivation {
            id: entry.id.clone(),
            score: entry.priority.value(),
            priority: entry.priority,
            reason: ActivationReason::CompositionNext,
            layer_or_step: Some(format!("level {}", entry.level)),
            guidance: format!(
                "Level {} constraint, context: context_type={}",
                entry.level,
                context.context_type.map(|c| c.as_str()).unwrap_or("unknown")
            ),
            timestamp: Utc::now(),
        }),
    }
}

/// No-op: hierarchical ordering has no progression state beyond `activated`.
pub fn advance(_state: &mut HierarchicalState, _activation: &ConstraintActivation) {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::collections::BTreeMap;

    fn entry(id: &str, level: u32, priority: f64) -> HierarchicalEntry {
        HierarchicalEntry {
            id: ConstraintId::new(id).unwrap(),
            level,
            priority: Priority::new(priority).unwrap(),
        }
    }

    fn ctx() -> TriggerContext {
        TriggerContext {
            keywords: vec![],
            file_path: None,
            context_type: None,
            metadata: BTreeMap::new(),
            timestamp: DateTime::parse_from_rfc3339("2026-08-01T00:00:00Z").unwrap().with_timezone(&Utc),
            session_id: None,
        }
    }

    #[test]
    fn orders_by_level_then_priority_descending() {
        let universe = vec![
            entry("a", 1, 0.5),
            entry("b", 0, 0.9),
            entry("c", 0, 0.95),
        ];
        let ordered: Vec<&str> = order(&universe).into_iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ordered, vec!["c", "b", "a"]);
    }

    #[test]
    fn next_skips_already_activated() {
        let universe = vec![entry("a", 0, 0.5), entry("b", 0, 0.9)];
        let mut state = HierarchicalState::default();
        state.activated.insert(ConstraintId::new("b").unwrap());
        match next(&state, &universe, &ctx()) {
            NextOutcome::Activation(a) => assert_eq!(a.id.as_str(), "a"),
            _ => panic!("expected activation"),
        }
    }
}
