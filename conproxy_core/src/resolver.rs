//! Constraint resolver: expands composite references into fully materialised
//! constraints, with a memoisation cache and resolution-time metrics.
//!
//! The source resolves composites by walking object references directly.
//! We re-architect that around an arena (the `ConstraintLibrary`) that owns
//! every constraint by value and hands out `ConstraintId` references; the
//! resolver expands those references on demand and remembers what it built.

use crate::constraint::{Constraint, CompositionType};
use crate::error::{ConstraintError, Result};
use crate::ids::{ConstraintId, Priority};
use crate::library::ConstraintLibrary;
use crate::trigger::TriggerConfiguration;
use serde_json::Map;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A constraint with every composite reference recursively expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConstraint {
    pub id: ConstraintId,
    pub title: String,
    pub priority: Priority,
    pub trigger: TriggerConfiguration,
    pub kind: ResolvedKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKind {
    Atomic {
        reminders: Vec<String>,
        metadata: Option<Map<String, serde_json::Value>>,
    },
    Composite {
        composition: CompositionType,
        components: Vec<ResolvedConstraint>,
    },
}

/// Point-in-time snapshot of the resolver's performance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolverMetrics {
    pub total_resolutions: u64,
    pub cache_hit_rate: f64,
    pub avg_resolution_time: Duration,
    pub peak_resolution_time: Duration,
}

const MAX_RESOLUTION_DEPTH: usize = 64;

/// Resolves constraints against a library, caching materialised results.
pub struct Resolver<'lib> {
    library: &'lib ConstraintLibrary,
    cache: RefCell<HashMap<ConstraintId, ResolvedConstraint>>,
    total_resolutions: RefCell<u64>,
    cache_hits: RefCell<u64>,
    total_time: RefCell<Duration>,
    peak_time: RefCell<Duration>,
}

impl<'lib> Resolver<'lib> {
    pub fn new(library: &'lib ConstraintLibrary) -> Self {
        Self {
            library,
            cache: RefCell::new(HashMap::new()),
            total_resolutions: RefCell::new(0),
            cache_hits: RefCell::new(0),
            total_time: RefCell::new(Duration::ZERO),
            peak_time: RefCell::new(Duration::ZERO),
        }
    }

    /// Resolve `id` into a fully materialised constraint. Subsequent calls
    /// for the same id return the cached instance.
    pub fn resolve(&self, id: &ConstraintId) -> Result<ResolvedConstraint> {
        *self.total_resolutions.borrow_mut() += 1;

        if let Some(hit) = self.cache.borrow().get(id) {
            *self.cache_hits.borrow_mut() += 1;
            return Ok(hit.clone());
        }

        let start = Instant::now();
        let mut visiting = Vec::new();
        let resolved = self.resolve_inner(id, &mut visiting)?;
        let elapsed = start.elapsed();

        *self.total_time.borrow_mut() += elapsed;
        if elapsed > *self.peak_time.borrow() {
            *self.peak_time.borrow_mut() = elapsed;
        }

        self.cache.borrow_mut().insert(id.clone(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_inner(
        &self,
        id: &ConstraintId,
        visiting: &mut Vec<ConstraintId>,
    ) -> Result<ResolvedConstraint> {
        if visiting.len() > MAX_RESOLUTION_DEPTH {
            let mut chain = visiting.clone();
            chain.push(id.clone());
            return Err(ConstraintError::CircularReference { chain });
        }
        if visiting.contains(id) {
            let mut chain = visiting.clone();
            chain.push(id.clone());
            return Err(ConstraintError::CircularReference { chain });
        }

        let constraint = self
            .library
            .get(id)
            .ok_or_else(|| ConstraintError::ConstraintNotFound(id.clone()))?;

        match constraint {
            Constraint::Atomic(a) => Ok(ResolvedConstraint {
                id: a.id,
                title: a.title,
                priority: a.priority,
                trigger: a.trigger,
                kind: ResolvedKind::Atomic {
                    reminders: a.reminders,
                    metadata: a.metadata,
                },
            }),
            Constraint::Composite(c) => {
                visiting.push(id.clone());
                let mut components = Vec::with_capacity(c.components.len());
                for reference in &c.components {
                    if let Some(cached) = self.cache.borrow().get(&reference.0) {
                        components.push(cached.clone());
                        continue;
                    }
                    components.push(self.resolve_inner(&reference.0, visiting)?);
                }
                visiting.pop();

                Ok(ResolvedConstraint {
                    id: c.id,
                    title: c.title,
                    priority: c.priority,
                    trigger: c.trigger,
                    kind: ResolvedKind::Composite {
                        composition: c.composition,
                        components,
                    },
                })
            }
        }
    }

    /// Current resolver performance metrics.
    pub fn metrics(&self) -> ResolverMetrics {
        let total = *self.total_resolutions.borrow();
        let hits = *self.cache_hits.borrow();
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        let misses = total.saturating_sub(hits);
        let avg = if misses == 0 {
            Duration::ZERO
        } else {
            *self.total_time.borrow() / misses as u32
        };
        ResolverMetrics {
            total_resolutions: total,
            cache_hit_rate: hit_rate,
            avg_resolution_time: avg,
            peak_resolution_time: *self.peak_time.borrow(),
        }
    }
}

/// Recursively flatten a `ResolvedConstraint` into its atomic leaves, in
/// depth-first order. Used by the composition engine to enumerate the full
/// set of reminder strings a composite ultimately contributes.
pub fn flatten_leaves(resolved: &ResolvedConstraint) -> Vec<&ResolvedConstraint> {
    match &resolved.kind {
        ResolvedKind::Atomic { .. } => vec![resolved],
        ResolvedKind::Composite { components, .. } => {
            components.iter().flat_map(flatten_leaves).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{AtomicConstraint, CompositeConstraint, ConstraintReference};
    use crate::trigger::TriggerConfiguration;

    fn id(s: &str) -> ConstraintId {
        ConstraintId::new(s).unwrap()
    }

    fn atomic(name: &str) -> AtomicConstraint {
        AtomicConstraint::new(
            id(name),
            format!("Title {name}"),
            Priority::new(0.5).unwrap(),
            TriggerConfiguration::default(),
            vec![format!("Reminder for {name}")],
            None,
        )
        .unwrap()
    }

    #[test]
    fn resolve_atomic_round_trips() {
        let mut lib = ConstraintLibrary::new("1", "test");
        let a = atomic("a");
        lib.add_atomic(a.clone()).unwrap();
        let resolver = Resolver::new(&lib);
        let resolved = resolver.resolve(&id("a")).unwrap();
        assert_eq!(resolved.id, a.id);
        assert_eq!(resolved.title, a.title);
        match resolved.kind {
            ResolvedKind::Atomic { reminders, .. } => assert_eq!(reminders, a.reminders),
            _ => panic!("expected atomic"),
        }
    }

    #[test]
    fn resolve_composite_expands_components_and_caches() {
        let mut lib = ConstraintLibrary::new("1", "test");
        lib.add_atomic(atomic("a")).unwrap();
        lib.add_atomic(atomic("b")).unwrap();
        let composite = CompositeConstraint::new(
            id("c"),
            "Composite",
            Priority::new(0.6).unwrap(),
            TriggerConfiguration::default(),
            CompositionType::Sequential,
            vec![ConstraintReference(id("a")), ConstraintReference(id("b"))],
        )
        .unwrap();
        lib.add_composite(composite).unwrap();

        let resolver = Resolver::new(&lib);
        let resolved = resolver.resolve(&id("c")).unwrap();
        match &resolved.kind {
            ResolvedKind::Composite { components, .. } => assert_eq!(components.len(), 2),
            _ => panic!("expected composite"),
        }

        resolver.resolve(&id("c")).unwrap();
        let metrics = resolver.metrics();
        assert_eq!(metrics.total_resolutions, 2);
        assert!(metrics.cache_hit_rate > 0.0);
    }

    #[test]
    fn resolve_missing_id_errors() {
        let lib = ConstraintLibrary::new("1", "test");
        let resolver = Resolver::new(&lib);
        assert!(matches!(
            resolver.resolve(&id("nope")),
            Err(ConstraintError::ConstraintNotFound(_))
        ));
    }

    #[test]
    fn flatten_leaves_collects_atomics_only() {
        let mut lib = ConstraintLibrary::new("1", "test");
        lib.add_atomic(atomic("a")).unwrap();
        lib.add_atomic(atomic("b")).unwrap();
        let composite = CompositeConstraint::new(
            id("c"),
            "Composite",
            Priority::new(0.6).unwrap(),
            TriggerConfiguration::default(),
            CompositionType::Layered,
            vec![ConstraintReference(id("a")), ConstraintReference(id("b"))],
        )
        .unwrap();
        lib.add_composite(composite).unwrap();
        let resolver = Resolver::new(&lib);
        let resolved = resolver.resolve(&id("c")).unwrap();
        assert_eq!(flatten_leaves(&resolved).len(), 2);
    }
}
