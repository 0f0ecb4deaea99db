//! The constraint library: transactional admission, removal, and the
//! reference graph invariants that make resolution safe.

use crate::constraint::{AtomicConstraint, CompositeConstraint, Constraint};
use crate::error::{ConstraintError, Result};
use crate::ids::ConstraintId;
use std::collections::{HashMap, HashSet};

/// A versioned bundle of atomic and composite constraints.
#[derive(Debug, Clone, Default)]
pub struct ConstraintLibrary {
    pub version: String,
    pub description: String,
    atomics: HashMap<ConstraintId, AtomicConstraint>,
    composites: HashMap<ConstraintId, CompositeConstraint>,
}

impl ConstraintLibrary {
    pub fn new(version: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            description: description.into(),
            atomics: HashMap::new(),
            composites: HashMap::new(),
        }
    }

    pub fn contains(&self, id: &ConstraintId) -> bool {
        self.atomics.contains_key(id) || self.composites.contains_key(id)
    }

    pub fn get(&self, id: &ConstraintId) -> Option<Constraint> {
        if let Some(a) = self.atomics.get(id) {
            return Some(Constraint::Atomic(a.clone()));
        }
        self.composites.get(id).map(|c| Constraint::Composite(c.clone()))
    }

    pub fn get_atomic(&self, id: &ConstraintId) -> Option<&AtomicConstraint> {
        self.atomics.get(id)
    }

    pub fn get_composite(&self, id: &ConstraintId) -> Option<&CompositeConstraint> {
        self.composites.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = Constraint> + '_ {
        self.atomics
            .values()
            .cloned()
            .map(Constraint::Atomic)
            .chain(self.composites.values().cloned().map(Constraint::Composite))
    }

    pub fn len(&self) -> usize {
        self.atomics.len() + self.composites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Admit an atomic constraint. Fails if the id is already present (as
    /// either an atomic or a composite).
    pub fn add_atomic(&mut self, constraint: AtomicConstraint) -> Result<()> {
        if self.contains(&constraint.id) {
            return Err(ConstraintError::Validation(format!(
                "duplicate constraint id: {}",
                constraint.id
            )));
        }
        self.atomics.insert(constraint.id.clone(), constraint);
        Ok(())
    }

    /// Admit a composite constraint. Admission is transactional: every
    /// referenced id must already resolve in the library and the resulting
    /// reference graph must remain acyclic, or the library is left
    /// unchanged.
    pub fn add_composite(&mut self, constraint: CompositeConstraint) -> Result<()> {
        if self.contains(&constraint.id) {
            return Err(ConstraintError::Validation(format!(
                "duplicate constraint id: {}",
                constraint.id
            )));
        }

        let missing: Vec<ConstraintId> = constraint
            .components
            .iter()
            .filter(|r| !self.contains(&r.0))
            .map(|r| r.0.clone())
            .collect();
        if !missing.is_empty() {
            return Err(ConstraintError::ConstraintReferenceValidation { missing });
        }

        if let Some(chain) = self.would_cycle(&constraint) {
            return Err(ConstraintError::CircularReference { chain });
        }

        self.composites.insert(constraint.id.clone(), constraint);
        Ok(())
    }

    /// Remove a constraint. Fails if any remaining composite still
    /// references it.
    pub fn remove(&mut self, id: &ConstraintId) -> Result<()> {
        if !self.contains(id) {
            return Err(ConstraintError::ConstraintNotFound(id.clone()));
        }

        let referers: Vec<ConstraintId> = self
            .composites
            .values()
            .filter(|c| c.components.iter().any(|r| &r.0 == id))
            .map(|c| c.id.clone())
            .collect();
        if !referers.is_empty() {
            return Err(ConstraintError::ConstraintInUse {
                id: id.clone(),
                referers,
            });
        }

        self.atomics.remove(id);
        self.composites.remove(id);
        Ok(())
    }

    /// Would admitting `candidate` introduce a cycle in the reference graph
    /// over composites? Returns the offending chain if so.
    fn would_cycle(&self, candidate: &CompositeConstraint) -> Option<Vec<ConstraintId>> {
        // DFS from each direct reference of `candidate`, looking for a path
        // back to `candidate.id`. Only composites carry outgoing edges.
        let mut visiting: HashSet<ConstraintId> = HashSet::new();
        let mut path: Vec<ConstraintId> = vec![candidate.id.clone()];

        fn dfs(
            lib: &ConstraintLibrary,
            target: &ConstraintId,
            current: &ConstraintId,
            visiting: &mut HashSet<ConstraintId>,
            path: &mut Vec<ConstraintId>,
        ) -> Option<Vec<ConstraintId>> {
            if current == target {
                let mut chain = path.clone();
                chain.push(current.clone());
                return Some(chain);
            }
            if !visiting.insert(current.clone()) {
                return None;
            }
            path.push(current.clone());
            let result = if let Some(composite) = lib.composites.get(current) {
                composite.components.iter().find_map(|r| {
                    dfs(lib, target, &r.0, visiting, path)
                })
            } else {
                None
            };
            path.pop();
            result
        }

        for reference in &candidate.components {
            if let Some(chain) = dfs(self, &candidate.id, &reference.0, &mut visiting, &mut path) {
                return Some(chain);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{CompositionType, ConstraintReference};
    use crate::ids::Priority;
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
            vec!["Remember the thing.".into()],
            None,
        )
        .unwrap()
    }

    fn composite(name: &str, refs: &[&str]) -> CompositeConstraint {
        CompositeConstraint::new(
            id(name),
            format!("Composite {name}"),
            Priority::new(0.5).unwrap(),
            TriggerConfiguration::default(),
            CompositionType::Sequential,
            refs.iter().map(|r| ConstraintReference(id(r))).collect(),
        )
        .unwrap()
    }

    #[test]
    fn duplicate_atomic_id_rejected() {
        let mut lib = ConstraintLibrary::new("1", "test");
        lib.add_atomic(atomic("a")).unwrap();
        assert!(lib.add_atomic(atomic("a")).is_err());
    }

    #[test]
    fn composite_with_dangling_reference_rejected_and_unchanged() {
        let mut lib = ConstraintLibrary::new("1", "test");
        let before = lib.len();
        let err = lib.add_composite(composite("c", &["missing"]));
        assert!(matches!(
            err,
            Err(ConstraintError::ConstraintReferenceValidation { .. })
        ));
        assert_eq!(lib.len(), before);
    }

    #[test]
    fn composite_cycle_rejected() {
        let mut lib = ConstraintLibrary::new("1", "test");
        lib.add_atomic(atomic("a")).unwrap();
        lib.add_composite(composite("b", &["a"])).unwrap();
        // c references b, and we try to make b also (transitively) reference c.
        lib.add_composite(composite("c", &["b"])).unwrap();

        // Now attempt to admit a new version of "a" as a composite back to "c" —
        // can't replace "a" directly (duplicate id), so instead prove the guard
        // fires for a fresh composite that would close the loop.
        let cyclic = CompositeConstraint::new(
            id("d"),
            "D",
            Priority::new(0.4).unwrap(),
            TriggerConfiguration::default(),
            CompositionType::Sequential,
            vec![ConstraintReference(id("c")), ConstraintReference(id("d"))],
        )
        .unwrap();
        let err = lib.add_composite(cyclic);
        assert!(matches!(err, Err(ConstraintError::CircularReference { .. })));
    }

    #[test]
    fn remove_fails_while_referenced() {
        let mut lib = ConstraintLibrary::new("1", "test");
        lib.add_atomic(atomic("a")).unwrap();
        lib.add_composite(composite("b", &["a"])).unwrap();
        let err = lib.remove(&id("a"));
        assert!(matches!(err, Err(ConstraintError::ConstraintInUse { .. })));
        lib.remove(&id("b")).unwrap();
        lib.remove(&id("a")).unwrap();
    }
}
