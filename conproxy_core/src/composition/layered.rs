//! Layered composition: Clean-Architecture-style layer hierarchies with
//! dependency-violation detection.

use super::NextOutcome;
use crate::activation::{ActivationReason, ConstraintActivation};
use crate::context::TriggerContext;
use crate::ids::{ConstraintId, Priority};
use chrono::Utc;
use std::collections::HashSet;

/// One layer in a user-defined hierarchy, e.g. Domain(0), Application(1).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDefinition {
    pub id: ConstraintId,
    pub level: u32,
    pub name: String,
    pub allowed_dependency_levels: HashSet<u32>,
    pub namespace_patterns: Vec<String>,
}

/// A detected dependency that the source layer isn't permitted to make.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerViolation {
    pub source_namespace: String,
    pub target_namespace: String,
    pub source_level: u32,
    pub target_level: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayeredState {
    pub completed: HashSet<u32>,
    pub current: u32,
    pub violations: Vec<LayerViolation>,
}

/// Map a namespace to the layer whose namespace pattern matches it with the
/// longest prefix. A pattern matches when the namespace equals it or starts
/// with `pattern` followed by a `.` separator.
fn layer_for_namespace<'a>(
    universe: &'a [LayerDefinition],
    namespace: &str,
) -> Option<&'a LayerDefinition> {
    universe
        .iter()
        .filter_map(|layer| {
            layer
                .namespace_patterns
                .iter()
                .filter(|pattern| {
                    namespace == pattern.as_str()
                        || namespace.starts_with(&format!("{pattern}."))
                })
                .map(|pattern| pattern.len())
                .max()
                .map(|len| (len, layer))
        })
        .max_by_key(|(len, _)| *len)
        .map(|(_, layer)| layer)
}

/// Dependency pairs pulled out of the context's metadata, under the key
/// `"dependencies"`: a JSON array of `[source_namespace, target_namespace]`
/// pairs produced by upstream code analysis.
fn dependencies_from_context(context: &TriggerContext) -> Vec<(String, String)> {
    let Some(value) = context.metadata.get("dependencies") else {
        return Vec::new();
    };
    let Some(array) = value.as_array() else {
        return Vec::new();
    };
    array
        .iter()
        .filter_map(|pair| {
            let pair = pair.as_array()?;
            let source = pair.first()?.as_str()?.to_string();
            let target = pair.get(1)?.as_str()?.to_string();
            Some((source, target))
        })
        .collect()
}

fn find_violation(
    universe: &[LayerDefinition],
    context: &TriggerContext,
) -> Option<LayerViolation> {
    for (source_ns, target_ns) in dependencies_from_context(context) {
        let Some(source_layer) = layer_for_namespace(universe, &source_ns) else {
            continue;
        };
        let Some(target_layer) = layer_for_namespace(universe, &target_ns) else {
            continue;
        };
        if !source_layer
            .allowed_dependency_levels
            .contains(&target_layer.level)
        {
            return Some(LayerViolation {
                source_namespace: source_ns,
                target_namespace: target_ns,
                source_level: source_layer.level,
                target_level: target_layer.level,
            });
        }
    }
    None
}

pub fn next(
    state: &LayeredState,
    universe: &[LayerDefinition],
    context: &TriggerContext,
) -> NextOutcome {
    if let Some(violation) = find_violation(universe, context) {
        let id = ConstraintId::new(format!(
            "arch.violation.layer-{}-to-{}",
            violation.source_level, violation.target_level
        ))
        .expect("formatted id is non-empty");

        let source_name = universe
            .iter()
            .find(|l| l.level == violation.source_level)
            .map(|l| l.name.as_str())
            .unwrap_or(&violation.source_namespace);
        let target_name = universe
            .iter()
            .find(|l| l.level == violation.target_level)
            .map(|l| l.name.as_str())
            .unwrap_or(&violation.target_namespace);

        return NextOutcome::Activation(ConstraintActivation {
            id,
            score: 1.0,
            priority: Priority::new(1.0).expect("1.0 is a valid priority"),
            reason: ActivationReason::ArchitecturalViolation,
            layer_or_step: Some(format!(
                "layer {} -> layer {}",
                violation.source_level, violation.target_level
            )),
            guidance: format!(
                "{} must not depend on {} ({} -> {})",
                source_name, target_name, violation.source_namespace, violation.target_namespace
            ),
            timestamp: Utc::now(),
        });
    }

    let mut remaining: Vec<&LayerDefinition> = universe
        .iter()
        .filter(|l| !state.completed.contains(&l.level))
        .collect();
    remaining.sort_by_key(|l| l.level);

    match remaining.into_iter().next() {
        None => NextOutcome::Complete {
            message: "All layers completed with no violations.".to_string(),
        },
        Some(layer) => NextOutcome::Activation(ConstraintActivation {
            id: layer.id.clone(),
            score: 1.0,
            priority: Priority::new(1.0).expect("1.0 is a valid priority"),
            reason: ActivationReason::CompositionNext,
            layer_or_step: Some(format!("layer {} ({})", layer.level, layer.name)),
            guidance: format!("Work within the {} layer (level {})", layer.name, layer.level),
            timestamp: Utc::now(),
        }),
    }
}

pub fn advance(state: &mut LayeredState, layer_level: u32, violations: Vec<LayerViolation>) {
    state.completed.insert(layer_level);
    state.current = layer_level;
    state.violations.extend(violations);
}
