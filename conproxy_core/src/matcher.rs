//! Trigger matcher: scores constraints against a context and selects the
//! top-K activations.

use crate::activation::{ActivationReason, ConstraintActivation};
use crate::constraint::Constraint;
use crate::context::TriggerContext;
use chrono::Utc;

const KEYWORD_WEIGHT: f64 = 0.4;
const FILE_PATTERN_WEIGHT: f64 = 0.3;
const CONTEXT_PATTERN_WEIGHT: f64 = 0.3;

/// An extension point for nudging a raw score up (or down) based on
/// constraint/context specifics beyond the three scoring axes. Strategies
/// are applied in declaration order and the result is clamped to `[0, 1]`.
pub trait ConfidenceBoostStrategy {
    fn applies_to(&self, constraint: &Constraint, context: &TriggerContext) -> bool;
    fn apply_boost(&self, score: f64) -> f64;
}

/// Boosts constraints whose context overlaps a small set of TDD-flavoured
/// keywords.
pub struct TddKeywordBoost {
    pub keywords: Vec<String>,
    pub delta: f64,
}

impl Default for TddKeywordBoost {
    fn default() -> Self {
        Self {
            keywords: vec![
                "red".into(),
                "green".into(),
                "tdd".into(),
                "test-first".into(),
                "failing".into(),
            ],
            delta: 0.05,
        }
    }
}

impl ConfidenceBoostStrategy for TddKeywordBoost {
    fn applies_to(&self, _constraint: &Constraint, context: &TriggerContext) -> bool {
        let joined = context.joined_keywords_lowercase();
        self.keywords.iter().any(|k| joined.contains(k.as_str()))
    }

    fn apply_boost(&self, score: f64) -> f64 {
        score + self.delta
    }
}

/// Score and rank constraints against a `TriggerContext`.
pub struct TriggerMatcher {
    boosts: Vec<Box<dyn ConfidenceBoostStrategy>>,
    pub max_active_constraints: usize,
}

impl TriggerMatcher {
    pub fn new(max_active_constraints: usize) -> Self {
        Self {
            boosts: Vec::new(),
            max_active_constraints,
        }
    }

    pub fn with_boost(mut self, boost: Box<dyn ConfidenceBoostStrategy>) -> Self {
        self.boosts.push(boost);
        self
    }

    /// Score a single constraint against a context. Returns `None` if the
    /// constraint does not activate (score is zero, or below its
    /// confidence threshold).
    pub fn score(&self, constraint: &Constraint, context: &TriggerContext) -> Option<ConstraintActivation> {
        let trigger = constraint.trigger();

        if trigger.anti_pattern_matches(
            &context.keywords,
            context.context_type.map(|c| c.as_str()),
        ) {
            return None;
        }

        let mut axes_present = 0u32;
        let mut weighted_sum = 0.0;
        let mut nonzero_axes = 0u32;
        let mut single_axis_reason = ActivationReason::Unknown;

        if !trigger.is_empty_axis_keywords() {
            axes_present += 1;
            let joined = context.joined_keywords_lowercase();
            let matched = trigger
                .keywords
                .iter()
                .filter(|k| joined.contains(&k.to_lowercase()))
                .count();
            let component = matched as f64 / trigger.keywords.len() as f64;
            weighted_sum += component * KEYWORD_WEIGHT;
            if component > 0.0 {
                nonzero_axes += 1;
                single_axis_reason = ActivationReason::KeywordMatch;
            }
        }

        if !trigger.is_empty_axis_file_patterns() {
            axes_present += 1;
            let matched = context
                .file_path
                .as_deref()
                .map(|p| trigger.file_pattern_matches(p))
                .unwrap_or(false);
            let component = if matched { 1.0 } else { 0.0 };
            weighted_sum += component * FILE_PATTERN_WEIGHT;
            if component > 0.0 {
                nonzero_axes += 1;
                single_axis_reason = ActivationReason::FilePatternMatch;
            }
        }

        if !trigger.is_empty_axis_context_patterns() {
            axes_present += 1;
            let matched = context
                .context_type
                .map(|c| trigger.context_patterns.contains(c.as_str()))
                .unwrap_or(false);
            let component = if matched { 1.0 } else { 0.0 };
            weighted_sum += component * CONTEXT_PATTERN_WEIGHT;
            if component > 0.0 {
                nonzero_axes += 1;
                single_axis_reason = ActivationReason::ContextPatternMatch;
            }
        }

        if axes_present == 0 {
            return None;
        }

        let mut score = weighted_sum / axes_present as f64;

        for boost in &self.boosts {
            if boost.applies_to(constraint, context) {
                score = boost.apply_boost(score);
            }
        }
        score = score.clamp(0.0, 1.0);

        if score <= 0.0 || score < trigger.confidence_threshold {
            return None;
        }

        let reason = if nonzero_axes > 1 {
            ActivationReason::CombinedFactors
        } else {
            single_axis_reason
        };

        Some(ConstraintActivation {
            id: constraint.id().clone(),
            score,
            priority: constraint.priority(),
            reason,
            layer_or_step: None,
            guidance: constraint.title().to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Score every constraint and return the top-K activations, ordered by
    /// score descending.
    pub fn top_k<'a>(
        &self,
        constraints: impl Iterator<Item = &'a Constraint>,
        context: &TriggerContext,
    ) -> Vec<ConstraintActivation> {
        let mut activations: Vec<ConstraintActivation> = constraints
            .filter_map(|c| self.score(c, context))
            .collect();
        activations.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap()
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        activations.truncate(self.max_active_constraints);
        activations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::AtomicConstraint;
    use crate::context::ContextType;
    use crate::ids::{ConstraintId, Priority};
    use crate::trigger::TriggerConfiguration;
    use chrono::DateTime;
    use std::collections::BTreeMap;

    fn ctx(keywords: &[&str], file_path: Option<&str>, context_type: Option<ContextType>) -> TriggerContext {
        TriggerContext {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            file_path: file_path.map(|s| s.to_string()),
            context_type,
            metadata: BTreeMap::new(),
            timestamp: DateTime::parse_from_rfc3339("2026-08-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            session_id: None,
        }
    }

    fn atomic_with_trigger(name: &str, trigger: TriggerConfiguration) -> Constraint {
        Constraint::Atomic(
            AtomicConstraint::new(
                ConstraintId::new(name).unwrap(),
                format!("Title {name}"),
                Priority::new(0.9).unwrap(),
                trigger,
                vec!["Write the test first.".into()],
                None,
            )
            .unwrap(),
        )
    }

    #[test]
    fn empty_keywords_and_file_path_yield_zero_relevance() {
        let trigger = TriggerConfiguration {
            keywords: ["refactor".to_string()].into_iter().collect(),
            confidence_threshold: 0.1,
            ..Default::default()
        };
        let constraint = atomic_with_trigger("a", trigger);
        let matcher = TriggerMatcher::new(2);
        let context = ctx(&[], None, None);
        assert!(matcher.score(&constraint, &context).is_none());
    }

    #[test]
    fn anti_pattern_forces_zero_score() {
        let mut trigger = TriggerConfiguration {
            keywords: ["test".to_string()].into_iter().collect(),
            confidence_threshold: 0.1,
            ..Default::default()
        };
        trigger.anti_patterns = Some(["refactor".to_string()].into_iter().collect());
        let constraint = atomic_with_trigger("a", trigger);
        let matcher = TriggerMatcher::new(2);
        let context = ctx(&["test", "refactor"], None, None);
        assert!(matcher.score(&constraint, &context).is_none());
    }

    #[test]
    fn combined_factors_reason_when_multiple_axes_hit() {
        let trigger = TriggerConfiguration {
            keywords: ["test".to_string()].into_iter().collect(),
            file_patterns: ["*_test.rs".to_string()].into_iter().collect(),
            confidence_threshold: 0.1,
            ..Default::default()
        };
        let constraint = atomic_with_trigger("a", trigger);
        let matcher = TriggerMatcher::new(2);
        let context = ctx(&["test"], Some("foo_test.rs"), None);
        let activation = matcher.score(&constraint, &context).unwrap();
        assert_eq!(activation.reason, ActivationReason::CombinedFactors);
    }

    #[test]
    fn top_k_orders_by_score_descending_and_truncates() {
        let high = atomic_with_trigger(
            "high",
            TriggerConfiguration {
                keywords: ["test".to_string()].into_iter().collect(),
                confidence_threshold: 0.1,
                ..Default::default()
            },
        );
        let low = atomic_with_trigger(
            "low",
            TriggerConfiguration {
                keywords: ["test".to_string(), "other".to_string()].into_iter().collect(),
                confidence_threshold: 0.1,
                ..Default::default()
            },
        );
        let matcher = TriggerMatcher::new(1);
        let context = ctx(&["test"], None, None);
        let constraints = vec![low, high];
        let top = matcher.top_k(constraints.iter(), &context);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id.as_str(), "high");
    }

    #[test]
    fn tied_score_breaks_on_priority_then_id() {
        let trigger = TriggerConfiguration {
            keywords: ["test".to_string()].into_iter().collect(),
            confidence_threshold: 0.1,
            ..Default::default()
        };
        let a = Constraint::Atomic(
            AtomicConstraint::new(
                ConstraintId::new("a").unwrap(),
                "Title a".to_string(),
                Priority::new(0.95).unwrap(),
                trigger.clone(),
                vec!["Write the test first.".into()],
                None,
            )
            .unwrap(),
        );
        let b = Constraint::Atomic(
            AtomicConstraint::new(
                ConstraintId::new("b").unwrap(),
                "Title b".to_string(),
                Priority::new(0.8).unwrap(),
                trigger,
                vec!["Write the test first.".into()],
                None,
            )
            .unwrap(),
        );
        let matcher = TriggerMatcher::new(1);
        let context = ctx(&["test"], None, None);
        let constraints = vec![b, a];
        let top = matcher.top_k(constraints.iter(), &context);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id.as_str(), "a");
    }

    #[test]
    fn tdd_boost_raises_score_within_bounds() {
        let trigger = TriggerConfiguration {
            keywords: ["failing".to_string()].into_iter().collect(),
            confidence_threshold: 0.1,
            ..Default::default()
        };
        let constraint = atomic_with_trigger("a", trigger);
        let matcher = TriggerMatcher::new(2).with_boost(Box::new(TddKeywordBoost::default()));
        let context = ctx(&["failing", "red"], None, None);
        let activation = matcher.score(&constraint, &context).unwrap();
        assert!(activation.score <= 1.0);
        assert!(activation.score > 0.0);
    }
}
