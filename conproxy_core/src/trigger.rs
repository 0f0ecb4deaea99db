//! Per-constraint trigger configuration and the glob matcher it relies on.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-constraint bundle describing when a constraint is eligible to fire.
/// Every collection may be empty; an empty collection means "no constraint
/// along this axis".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfiguration {
    pub keywords: HashSet<String>,
    pub file_patterns: HashSet<String>,
    pub context_patterns: HashSet<String>,
    #[serde(default)]
    pub anti_patterns: Option<HashSet<String>>,
    pub confidence_threshold: f64,
}

impl TriggerConfiguration {
    pub fn is_empty_axis_keywords(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn is_empty_axis_file_patterns(&self) -> bool {
        self.file_patterns.is_empty()
    }

    pub fn is_empty_axis_context_patterns(&self) -> bool {
        self.context_patterns.is_empty()
    }

    /// Does any file pattern on this axis match `path`?
    pub fn file_pattern_matches(&self, path: &str) -> bool {
        self.file_patterns
            .iter()
            .any(|pattern| glob_match(pattern, path))
    }

    /// Does any anti-pattern match the given keywords or context type?
    pub fn anti_pattern_matches(&self, keywords: &[String], context_type: Option<&str>) -> bool {
        let Some(anti) = &self.anti_patterns else {
            return false;
        };
        if anti.is_empty() {
            return false;
        }
        anti.iter().any(|pattern| {
            let lower = pattern.to_lowercase();
            keywords.iter().any(|k| k.to_lowercase() == lower)
                || context_type.map(|c| c.to_lowercase() == lower).unwrap_or(false)
        })
    }
}

/// Match `path` against `pattern`, supporting three shapes:
/// - `*suffix` — path ends with `suffix`
/// - `prefix*` — path starts with `prefix`
/// - `pre*post` — a single embedded `*`, path starts with `pre` and ends with `post`
/// - no `*` at all — exact match
fn glob_match(pattern: &str, path: &str) -> bool {
    match pattern.matches('*').count() {
        0 => pattern == path,
        1 => {
            let star = pattern.find('*').unwrap();
            let (prefix, rest) = pattern.split_at(star);
            let suffix = &rest[1..];
            path.starts_with(prefix) && path.ends_with(suffix) && path.len() >= prefix.len() + suffix.len()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_prefix_star() {
        assert!(glob_match("src/*", "src/main.rs"));
        assert!(!glob_match("src/*", "lib/main.rs"));
    }

    #[test]
    fn glob_suffix_star() {
        assert!(glob_match("*_test.rs", "foo_test.rs"));
        assert!(!glob_match("*_test.rs", "foo_tests.rs"));
    }

    #[test]
    fn glob_embedded_star() {
        assert!(glob_match("src/*.rs", "src/main.rs"));
        assert!(!glob_match("src/*.rs", "src/main.py"));
        assert!(!glob_match("src/*.rs", "src/nested/main.rs"));
    }

    #[test]
    fn glob_exact() {
        assert!(glob_match("Cargo.toml", "Cargo.toml"));
        assert!(!glob_match("Cargo.toml", "cargo.toml"));
    }

    #[test]
    fn anti_pattern_matches_keyword_or_context_type() {
        let mut cfg = TriggerConfiguration {
            confidence_threshold: 0.5,
            ..Default::default()
        };
        cfg.anti_patterns = Some(["refactor".to_string()].into_iter().collect());
        assert!(cfg.anti_pattern_matches(&["refactor".to_string()], None));
        assert!(cfg.anti_pattern_matches(&[], Some("refactor")));
        assert!(!cfg.anti_pattern_matches(&["testing".to_string()], Some("feature_development")));
    }
}
