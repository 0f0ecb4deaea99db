//! Context extraction: turns an MCP tool call or free-form user text into a
//! `TriggerContext` the matcher and composition engine can act on.

use crate::ids::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Hard-coded priority used when a workflow phase is mapped to a
/// `UserDefinedContext`. Left as a constant rather than configuration — see
/// DESIGN.md for why.
pub const PHASE_CONTEXT_PRIORITY: f64 = 0.8;

const KEYWORD_SPLIT_CHARS: &[char] = &[' ', '_', '.', '/', '\\', '-'];

/// Single-label classification of what kind of work a context represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    Refactoring,
    Testing,
    FeatureDevelopment,
    Unknown,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::Refactoring => "refactoring",
            ContextType::Testing => "testing",
            ContextType::FeatureDevelopment => "feature_development",
            ContextType::Unknown => "unknown",
        }
    }
}

/// Immutable snapshot of the signal extracted from one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    pub keywords: Vec<String>,
    pub file_path: Option<String>,
    pub context_type: Option<ContextType>,
    pub metadata: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
}

impl TriggerContext {
    pub fn joined_keywords_lowercase(&self) -> String {
        self.keywords.join(" ").to_lowercase()
    }
}

/// Extracts `TriggerContext` values from tool calls and free-form text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextAnalyser;

impl ContextAnalyser {
    pub fn new() -> Self {
        Self
    }

    /// Build a context from an MCP `tools/call` method name and its
    /// (already-deserialized) positional arguments.
    pub fn analyse_tool_call(
        &self,
        method: &str,
        arguments: &[Value],
        timestamp: DateTime<Utc>,
        session_id: Option<String>,
    ) -> TriggerContext {
        let file_path = arguments
            .iter()
            .find_map(|v| v.as_str())
            .map(|s| s.to_string());

        let mut keywords = method_keywords(method);
        for arg in arguments {
            if let Some(s) = arg.as_str() {
                if s.to_lowercase().contains("session") {
                    continue;
                }
                extend_keywords(&mut keywords, s);
            }
        }

        let context_type = classify(&keywords, file_path.as_deref());

        TriggerContext {
            keywords,
            file_path,
            context_type: Some(context_type),
            metadata: BTreeMap::new(),
            timestamp,
            session_id,
        }
    }

    /// Build a context from free-form user text.
    pub fn analyse_text(
        &self,
        text: &str,
        timestamp: DateTime<Utc>,
        session_id: Option<String>,
    ) -> TriggerContext {
        let mut keywords = Vec::new();
        extend_keywords(&mut keywords, text);
        let context_type = classify(&keywords, None);

        TriggerContext {
            keywords,
            file_path: None,
            context_type: Some(context_type),
            metadata: BTreeMap::new(),
            timestamp,
            session_id,
        }
    }

    /// Map a workflow phase name to its `UserDefinedContext` cell, using the
    /// pack-wide constant priority.
    pub fn phase_context(&self, phase: &str) -> crate::ids::UserDefinedContext {
        crate::ids::UserDefinedContext::new(
            "workflow",
            phase,
            Priority::new(PHASE_CONTEXT_PRIORITY).expect("constant priority is valid"),
        )
        .expect("phase name is validated by the pack loader")
    }
}

/// Lower-case, split on the configured separators, keep tokens longer than
/// two characters, and deduplicate while preserving first-seen order.
fn extend_keywords(out: &mut Vec<String>, input: &str) {
    let lower = input.to_lowercase();
    for token in lower.split(KEYWORD_SPLIT_CHARS) {
        if token.len() > 2 && !out.iter().any(|k| k == token) {
            out.push(token.to_string());
        }
    }
}

/// Method-name keyword extraction: recognise `test`/`create`/`implement`
/// substrings as a priority first keyword, else fall back to the final
/// slash-segment.
fn method_keywords(method: &str) -> Vec<String> {
    let lower = method.to_lowercase();
    let mut keywords = Vec::new();

    for hint in ["test", "create", "implement"] {
        if lower.contains(hint) {
            keywords.push(hint.to_string());
            break;
        }
    }

    let segment = lower.rsplit('/').next().unwrap_or(&lower);
    extend_keywords(&mut keywords, segment);
    keywords
}

fn has_keyword(keywords: &[String], target: &str) -> bool {
    keywords.iter().any(|k| k == target)
}

fn file_path_contains(file_path: Option<&str>, needle: &str) -> bool {
    file_path.map(|p| p.to_lowercase().contains(needle)).unwrap_or(false)
}

/// Classify a context, first rule wins (see module docs for the ordered
/// list of rules).
fn classify(keywords: &[String], file_path: Option<&str>) -> ContextType {
    if has_keyword(keywords, "refactor") || has_keyword(keywords, "clean") {
        return ContextType::Refactoring;
    }

    let writing_or_creating = has_keyword(keywords, "writing") || has_keyword(keywords, "creating");
    let test_like = has_keyword(keywords, "test")
        || has_keyword(keywords, "tests")
        || has_keyword(keywords, "unit");
    if writing_or_creating && test_like {
        return ContextType::Testing;
    }

    if file_path_contains(file_path, "test") && !file_path_contains(file_path, "utils") {
        return ContextType::Testing;
    }

    if has_keyword(keywords, "implement")
        || has_keyword(keywords, "feature")
        || has_keyword(keywords, "develop")
        || (file_path_contains(file_path, "src/") && !file_path_contains(file_path, "utils"))
    {
        return ContextType::FeatureDevelopment;
    }

    if has_keyword(keywords, "test")
        || has_keyword(keywords, "tests")
        || has_keyword(keywords, "unit")
        || has_keyword(keywords, "validate")
    {
        return ContextType::Testing;
    }

    if has_keyword(keywords, "improve") {
        return ContextType::Refactoring;
    }

    ContextType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-08-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn method_keywords_recognise_shortcuts() {
        assert_eq!(method_keywords("tools/test_runner")[0], "test");
        assert_eq!(method_keywords("tools/create_file")[0], "create");
        assert_eq!(method_keywords("tools/implement_feature")[0], "implement");
    }

    #[test]
    fn method_keywords_falls_back_to_final_segment() {
        let kw = method_keywords("tools/edit_file");
        assert!(kw.iter().any(|k| k == "edit_file"));
    }

    #[test]
    fn session_like_args_excluded_from_keywords() {
        let analyser = ContextAnalyser::new();
        let ctx = analyser.analyse_tool_call(
            "tools/call",
            &[json!("session-abc-123"), json!("refactor the module")],
            ts(),
            None,
        );
        assert!(!ctx.keywords.iter().any(|k| k.contains("session")));
        assert!(ctx.keywords.iter().any(|k| k == "refactor"));
    }

    #[test]
    fn classify_refactoring_beats_everything() {
        assert_eq!(
            classify(&["refactor".into(), "test".into()], None),
            ContextType::Refactoring
        );
    }

    #[test]
    fn classify_testing_from_writing_plus_test_keywords() {
        assert_eq!(
            classify(&["writing".into(), "unit".into()], None),
            ContextType::Testing
        );
    }

    #[test]
    fn classify_testing_from_file_path_excludes_utils() {
        assert_eq!(classify(&[], Some("src/test_helpers.rs")), ContextType::Testing);
        assert_eq!(classify(&[], Some("src/utils/test_helpers.rs")), ContextType::Unknown);
    }

    #[test]
    fn classify_feature_development_from_src_path() {
        assert_eq!(classify(&[], Some("src/lib.rs")), ContextType::FeatureDevelopment);
    }

    #[test]
    fn classify_unknown_when_nothing_matches() {
        assert_eq!(classify(&["hello".into()], None), ContextType::Unknown);
    }

    #[test]
    fn phase_context_uses_constant_priority() {
        let analyser = ContextAnalyser::new();
        let ctx = analyser.phase_context("red");
        assert_eq!(ctx.priority.value(), PHASE_CONTEXT_PRIORITY);
        assert_eq!(ctx.category, "workflow");
        assert_eq!(ctx.value, "red");
    }
}
