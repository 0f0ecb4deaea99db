//! JSON constraint-pack loader.
//!
//! The core treats constraint packs as already-validated in-memory values
//! and defers parsing to an external loader. This is that loader's
//! reference form: a minimal JSON reading of the pack schema (`version`,
//! `constraints[]` with `id/title/priority/phases/reminders`), standing in
//! for the YAML loader named but not specified by the pack format. Only
//! atomic constraints and the flat phase-trigger shape are covered —
//! composite packs are assembled programmatically, not loaded from disk.

use anyhow::{bail, Context, Result};
use conproxy_core::{
    AtomicConstraint, ConstraintId, ConstraintLibrary, Priority, SchedulerConfig,
    TriggerConfiguration,
};
use serde::Deserialize;
use serde_json::Map;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PackManifest {
    version: String,
    #[serde(default)]
    description: String,
    constraints: Vec<PackConstraint>,
    #[serde(default)]
    scheduling: Option<PackScheduling>,
}

#[derive(Debug, Deserialize)]
struct PackConstraint {
    id: String,
    title: String,
    priority: f64,
    phases: Vec<String>,
    reminders: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PackScheduling {
    #[serde(default)]
    every_n: Option<u32>,
    #[serde(default)]
    phase_overrides: Vec<String>,
}

/// The library plus whatever scheduling config the pack itself carried, if
/// any (absent fields fall back to `SchedulerConfig::default()`).
pub struct LoadedPack {
    pub library: ConstraintLibrary,
    pub scheduler: Option<SchedulerConfig>,
}

pub fn load(path: &Path) -> Result<LoadedPack> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read constraint pack at {}", path.display()))?;
    let manifest: PackManifest = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse constraint pack at {}", path.display()))?;

    let mut library = ConstraintLibrary::new(manifest.version, manifest.description);

    for entry in manifest.constraints {
        if entry.phases.is_empty() {
            bail!("constraint {} has no phases", entry.id);
        }
        let id = ConstraintId::new(entry.id.clone())
            .with_context(|| format!("invalid constraint id: {}", entry.id))?;
        let priority = Priority::new(entry.priority)
            .with_context(|| format!("invalid priority for constraint {}", entry.id))?;

        let trigger = TriggerConfiguration {
            confidence_threshold: 0.1,
            ..Default::default()
        };

        // Phases map to UserDefinedContext("workflow", phase, 0.8); stored as
        // metadata rather than the context-pattern axis (that axis scores
        // against `ContextType`, a different taxonomy than workflow phase
        // names). The dispatcher consults this to gate eligibility by the
        // session's current phase, ahead of keyword/file-pattern scoring.
        let mut metadata = Map::new();
        metadata.insert(
            "phases".to_string(),
            serde_json::Value::Array(entry.phases.iter().cloned().map(serde_json::Value::String).collect()),
        );

        let atomic = AtomicConstraint::new(
            id,
            entry.title,
            priority,
            trigger,
            entry.reminders,
            Some(metadata),
        )
        .with_context(|| format!("invalid constraint {}", entry.id))?;
        library
            .add_atomic(atomic)
            .with_context(|| format!("duplicate constraint id: {}", entry.id))?;
    }

    let scheduler = manifest.scheduling.map(|s| {
        let overrides: HashSet<String> = s.phase_overrides.into_iter().collect();
        SchedulerConfig::new(s.every_n.unwrap_or(1), overrides)
    });

    Ok(LoadedPack { library, scheduler })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_pack(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_minimal_pack() {
        let file = write_pack(
            r#"{
                "version": "1",
                "constraints": [
                    { "id": "tdd.red", "title": "Write the failing test", "priority": 0.9,
                      "phases": ["red"], "reminders": ["Write a failing test first."] }
                ]
            }"#,
        );
        let loaded = load(file.path()).unwrap();
        assert_eq!(loaded.library.len(), 1);
        assert!(loaded.scheduler.is_none());
    }

    #[test]
    fn loads_scheduling_section() {
        let file = write_pack(
            r#"{
                "version": "1",
                "constraints": [
                    { "id": "a", "title": "A", "priority": 0.5, "phases": ["red"], "reminders": ["r"] }
                ],
                "scheduling": { "every_n": 3, "phase_overrides": ["green"] }
            }"#,
        );
        let loaded = load(file.path()).unwrap();
        let scheduler = loaded.scheduler.unwrap();
        assert_eq!(scheduler.every_n, 3);
        assert!(scheduler.phase_overrides.contains("green"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let file = write_pack(
            r#"{
                "version": "1",
                "constraints": [
                    { "id": "a", "title": "A", "priority": 0.5, "phases": ["red"], "reminders": ["r"] },
                    { "id": "a", "title": "A again", "priority": 0.5, "phases": ["red"], "reminders": ["r"] }
                ]
            }"#,
        );
        assert!(load(file.path()).is_err());
    }

    #[test]
    fn rejects_empty_phases() {
        let file = write_pack(
            r#"{
                "version": "1",
                "constraints": [
                    { "id": "a", "title": "A", "priority": 0.5, "phases": [], "reminders": ["r"] }
                ]
            }"#,
        );
        assert!(load(file.path()).is_err());
    }
}
