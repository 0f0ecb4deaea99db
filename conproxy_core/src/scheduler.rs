//! Deterministic scheduler: decides, per interaction, whether to inject.

use std::collections::HashSet;

/// `(every_n, phase_overrides)` — the scheduler's only state is its config,
/// which never changes mid-session.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub every_n: u32,
    pub phase_overrides: HashSet<String>,
}

impl SchedulerConfig {
    pub fn new(every_n: u32, phase_overrides: HashSet<String>) -> Self {
        Self { every_n, phase_overrides }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            every_n: 1,
            phase_overrides: HashSet::new(),
        }
    }
}

/// The scheduler's binary decision for one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Inject,
    Pass,
}

/// Decide whether interaction `n` (1-indexed, after increment) injects,
/// given the session's current workflow-state name and the scheduler
/// config. Pure: identical inputs always yield identical output.
pub fn schedule(n: u32, workflow_state_name: &str, config: &SchedulerConfig) -> Decision {
    if config.phase_overrides.contains(workflow_state_name) {
        return Decision::Inject;
    }
    let every_n = config.every_n.max(1);
    if (n.saturating_sub(1)) % every_n == 0 {
        Decision::Inject
    } else {
        Decision::Pass
    }
}
