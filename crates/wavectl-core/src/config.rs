use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for wave planning. The defaults come from the reference
/// heuristics; none of them is a correctness contract, so they are all
/// overridable from `.wavectl/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minimum aggregate isolation for a multi-task wave to be marked
    /// parallel-safe.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: f64,

    /// Isolation deducted per file path claimed by more than one task in
    /// the same wave.
    #[serde(default = "default_overlap_penalty")]
    pub overlap_penalty: f64,

    /// Baseline duration estimate per task, in minutes.
    #[serde(default = "default_task_minutes")]
    pub task_minutes: f64,

    /// When true, a `blocked_by` reference to an id missing from the task
    /// set is an error instead of being treated as already satisfied.
    #[serde(default)]
    pub strict_deps: bool,
}

fn default_parallel_threshold() -> f64 {
    0.8
}

fn default_overlap_penalty() -> f64 {
    0.1
}

fn default_task_minutes() -> f64 {
    15.0
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: default_parallel_threshold(),
            overlap_penalty: default_overlap_penalty(),
            task_minutes: default_task_minutes(),
            strict_deps: false,
        }
    }
}

pub const CONFIG_FILE: &str = ".wavectl/config.yaml";

impl SchedulerConfig {
    /// Load from `<root>/.wavectl/config.yaml`, falling back to defaults
    /// when the file is absent.
    pub fn load(root: &Path) -> Result<SchedulerConfig> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(SchedulerConfig::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
