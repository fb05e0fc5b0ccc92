use crate::error::{Result, WavectlError};
use crate::scheduler::Wave;
use crate::types::{TaskKind, TaskStatus};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Task / DependencyInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_info: Option<DependencyInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyInfo {
    #[serde(default)]
    pub blocked_by: Vec<String>,
    /// Advisory only — the scheduler derives parallelism from the graph
    /// and isolation scores, never from this list.
    #[serde(default)]
    pub can_parallel_with: Vec<String>,
    #[serde(default = "default_isolation")]
    pub isolation_score: f64,
    #[serde(default)]
    pub shared_files: Vec<String>,
}

/// Neutral default: an unannotated task has nothing known to conflict.
fn default_isolation() -> f64 {
    1.0
}

impl Default for DependencyInfo {
    fn default() -> Self {
        Self {
            blocked_by: Vec::new(),
            can_parallel_with: Vec::new(),
            isolation_score: default_isolation(),
            shared_files: Vec::new(),
        }
    }
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TaskKind::Parent,
            status: TaskStatus::Pending,
            dependency_info: None,
        }
    }

    /// True if this task participates in wave scheduling.
    pub fn is_schedulable(&self) -> bool {
        self.kind == TaskKind::Parent && self.status != TaskStatus::Pass
    }

    pub fn blocked_by(&self) -> &[String] {
        self.dependency_info
            .as_ref()
            .map(|d| d.blocked_by.as_slice())
            .unwrap_or(&[])
    }

    pub fn isolation_score(&self) -> f64 {
        self.dependency_info
            .as_ref()
            .map(|d| d.isolation_score)
            .unwrap_or_else(default_isolation)
    }

    pub fn shared_files(&self) -> &[String] {
        self.dependency_info
            .as_ref()
            .map(|d| d.shared_files.as_slice())
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// ExecutionStrategy
// ---------------------------------------------------------------------------

/// Optional precomputed plan carried by a task-set document. Callers may
/// prefer it when present; `analyze_for_parallelization` always recomputes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStrategy {
    #[serde(default)]
    pub waves: Vec<Wave>,
    #[serde(default)]
    pub dependency_graph: BTreeMap<String, BTreeSet<String>>,
}

// ---------------------------------------------------------------------------
// TaskSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSet {
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_strategy: Option<ExecutionStrategy>,
}

impl TaskSet {
    /// Load a task-set document. `.yaml`/`.yml` parse as YAML, anything
    /// else as JSON. Ids are validated; duplicates are rejected.
    pub fn load(path: &Path) -> Result<TaskSet> {
        if !path.exists() {
            return Err(WavectlError::TaskSetNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let set: TaskSet = if is_yaml {
            serde_yaml::from_str(&content)
                .map_err(|e| WavectlError::InvalidTaskSet(e.to_string()))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| WavectlError::InvalidTaskSet(e.to_string()))?
        };
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<()> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for task in &self.tasks {
            validate_task_id(&task.id)?;
            if !seen.insert(task.id.as_str()) {
                return Err(WavectlError::InvalidTaskSet(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
        }
        Ok(())
    }

    /// Strict-mode check: every `blocked_by` reference among parent tasks
    /// must name a task present in the set.
    pub fn validate_deps(&self) -> Result<()> {
        let known: BTreeSet<&str> = self.tasks.iter().map(|t| t.id.as_str()).collect();
        for task in &self.tasks {
            if task.kind != TaskKind::Parent {
                continue;
            }
            for dep in task.blocked_by() {
                if !known.contains(dep.as_str()) {
                    return Err(WavectlError::UnknownDependency {
                        task: task.id.clone(),
                        dep: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static TASK_ID_RE: OnceLock<Regex> = OnceLock::new();

fn task_id_re() -> &'static Regex {
    TASK_ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").unwrap())
}

pub fn validate_task_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 128 || !task_id_re().is_match(id) {
        return Err(WavectlError::InvalidTaskId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
