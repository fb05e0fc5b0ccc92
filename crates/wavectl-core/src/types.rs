use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

/// Only `Parent` tasks are schedulable units; subtasks belong to a parent
/// and never appear in waves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Parent,
    Subtask,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Parent => "parent",
            TaskKind::Subtask => "subtask",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Pass,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Pass => "pass",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DeclKind
// ---------------------------------------------------------------------------

/// The five top-level declaration shapes the verifier extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Interface,
    Type,
    Enum,
    Class,
    Function,
}

impl DeclKind {
    pub fn all() -> &'static [DeclKind] {
        &[
            DeclKind::Interface,
            DeclKind::Type,
            DeclKind::Enum,
            DeclKind::Class,
            DeclKind::Function,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Interface => "interface",
            DeclKind::Type => "type",
            DeclKind::Enum => "enum",
            DeclKind::Class => "class",
            DeclKind::Function => "function",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeclKind {
    type Err = crate::error::WavectlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interface" => Ok(DeclKind::Interface),
            "type" => Ok(DeclKind::Type),
            "enum" => Ok(DeclKind::Enum),
            "class" => Ok(DeclKind::Class),
            "function" => Ok(DeclKind::Function),
            _ => Err(crate::error::WavectlError::InvalidDeclKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
