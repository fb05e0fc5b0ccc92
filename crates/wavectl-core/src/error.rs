use thiserror::Error;

#[derive(Debug, Error)]
pub enum WavectlError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    #[error("task set not found: {0}")]
    TaskSetNotFound(String),

    #[error("invalid task set: {0}")]
    InvalidTaskSet(String),

    #[error("invalid task id '{0}': must start with an alphanumeric and contain only alphanumerics, '_', '.', or '-'")]
    InvalidTaskId(String),

    #[error("task '{task}' is blocked by '{dep}' which does not exist in the task set")]
    UnknownDependency { task: String, dep: String },

    #[error("invalid declaration kind '{0}': expected interface, type, enum, class, or function")]
    InvalidDeclKind(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WavectlError>;
