use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ExperimentError>;

/// A failure the pipeline recognizes and contains: the unit is degraded,
/// logged and tagged, but the batch keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    #[error("Compilation failed: {0}")]
    Compile(String),

    #[error("Could not stage files into the build workspace: {0}")]
    WorkspaceCopy(String),

    #[error("Mutation engine {engine} failed: {message}")]
    Mutation { engine: String, message: String },
}

impl StageFailure {
    /// Short category name, used in summaries and the SQLite store.
    pub fn category(&self) -> &'static str {
        match self {
            StageFailure::Compile(_) => "compile",
            StageFailure::WorkspaceCopy(_) => "workspace_copy",
            StageFailure::Mutation { .. } => "mutation",
        }
    }
}

pub type StageResult = std::result::Result<(), StageFailure>;
