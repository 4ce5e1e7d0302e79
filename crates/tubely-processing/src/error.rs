use std::time::Duration;
use thiserror::Error;

/// Errors raised by the local processing stages
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {status:?}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {}s", timeout.as_secs())]
    Timeout {
        tool: &'static str,
        timeout: Duration,
    },

    #[error("Unreadable {tool} output: {message}")]
    InvalidOutput { tool: &'static str, message: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Upload exceeds the {limit_bytes} byte limit")]
    TooLarge { limit_bytes: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for processing operations
pub type ProcessingResult<T> = Result<T, ProcessingError>;
