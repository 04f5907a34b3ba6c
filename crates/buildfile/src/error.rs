use std::time::Duration;
use thiserror::Error;

/// Result type for build-file operations
pub type Result<T> = std::result::Result<T, BuildFileError>;

#[derive(Error, Debug)]
pub enum BuildFileError {
    /// The build tool could not generate the project
    #[error("Could not configure project: {message}")]
    Configuration { message: String, stdout: String },

    /// The build tool binary could not be started
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool did not finish in time
    #[error("Build tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("Line index {index} out of range (file has {len} lines)")]
    LineOutOfRange { index: usize, len: usize },

    #[error("Can only pop {available} lines (not {requested})")]
    PopTooMany { requested: usize, available: usize },

    /// `restore` without a prior `snapshot`
    #[error("No snapshot to restore")]
    NoSnapshot,

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildFileError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            stdout: stdout.into(),
        }
    }
}
