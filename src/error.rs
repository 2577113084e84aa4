//! Error types surfaced by the executor

use thiserror::Error;

/// Errors returned to the caller of [`crate::Executor::execute`].
///
/// Stream read failures are not represented here: they are logged and the
/// affected collector stops early, so the caller still receives an outcome.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no program given: the argument vector is empty")]
    EmptyCommand,

    #[error("failed to spawn process: {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid executor configuration: {0}")]
    InvalidConfig(String),
}

impl ExecError {
    /// Whether the failure happened while creating the OS process
    pub fn is_spawn(&self) -> bool {
        matches!(self, ExecError::Spawn { .. })
    }
}
