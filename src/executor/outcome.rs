//! Result types for bounded execution

use serde::Serialize;
use std::fmt;

use crate::config::Messages;
use crate::escape::Escaper;

/// Final result of one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The process ended on its own within the limits
    Completed {
        stdout: String,
        stderr: String,
        /// `None` when the process was ended by a signal
        exit_code: Option<i32>,
    },
    /// The watchdog terminated the process
    TimedOut,
    /// Stdout crossed the configured cap and the process was terminated
    OutputTooLong,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }

    /// Short label used in logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Completed { .. } => "completed",
            Outcome::TimedOut => "timed_out",
            Outcome::OutputTooLong => "output_too_long",
        }
    }

    /// Build the caller-facing result
    ///
    /// Abnormal outcomes carry a fixed, escaped message in `stdout` and no
    /// captured output at all, whatever was collected before termination.
    pub fn into_program_output(self, messages: &Messages, escaper: &dyn Escaper) -> ProgramOutput {
        match self {
            Outcome::Completed { stdout, stderr, .. } => ProgramOutput::new(stderr, stdout, false),
            Outcome::TimedOut => {
                ProgramOutput::new(String::new(), escaper.escape(&messages.timeout), true)
            }
            Outcome::OutputTooLong => {
                ProgramOutput::new(String::new(), escaper.escape(&messages.long_output), true)
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed { exit_code, .. } => match exit_code {
                Some(code) => write!(f, "completed (exit code {code})"),
                None => write!(f, "completed (terminated by signal)"),
            },
            Outcome::TimedOut => write!(f, "timed out"),
            Outcome::OutputTooLong => write!(f, "output too long"),
        }
    }
}

/// Serializable result handed to whatever transmits it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramOutput {
    pub stderr: String,
    pub stdout: String,
    pub is_error: bool,
}

impl ProgramOutput {
    pub fn new(stderr: String, stdout: String, is_error: bool) -> Self {
        Self {
            stderr,
            stdout,
            is_error,
        }
    }
}
