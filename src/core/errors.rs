/*!
 * Error Types
 * Unified error handling with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::process::types::{ChildError, ProcessError};
pub use crate::signals::types::SignalError;

use super::limits::EXIT_FAILURE;
use super::types::ExitCode;

/// Unified error type surfaced by the `procsup` binary
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum SupervisorError {
    #[error("Process error: {0}")]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Child error: {0}")]
    #[diagnostic(transparent)]
    Child(#[from] ChildError),

    #[error("Signal error: {0}")]
    #[diagnostic(transparent)]
    Signal(#[from] SignalError),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(supervisor::configuration_error),
        help("Check PROCSUP_* environment variables and command-line flags.")
    )]
    Configuration(String),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(supervisor::io_error),
        help("Writing progress output failed. Check that stdout is still open.")
    )]
    Io(String),
}

impl SupervisorError {
    /// Exit code external scripts observe for this failure
    pub fn exit_code(&self) -> ExitCode {
        EXIT_FAILURE
    }
}

impl From<std::io::Error> for SupervisorError {
    fn from(err: std::io::Error) -> Self {
        SupervisorError::Io(err.to_string())
    }
}

/// Serializable error representation for JSON reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SerializableError {
    pub error_type: String,
    pub message: String,
}

impl SerializableError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

impl From<&SupervisorError> for SerializableError {
    fn from(err: &SupervisorError) -> Self {
        let error_type = match err {
            SupervisorError::Process(_) => "process_error",
            SupervisorError::Child(_) => "child_error",
            SupervisorError::Signal(_) => "signal_error",
            SupervisorError::Configuration(_) => "configuration_error",
            SupervisorError::Io(_) => "io_error",
        };
        SerializableError::new(error_type, err.to_string())
    }
}
