/*!
 * Process Types
 * Handles, exit statuses, spawn configuration and errors
 */

use crate::core::types::{ChildId, ExitCode, OsPid, SignalNumber};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Process operation result
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Supervisor-side errors, surfaced directly to the caller
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProcessError {
    #[error("Spawn failed: {0}")]
    #[diagnostic(
        code(process::spawn_failed),
        help("The OS could not create the child. Check that the program exists and system resources.")
    )]
    SpawnFailed(String),

    #[error("Invalid command: {0}")]
    #[diagnostic(
        code(process::invalid_command),
        help("Provide a non-empty program path.")
    )]
    InvalidCommand(String),

    #[error("Invalid child handle: {0}")]
    #[diagnostic(
        code(process::invalid_handle),
        help("The child was already waited on or never belonged to this supervisor.")
    )]
    InvalidHandle(ChildId),

    #[error("Invalid state transition: {from} -> {to}")]
    #[diagnostic(code(process::invalid_state_transition))]
    InvalidStateTransition { from: ChildState, to: ChildState },

    #[error("Wait failed: {0}")]
    #[diagnostic(
        code(process::wait_failed),
        help("The OS refused to report the child's status. The handle has been retired.")
    )]
    WaitFailed(String),
}

/// Child-side failures; the parent only ever sees the resulting exit code
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ChildError {
    #[error("open error: {path}: {reason}")]
    #[diagnostic(
        code(child::resource_unavailable),
        help("Check that the path exists and is readable (source) or writable (destination).")
    )]
    ResourceUnavailable { path: String, reason: String },

    #[error("missing input: expected {0}")]
    #[diagnostic(code(child::missing_input))]
    MissingInput(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(child::io_error))]
    Io(String),
}

impl From<std::io::Error> for ChildError {
    fn from(err: std::io::Error) -> Self {
        ChildError::Io(err.to_string())
    }
}

/// Child lifecycle: `Created -> Running -> Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildState {
    /// OS process exists, stdin not yet wired
    Created,
    /// Handed to the caller; only `wait` can observe its end
    Running,
    /// Reaped; absorbing
    Terminated(ExitStatus),
}

impl ChildState {
    pub fn can_transition_to(&self, next: &ChildState) -> bool {
        matches!(
            (self, next),
            (ChildState::Created, ChildState::Running)
                | (ChildState::Running, ChildState::Terminated(_))
        )
    }
}

impl fmt::Display for ChildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildState::Created => f.write_str("created"),
            ChildState::Running => f.write_str("running"),
            ChildState::Terminated(status) => write!(f, "terminated({})", status),
        }
    }
}

/// How a child terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExitStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ExitCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalNumber>,
}

impl ExitStatus {
    pub fn from_code(code: ExitCode) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn from_signal(signal: SignalNumber) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Exited with code 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<ExitCode> {
        self.code
    }

    pub fn signal(&self) -> Option<SignalNumber> {
        self.signal
    }

    /// Shell-style exit code: the code itself, or 128 + signal
    pub fn as_exit_code(&self) -> ExitCode {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => crate::core::limits::EXIT_FAILURE,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "{}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => f.write_str("unknown"),
        }
    }
}

/// Opaque handle to a spawned child, valid until reaped by `wait`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildTask {
    id: ChildId,
    os_pid: OsPid,
}

impl ChildTask {
    pub(crate) fn new(id: ChildId, os_pid: OsPid) -> Self {
        Self { id, os_pid }
    }

    pub fn id(&self) -> ChildId {
        self.id
    }

    pub fn os_pid(&self) -> OsPid {
        self.os_pid
    }
}

/// How the child's standard input is wired
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputExchange {
    /// Child reads the caller's stdin; the parent never touches it
    #[default]
    Inherit,
    /// Parent writes each line in order, newline-terminated, then closes the pipe
    Lines(Vec<String>),
    /// Child's stdin is empty
    Null,
}

/// Configuration for spawning a child
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChildSpec {
    pub program: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub input: InputExchange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl ChildSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            input: InputExchange::Inherit,
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input(mut self, input: InputExchange) -> Self {
        self.input = input;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Machine-readable summary printed by `procsup supervise --json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChildReport {
    pub child_id: ChildId,
    pub os_pid: OsPid,
    pub job: String,
    pub status: ExitStatus,
}
