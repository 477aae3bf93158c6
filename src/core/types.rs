/*!
 * Core Types
 * Common types used across the supervisor and the signal counter
 */

/// Supervisor-assigned child identifier (never reused within a supervisor)
pub type ChildId = u64;

/// OS-level process ID
pub type OsPid = u32;

/// Raw signal number as understood by the OS
pub type SignalNumber = i32;

/// Process exit code reported to callers and external scripts
pub type ExitCode = i32;

/// Common result type for top-level operations
pub type SupervisorResult<T> = Result<T, super::errors::SupervisorError>;
