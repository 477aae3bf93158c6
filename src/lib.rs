/*!
 * Process Supervisor Library
 * Single-child process supervision and signal-driven termination
 */

pub mod core;
pub mod monitoring;
pub mod process;
pub mod signals;

// Re-exports
pub use crate::core::{RuntimeConfig, SupervisorError, SupervisorResult};
pub use monitoring::init_tracing;
pub use process::{
    ChildJob, ChildSpec, ChildTask, ExitStatus, InputExchange, ProcessError, ProcessSupervisor,
    Role,
};
pub use signals::{Signal, SignalCounter, SignalError, SignalState, Termination};
