/*!
 * Process Module
 * Single-child spawn, input exchange and blocking wait
 */

pub mod jobs;
pub mod role;
pub mod supervisor;
pub mod types;

// Re-export for convenience
pub use jobs::{run_copy, run_echo, ChildJob};
pub use role::{parent_failure_code, run_child, run_parent, Role, CHILD_ROLE_ARG};
pub use supervisor::ProcessSupervisor;
pub use types::{
    ChildError, ChildReport, ChildSpec, ChildState, ChildTask, ExitStatus, InputExchange,
    ProcessError, ProcessResult,
};
