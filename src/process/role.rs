/*!
 * Process Roles
 *
 * The binary cannot duplicate itself mid-flight, so a supervised spawn
 * re-executes the current program with a `child` role. Exactly one of
 * `run_parent` / `run_child` runs in any given process.
 */

use super::jobs::ChildJob;
use super::supervisor::ProcessSupervisor;
use super::types::{ChildReport, ChildSpec, InputExchange};
use crate::core::errors::SupervisorError;
use crate::core::limits::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::core::types::{ExitCode, SupervisorResult};
use std::io::{BufRead, Write};
use tracing::{error, info};

/// Subcommand that selects the child role
pub const CHILD_ROLE_ARG: &str = "child";

/// Which side of a supervised spawn this process is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Spawns the job in a child and waits for it
    Parent { job: ChildJob, input: InputExchange },
    /// Runs the job and exits with its status
    Child { job: ChildJob },
}

/// Spawn `program child <job>` and block until it finishes
///
/// Prints the parent's progress lines to `out`. The child's own output goes
/// to the inherited stdout and is complete before `child finished` is printed.
pub fn run_parent<W: Write>(
    supervisor: &ProcessSupervisor,
    program: &str,
    job: &ChildJob,
    input: InputExchange,
    mut out: W,
) -> SupervisorResult<ChildReport> {
    let mut args = vec![CHILD_ROLE_ARG.to_string()];
    args.extend(job.to_args());
    let spec = ChildSpec::new(program).with_args(args).with_input(input);

    let task = supervisor.spawn(spec)?;
    writeln!(
        out,
        "parent: process (pid={}) created a child process (pid={})",
        std::process::id(),
        task.os_pid()
    )?;
    out.flush()?;

    let status = supervisor.wait(task)?;
    writeln!(out, "parent: child finished (status {})", status)?;
    out.flush()?;

    info!(job = job.name(), status = %status, "supervised job complete");

    Ok(ChildReport {
        child_id: task.id(),
        os_pid: task.os_pid(),
        job: job.name().to_string(),
        status,
    })
}

/// Run the job on the child side; failures stay local and become exit code 1
pub fn run_child<R: BufRead, W: Write, E: Write>(
    job: &ChildJob,
    input: R,
    out: W,
    mut err: E,
) -> ExitCode {
    match job.run(input, out) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!(job = job.name(), error = %e, "child job failed");
            let _ = writeln!(err, "{}", e);
            EXIT_FAILURE
        }
    }
}

/// Exit code for a parent-side failure (spawn, wait or output)
pub fn parent_failure_code<E: Write>(failure: &SupervisorError, mut err: E) -> ExitCode {
    error!(error = %failure, "supervisor failed");
    let _ = writeln!(err, "parent: {}", failure);
    failure.exit_code()
}
