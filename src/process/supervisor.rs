/*!
 * Process Supervisor
 * Spawns OS child processes and blocks on their termination
 */

use super::types::{
    ChildSpec, ChildState, ChildTask, ExitStatus, InputExchange, ProcessError, ProcessResult,
};
use crate::core::limits::STDIN_FEEDER_THREAD;
use crate::core::types::{ChildId, OsPid};
use crate::monitoring::span_operation;
use dashmap::DashMap;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// A child owned by the supervisor until it is waited on
#[derive(Debug)]
struct ManagedChild {
    os_pid: OsPid,
    program: String,
    state: ChildState,
    child: Child,
    feeder: Option<JoinHandle<io::Result<usize>>>,
}

impl ManagedChild {
    fn transition(&mut self, next: ChildState) -> ProcessResult<()> {
        if !self.state.can_transition_to(&next) {
            return Err(ProcessError::InvalidStateTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Owns spawned children and hands out `ChildTask` handles
///
/// Children not waited on are killed and reaped when the supervisor drops.
#[derive(Debug)]
pub struct ProcessSupervisor {
    children: DashMap<ChildId, ManagedChild>,
    next_id: AtomicU64,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        debug!("Process supervisor initialized");
        Self {
            children: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Spawn one child process
    ///
    /// All-or-nothing: on any failure no handle exists and nothing is tracked.
    pub fn spawn(&self, spec: ChildSpec) -> ProcessResult<ChildTask> {
        self.validate_command(&spec.program)?;

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);

        if let Some(ref dir) = spec.working_dir {
            cmd.current_dir(dir);
        }

        // Output always goes straight to the caller's streams
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        match spec.input {
            InputExchange::Inherit => cmd.stdin(Stdio::inherit()),
            InputExchange::Lines(_) => cmd.stdin(Stdio::piped()),
            InputExchange::Null => cmd.stdin(Stdio::null()),
        };

        let child = cmd.spawn().map_err(|e| {
            error!(program = %spec.program, error = %e, "spawn failed");
            ProcessError::SpawnFailed(format!("{}: {}", spec.program, e))
        })?;

        let os_pid = child.id();
        let mut managed = ManagedChild {
            os_pid,
            program: spec.program.clone(),
            state: ChildState::Created,
            child,
            feeder: None,
        };

        if let InputExchange::Lines(lines) = spec.input {
            match Self::start_feeder(&mut managed.child, lines) {
                Ok(feeder) => managed.feeder = Some(feeder),
                Err(e) => {
                    Self::reap_quietly(&mut managed.child);
                    return Err(ProcessError::SpawnFailed(format!(
                        "{}: stdin feeder: {}",
                        spec.program, e
                    )));
                }
            }
        }

        managed.transition(ChildState::Running)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(child_id = id, os_pid, program = %spec.program, "spawned child process");
        self.children.insert(id, managed);

        Ok(ChildTask::new(id, os_pid))
    }

    /// Block until the child terminates and retire its handle
    ///
    /// A second wait on the same handle, or a handle from elsewhere, yields
    /// `InvalidHandle`. Returns only after the child has exited, so every
    /// effect of the child happens-before the caller resumes.
    pub fn wait(&self, task: ChildTask) -> ProcessResult<ExitStatus> {
        let span = span_operation("wait_child");
        span.record_subject(task.id());

        let (_, mut managed) = self
            .children
            .remove_if(&task.id(), |_, managed| managed.os_pid == task.os_pid())
            .ok_or_else(|| {
                warn!(child_id = task.id(), "wait on unknown or retired handle");
                span.record_error("invalid handle");
                ProcessError::InvalidHandle(task.id())
            })?;

        let status = match managed.child.wait() {
            Ok(status) => ExitStatus::from(status),
            Err(e) => {
                error!(child_id = task.id(), error = %e, "wait failed");
                span.record_error(&e.to_string());
                // Killing the child closes its stdin, so the feeder cannot block the join
                Self::reap_quietly(&mut managed.child);
                Self::settle_feeder(task.id(), managed.feeder.take());
                return Err(ProcessError::WaitFailed(e.to_string()));
            }
        };

        Self::settle_feeder(task.id(), managed.feeder.take());

        managed.transition(ChildState::Terminated(status))?;
        span.record_result(status.success());

        info!(
            child_id = task.id(),
            os_pid = managed.os_pid,
            program = %managed.program,
            status = %status,
            "child process terminated"
        );

        Ok(status)
    }

    /// Whether the handle still refers to an un-reaped child
    pub fn is_live(&self, task: ChildTask) -> bool {
        self.children
            .get(&task.id())
            .map(|managed| managed.os_pid == task.os_pid())
            .unwrap_or(false)
    }

    /// Number of children not yet waited on
    pub fn live_count(&self) -> usize {
        self.children.len()
    }

    /// Reject an empty program; the command runs without a shell, so any
    /// other path is passed to the OS as-is
    fn validate_command(&self, command: &str) -> ProcessResult<()> {
        if command.trim().is_empty() {
            return Err(ProcessError::InvalidCommand("Empty command".to_string()));
        }
        Ok(())
    }

    /// Join the stdin feeder; returns how many lines reached the child
    fn settle_feeder(
        child_id: ChildId,
        feeder: Option<JoinHandle<io::Result<usize>>>,
    ) -> Option<usize> {
        match feeder?.join() {
            Ok(Ok(lines)) => {
                debug!(child_id, lines, "stdin fully delivered");
                Some(lines)
            }
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                debug!(child_id, "child closed stdin before all lines were read");
                None
            }
            Ok(Err(e)) => {
                warn!(child_id, error = %e, "stdin feeder failed");
                None
            }
            Err(_) => {
                warn!(child_id, "stdin feeder panicked");
                None
            }
        }
    }

    fn start_feeder(child: &mut Child, lines: Vec<String>) -> io::Result<JoinHandle<io::Result<usize>>> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(ErrorKind::Other, "child stdin was not piped"))?;

        thread::Builder::new()
            .name(STDIN_FEEDER_THREAD.to_string())
            .spawn(move || feed_lines(stdin, &lines))
    }

    fn reap_quietly(child: &mut Child) {
        if let Err(e) = child.kill() {
            debug!(error = %e, "kill during cleanup failed");
        }
        if let Err(e) = child.wait() {
            debug!(error = %e, "reap during cleanup failed");
        }
    }
}

/// Write every line in order, then close the pipe by dropping it
fn feed_lines(stdin: ChildStdin, lines: &[String]) -> io::Result<usize> {
    let mut writer = BufWriter::new(stdin);
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(lines.len())
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        let ids: Vec<ChildId> = self.children.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, mut managed)) = self.children.remove(&id) {
                warn!(child_id = id, os_pid = managed.os_pid, "killing un-waited child");
                Self::reap_quietly(&mut managed.child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn sh(script: &str) -> ChildSpec {
        ChildSpec::new("sh").with_args(["-c", script])
    }

    #[test]
    fn test_spawn_and_wait_success() {
        let supervisor = ProcessSupervisor::new();
        let task = supervisor.spawn(ChildSpec::new("true")).unwrap();
        assert!(task.os_pid() > 0);
        assert!(supervisor.is_live(task));

        let status = supervisor.wait(task).unwrap();
        assert!(status.success());
        assert_eq!(status.code(), Some(0));
        assert!(!supervisor.is_live(task));
        assert_eq!(supervisor.live_count(), 0);
    }

    #[test]
    fn test_exit_code_is_reported() {
        let supervisor = ProcessSupervisor::new();
        let task = supervisor.spawn(sh("exit 3")).unwrap();
        assert_eq!(supervisor.wait(task).unwrap(), ExitStatus::from_code(3));
    }

    #[test]
    fn test_double_wait_rejected() {
        let supervisor = ProcessSupervisor::new();
        let task = supervisor.spawn(ChildSpec::new("true")).unwrap();

        supervisor.wait(task).unwrap();
        assert_eq!(
            supervisor.wait(task).unwrap_err(),
            ProcessError::InvalidHandle(task.id())
        );
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let supervisor = ProcessSupervisor::new();
        let task = supervisor.spawn(ChildSpec::new("true")).unwrap();
        let forged = ChildTask::new(task.id(), task.os_pid().wrapping_add(1));

        assert!(matches!(
            supervisor.wait(forged),
            Err(ProcessError::InvalidHandle(_))
        ));
        // The real handle is untouched
        assert!(supervisor.wait(task).unwrap().success());
    }

    #[test]
    fn test_spawn_missing_program_fails_cleanly() {
        let supervisor = ProcessSupervisor::new();
        let err = supervisor
            .spawn(ChildSpec::new("/nonexistent/definitely-not-here"))
            .unwrap_err();
        assert!(matches!(err, ProcessError::SpawnFailed(_)));
        assert_eq!(supervisor.live_count(), 0);
    }

    #[test]
    fn test_empty_program_rejected() {
        let supervisor = ProcessSupervisor::new();
        let err = supervisor.spawn(ChildSpec::new("  ")).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidCommand(_)));
        assert_eq!(supervisor.live_count(), 0);
    }

    #[test]
    fn test_program_path_with_shell_characters() {
        let dir = tempdir().unwrap();
        let bin_dir = dir.path().join("tools (x86) & $HOME");
        fs::create_dir(&bin_dir).unwrap();
        let program = bin_dir.join("run;me");
        std::os::unix::fs::symlink("/bin/sh", &program).unwrap();

        let supervisor = ProcessSupervisor::new();
        let spec =
            ChildSpec::new(program.to_string_lossy().into_owned()).with_args(["-c", "exit 4"]);
        let task = supervisor.spawn(spec).unwrap();
        assert_eq!(supervisor.wait(task).unwrap().code(), Some(4));
    }

    #[test]
    fn test_settle_feeder_outcomes() {
        assert_eq!(ProcessSupervisor::settle_feeder(1, None), None);

        let delivered = thread::spawn(|| Ok(3));
        assert_eq!(ProcessSupervisor::settle_feeder(1, Some(delivered)), Some(3));

        let broken = thread::spawn(|| Err(io::Error::from(ErrorKind::BrokenPipe)));
        assert_eq!(ProcessSupervisor::settle_feeder(1, Some(broken)), None);
    }

    #[test]
    fn test_lines_delivered_in_order() {
        let supervisor = ProcessSupervisor::new();
        let spec = sh(r#"read a; read b; [ "$a" = hello ] && [ "$b" = world ]"#)
            .with_input(InputExchange::Lines(vec!["hello".into(), "world".into()]));

        let task = supervisor.spawn(spec).unwrap();
        assert!(supervisor.wait(task).unwrap().success());
    }

    #[test]
    fn test_child_ignoring_stdin_does_not_block() {
        let supervisor = ProcessSupervisor::new();
        let lines = (0..20_000).map(|i| format!("line {}", i)).collect();
        let spec = ChildSpec::new("true").with_input(InputExchange::Lines(lines));

        let task = supervisor.spawn(spec).unwrap();
        assert!(supervisor.wait(task).unwrap().success());
    }

    #[test]
    fn test_child_effects_visible_after_wait() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("marker");
        let supervisor = ProcessSupervisor::new();

        let spec = sh("sleep 0.1; printf done > marker").with_working_dir(dir.path());
        let task = supervisor.spawn(spec).unwrap();
        supervisor.wait(task).unwrap();

        assert_eq!(fs::read_to_string(marker).unwrap(), "done");
    }

    #[test]
    fn test_signal_termination_reported() {
        let supervisor = ProcessSupervisor::new();
        let task = supervisor.spawn(sh("kill -TERM $$")).unwrap();
        let status = supervisor.wait(task).unwrap();

        assert_eq!(status.code(), None);
        assert_eq!(status.signal(), Some(nix::sys::signal::Signal::SIGTERM as i32));
        assert!(!status.success());
    }

    #[test]
    fn test_drop_reaps_unwaited_children() {
        let supervisor = ProcessSupervisor::new();
        let task = supervisor
            .spawn(ChildSpec::new("sleep").with_args(["30"]))
            .unwrap();
        let pid = nix::unistd::Pid::from_raw(task.os_pid() as i32);
        drop(supervisor);

        // Reaped: the pid no longer refers to our child
        assert!(nix::sys::wait::waitpid(pid, None).is_err());
    }
}
