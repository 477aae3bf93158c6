/*!
 * `procsup count-signals` tests
 *
 * Each delivery is sent only after the previous count line has been read,
 * so no two deliveries coalesce.
 */

use super::common::procsup;
use nix::sys::signal::{kill, Signal as NixSignal};
use nix::unistd::Pid;
use pretty_assertions::assert_eq;
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Stdio};

struct CountingChild {
    child: Child,
    lines: BufReader<ChildStdout>,
}

impl CountingChild {
    fn spawn(args: &[&str]) -> Self {
        let mut child = procsup()
            .arg("count-signals")
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let lines = BufReader::new(child.stdout.take().unwrap());
        Self { child, lines }
    }

    fn next_line(&mut self) -> String {
        let mut line = String::new();
        self.lines.read_line(&mut line).unwrap();
        line.trim_end().to_string()
    }

    fn send(&self, signal: NixSignal) {
        kill(Pid::from_raw(self.child.id() as i32), signal).unwrap();
    }
}

#[test]
fn test_interrupts_counted_until_threshold() {
    let mut counter = CountingChild::spawn(&["--threshold", "3"]);

    let ready = counter.next_line();
    assert!(ready.starts_with("Press Ctrl+C to send a SIGINT signal."));

    for k in 1..=3 {
        counter.send(NixSignal::SIGINT);
        assert_eq!(counter.next_line(), format!("SIGINT received. Count: {}", k));
    }
    assert_eq!(counter.next_line(), "Exiting...");

    // Nothing follows the exit line
    assert_eq!(counter.next_line(), "");
    let status = counter.child.wait().unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_threshold_of_one() {
    let mut counter = CountingChild::spawn(&["--threshold", "1"]);
    counter.next_line();

    counter.send(NixSignal::SIGINT);
    assert_eq!(counter.next_line(), "SIGINT received. Count: 1");
    assert_eq!(counter.next_line(), "Exiting...");
    assert_eq!(counter.child.wait().unwrap().code(), Some(0));
}

#[test]
fn test_custom_signal() {
    let mut counter = CountingChild::spawn(&["--signal", "SIGUSR1", "--threshold", "2"]);
    assert!(counter.next_line().starts_with("Send SIGUSR1 to pid"));

    counter.send(NixSignal::SIGUSR1);
    assert_eq!(counter.next_line(), "SIGUSR1 received. Count: 1");
    counter.send(NixSignal::SIGUSR1);
    assert_eq!(counter.next_line(), "SIGUSR1 received. Count: 2");
    assert_eq!(counter.next_line(), "Exiting...");
    assert_eq!(counter.child.wait().unwrap().code(), Some(0));
}

#[test]
fn test_uncatchable_signal_rejected() {
    let output = procsup()
        .args(["count-signals", "--signal", "SIGKILL"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_reserved_signal_rejected() {
    let output = procsup()
        .args(["count-signals", "--signal", "SIGSEGV"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("Error setting SIGSEGV handler"));
}

#[test]
fn test_zero_threshold_rejected() {
    let output = procsup()
        .args(["count-signals", "--threshold", "0"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}
