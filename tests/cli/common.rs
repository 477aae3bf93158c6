/*!
 * Shared helpers for driving the procsup binary
 */

use std::process::{Command, Stdio};

/// Command for the built binary with logging silenced
pub fn procsup() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_procsup"));
    cmd.env("RUST_LOG", "off")
        .env_remove("PROCSUP_SIGNAL")
        .env_remove("PROCSUP_SIGNAL_THRESHOLD")
        .env_remove("PROCSUP_TRACE_JSON")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Position of `needle` in `haystack`, failing the test when absent
pub fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("{:?} not found in output:\n{}", needle, haystack))
}
