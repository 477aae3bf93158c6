/*!
 * `procsup supervise` tests
 */

use super::common::{position, procsup};
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use std::process::Stdio;
use tempfile::tempdir;

#[test]
fn test_echo_output_precedes_parent_report() {
    let mut child = procsup()
        .args(["supervise", "echo"])
        .stdin(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"hello\nworld\n").unwrap();
    }

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    let created = position(&stdout, "created a child process (pid=");
    let hello = position(&stdout, "child received: hello");
    let world = position(&stdout, "child received: world");
    let finished = position(&stdout, "parent: child finished (status 0)");

    assert!(created < finished);
    assert!(hello < world);
    assert!(world < finished);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_echo_with_fed_lines() {
    let output = procsup()
        .args(["supervise", "--line", "first", "--line", "second", "echo"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(position(&stdout, "child received: first") < position(&stdout, "child received: second"));
    assert!(stdout.contains("parent: child finished (status 0)"));
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_echo_line_limit_ignores_extra_input() {
    let output = procsup()
        .args(["supervise", "--line", "a", "--line", "b", "--line", "c", "echo", "--lines", "1"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(stdout.contains("child received: a"));
    assert!(!stdout.contains("child received: b"));
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_json_report() {
    let output = procsup()
        .args(["supervise", "--json", "--line", "x", "echo"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    let last = stdout.lines().last().unwrap();
    let report: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(report["job"], "echo");
    assert_eq!(report["status"]["code"], 0);
    assert!(report["os_pid"].as_u64().unwrap() > 0);
}

#[test]
fn test_copy_with_paths() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("source.txt");
    let dst = dir.path().join("dest.txt");
    fs::write(&src, b"supervised copy").unwrap();

    let output = procsup()
        .arg("supervise")
        .arg("copy")
        .arg(&src)
        .arg(&dst)
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    // Copy must be complete by the time the parent reports
    assert!(position(&stdout, "file copy completed (15 bytes)") < position(&stdout, "parent: child finished (status 0)"));
    assert_eq!(fs::read(&dst).unwrap(), b"supervised copy");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_copy_prompts_for_paths() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("a.bin");
    let dst = dir.path().join("b.bin");
    fs::write(&src, [9u8; 100]).unwrap();

    let output = procsup()
        .arg("supervise")
        .arg("--line")
        .arg(&src)
        .arg("--line")
        .arg(&dst)
        .arg("copy")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(position(&stdout, "input source file path.") < position(&stdout, "input dest file path."));
    assert_eq!(fs::read(&dst).unwrap(), vec![9u8; 100]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_copy_missing_source_fails_locally() {
    let dir = tempdir().unwrap();
    let dst = dir.path().join("never.txt");

    let output = procsup()
        .args(["supervise", "copy", "/nonexistent/procsup-source.txt"])
        .arg(&dst)
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();

    assert!(stderr.contains("open error: /nonexistent/procsup-source.txt"));
    assert!(stdout.contains("parent: child finished (status 1)"));
    assert!(!dst.exists());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_invalid_environment_is_rejected() {
    let output = procsup()
        .env("PROCSUP_SIGNAL_THRESHOLD", "many")
        .args(["supervise", "--line", "x", "echo"])
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr).unwrap().starts_with("procsup: "));
}

#[test]
fn test_copy_dash_prefixed_paths() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("-src"), b"dash").unwrap();

    let output = procsup()
        .current_dir(dir.path())
        .args(["supervise", "copy", "--", "-src", "-dst"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(stdout.contains("file copy completed (4 bytes)"));
    assert!(stdout.contains("parent: child finished (status 0)"));
    assert_eq!(fs::read(dir.path().join("-dst")).unwrap(), b"dash");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_echo_non_utf8_line() {
    let mut child = procsup()
        .args(["supervise", "echo"])
        .stdin(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"ok\n\xff\xfe\n").unwrap();
    }

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("child received: ok"));
    assert!(stdout.contains("child received: \u{FFFD}\u{FFFD}"));
    assert!(stdout.contains("parent: child finished (status 0)"));
    assert_eq!(output.status.code(), Some(0));
}
