/*!
 * Child Jobs
 * Work performed on the child side of a supervised spawn
 */

use super::types::ChildError;
use crate::core::limits::COPY_BUFFER_SIZE;
use std::fs::File;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Task a child runs to completion before exiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildJob {
    /// Echo lines read from stdin, until EOF or `max_lines`
    Echo { max_lines: Option<usize> },
    /// Copy `source` to `dest`; missing paths are read from stdin
    Copy {
        source: Option<PathBuf>,
        dest: Option<PathBuf>,
    },
}

impl ChildJob {
    pub fn name(&self) -> &'static str {
        match self {
            ChildJob::Echo { .. } => "echo",
            ChildJob::Copy { .. } => "copy",
        }
    }

    /// Command-line form understood by `procsup child`
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.name().to_string()];
        match self {
            ChildJob::Echo { max_lines } => {
                if let Some(n) = max_lines {
                    args.push("--lines".to_string());
                    args.push(n.to_string());
                }
            }
            ChildJob::Copy { source, dest } => {
                // A destination without a source cannot be expressed positionally
                if let Some(source) = source {
                    // Paths starting with '-' must not be parsed as flags
                    args.push("--".to_string());
                    args.push(source.to_string_lossy().into_owned());
                    if let Some(dest) = dest {
                        args.push(dest.to_string_lossy().into_owned());
                    }
                }
            }
        }
        args
    }

    /// Run the job against the given streams
    pub fn run<R: BufRead, W: Write>(&self, input: R, out: W) -> Result<(), ChildError> {
        match self {
            ChildJob::Echo { max_lines } => run_echo(input, out, *max_lines).map(|_| ()),
            ChildJob::Copy { source, dest } => {
                run_copy(input, out, source.as_deref(), dest.as_deref()).map(|_| ())
            }
        }
    }
}

/// Prompt for and echo input lines; returns how many were echoed
pub fn run_echo<R: BufRead, W: Write>(
    mut input: R,
    mut out: W,
    max_lines: Option<usize>,
) -> Result<usize, ChildError> {
    let mut echoed = 0;
    let mut line = Vec::new();

    while max_lines.map_or(true, |max| echoed < max) {
        write!(out, "Enter some text: ")?;
        out.flush()?;

        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            writeln!(out)?;
            break;
        }

        let text = String::from_utf8_lossy(&line);
        writeln!(out, "child received: {}", text.trim_end_matches(['\n', '\r']))?;
        out.flush()?;
        echoed += 1;
        debug!(line = echoed, "echoed input line");
    }

    out.flush()?;
    info!(lines = echoed, "echo job finished");
    Ok(echoed)
}

/// Copy a file, prompting on `input` for any path not given
///
/// The source is opened (and released on every error path) before the
/// destination is created. Returns the number of bytes copied.
pub fn run_copy<R: BufRead, W: Write>(
    mut input: R,
    mut out: W,
    source: Option<&Path>,
    dest: Option<&Path>,
) -> Result<u64, ChildError> {
    writeln!(out, "Child process (PID={}) is running.", std::process::id())?;

    let source = match source {
        Some(path) => path.to_path_buf(),
        None => prompt_path(&mut input, &mut out, "input source file path.", "source path")?,
    };
    let src = open_resource(&source, |path| File::open(path))?;

    let dest = match dest {
        Some(path) => path.to_path_buf(),
        None => prompt_path(&mut input, &mut out, "input dest file path.", "destination path")?,
    };
    let dst = open_resource(&dest, |path| File::create(path))?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dst);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;

    writeln!(out, "file copy completed ({} bytes)", bytes)?;
    out.flush()?;
    info!(source = %source.display(), dest = %dest.display(), bytes, "copy job finished");
    Ok(bytes)
}

fn prompt_path<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
    what: &str,
) -> Result<PathBuf, ChildError> {
    writeln!(out, "{}", prompt)?;
    out.flush()?;

    let mut line = Vec::new();
    input.read_until(b'\n', &mut line)?;
    let path = trim_ascii_whitespace(&line);
    if path.is_empty() {
        return Err(ChildError::MissingInput(what.to_string()));
    }
    Ok(PathBuf::from(OsStr::from_bytes(path)))
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |last| last + 1);
    &bytes[start..end]
}

fn open_resource<F>(path: &Path, open: F) -> Result<File, ChildError>
where
    F: FnOnce(&Path) -> io::Result<File>,
{
    open(path).map_err(|e| ChildError::ResourceUnavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
