//! Thin wrapper around `std::process::Command` for the external programs the pipeline
//! shells out to (tesseract, ffmpeg, espeak-ng).
//!
//! Output is always captured so a failure carries the tool's stderr instead of
//! interleaving it with our own logs.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::{Error, Result};

/// Run `cmd` to completion and return its captured output.
///
/// A non-zero exit status becomes [`Error::Tool`]. A program that cannot be spawned at all
/// (usually: not installed) gets a message naming it.
pub fn run(cmd: &mut Command) -> Result<Output> {
    run_impl(cmd, None)
}

/// Like [`run`], but writes `input` to the child's stdin first.
pub fn run_with_stdin(cmd: &mut Command, input: &[u8]) -> Result<Output> {
    run_impl(cmd, Some(input))
}

fn run_impl(cmd: &mut Command, input: Option<&[u8]>) -> Result<Output> {
    let program = program_name(cmd);
    debug!(program = %program, args = ?cmd.get_args().collect::<Vec<_>>(), "running tool");

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    if input.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    let mut child = cmd
        .spawn()
        .map_err(|err| Error::msg(format!("failed to start {program} (is it on PATH?): {err}")))?;

    // Dropping the handle closes the pipe so the child sees EOF. A failed write is held
    // back until the child is reaped: its exit status and stderr explain it better.
    let write_result = match (input, child.stdin.take()) {
        (Some(bytes), Some(mut stdin)) => stdin.write_all(bytes),
        _ => Ok(()),
    };

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(Error::Tool {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    write_result.map_err(|err| Error::msg(format!("failed to write stdin of {program}: {err}")))?;
    Ok(output)
}

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}
