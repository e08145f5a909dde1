//! Child-process execution for the libwebp tools.
//!
//! Runs one tool invocation to completion, optionally feeding stdin from a
//! byte stream, and captures stdout, stderr and the exit status.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::debug;

use crate::adapter::ByteReader;
use crate::error::{Result, WebpError};
use crate::provision::Tool;

/// Captured result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Stdout decoded as UTF-8, lossily.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Removes every newline and carriage-return character.
pub fn strip_line_breaks(text: &str) -> String {
    text.replace(['\n', '\r'], "")
}

/// Runs `program` with `args`, feeding `stdin` if given.
///
/// Stdin is closed immediately when no stream is supplied. The call does
/// not retry.
///
/// # Errors
///
/// - [`WebpError::Spawn`] if the program cannot be started.
/// - [`WebpError::Invocation`] if it exits with a non-zero status.
/// - [`WebpError::Io`] if feeding stdin fails for a reason other than the
///   tool closing its end early.
pub async fn execute(
    tool: Tool,
    program: &Path,
    args: &[OsString],
    stdin: Option<ByteReader>,
) -> Result<ProcessOutput> {
    debug!(program = %program.display(), ?args, "Running {}", tool);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| WebpError::Spawn {
        program: program.to_path_buf(),
        source,
    })?;

    let feeder = match (stdin, child.stdin.take()) {
        (Some(mut reader), Some(mut pipe)) => Some(tokio::spawn(async move {
            let copied = tokio::io::copy(&mut reader, &mut pipe).await;
            // Closing the pipe signals EOF to the tool.
            drop(pipe);
            copied
        })),
        _ => None,
    };

    let output = child.wait_with_output().await?;

    let fed = match feeder {
        Some(handle) => Some(
            handle
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
        ),
        None => None,
    };

    let result = ProcessOutput {
        status: output.status,
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.success() {
        return Err(WebpError::Invocation {
            tool: tool.to_string(),
            code: result.code(),
            stderr: result.stderr.trim().to_string(),
        });
    }

    match fed {
        Some(Ok(bytes)) => debug!("Fed {} bytes to {} stdin", bytes, tool),
        Some(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("{} closed stdin early", tool);
        }
        Some(Err(e)) => return Err(e.into()),
        None => {}
    }

    debug!(
        stdout_bytes = result.stdout.len(),
        stderr = %result.stderr.trim(),
        "{} finished",
        tool
    );

    Ok(result)
}
