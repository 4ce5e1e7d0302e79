//! Child-process execution for the external media tools.

use crate::error::{ProcessingError, ProcessingResult};
use std::ffi::OsStr;
use std::path::{Component, Path};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Longest stderr excerpt carried in an error
const STDERR_EXCERPT_LEN: usize = 2048;

/// Reject paths containing shell metacharacters or `..` components.
pub fn validate_path(path: &str) -> ProcessingResult<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(ProcessingError::InvalidPath(format!(
            "Path contains dangerous characters: {}",
            path
        )));
    }

    if Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ProcessingError::InvalidPath(format!(
            "Path contains directory traversal: {}",
            path
        )));
    }

    Ok(())
}

/// Validate a configured executable name or path (e.g. `ffprobe`, `/usr/bin/ffmpeg`).
pub fn validate_executable(program: &str) -> ProcessingResult<()> {
    validate_path(program)?;

    if program.is_empty()
        || !program
            .chars()
            .all(|c| c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.')
    {
        return Err(ProcessingError::InvalidPath(format!(
            "Executable path contains unsafe characters: {}",
            program
        )));
    }

    Ok(())
}

/// Validate a file handed to a tool; it must exist and resolve without traversal.
pub fn validate_input(path: &Path) -> ProcessingResult<()> {
    validate_path(&path.to_string_lossy())?;
    if !path.is_file() {
        return Err(ProcessingError::InvalidPath(format!(
            "Input is not a file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Run `program` to completion under `deadline` and return its output on success.
///
/// Stdin is closed so a tool never blocks on a prompt. The child is spawned with
/// `kill_on_drop`, so hitting the deadline (or dropping the returned future) kills it.
pub async fn run_tool<I, S>(
    tool: &'static str,
    program: &str,
    args: I,
    deadline: Duration,
) -> ProcessingResult<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start = Instant::now();

    let mut command = Command::new(program);
    command
        .kill_on_drop(true)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = match tokio::time::timeout(deadline, command.output()).await {
        Ok(result) => result.map_err(|source| ProcessingError::Spawn { tool, source })?,
        Err(_) => {
            tracing::warn!(
                tool = tool,
                timeout_secs = deadline.as_secs(),
                "External tool timed out, child killed"
            );
            return Err(ProcessingError::Timeout {
                tool,
                timeout: deadline,
            });
        }
    };

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_LEN).collect();
        tracing::warn!(
            tool = tool,
            status = ?output.status.code(),
            duration_ms = duration_ms,
            stderr = %excerpt,
            "External tool failed"
        );
        return Err(ProcessingError::ToolFailed {
            tool,
            status: output.status.code(),
            stderr: excerpt,
        });
    }

    tracing::debug!(tool = tool, duration_ms = duration_ms, "External tool finished");

    Ok(output)
}
