//! Builder for executing external tool commands.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use stillcast_common::{Error, Result};
use tokio::process::Command;

/// Outcome of one external process invocation.
///
/// Only success/failure is interpreted; the captured text is carried along
/// untouched apart from lossy UTF-8 decoding and trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ProcessResult {
    /// The tool's diagnostic output (its error stream).
    pub fn diagnostic(&self) -> &str {
        &self.stderr
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use stillcast_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> stillcast_common::Result<()> {
/// let result = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .args(["-y", "-i", "in.aac", "-vn", "-c:a", "copy", "out.mp4"])
///     .execute()
///     .await?;
/// if !result.success {
///     eprintln!("{}", result.diagnostic());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time. Without one the command may run
    /// indefinitely.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// A non-zero exit is **not** an error here; it is reported through
    /// [`ProcessResult::success`] so the caller decides what failure means.
    ///
    /// The child is killed if this future is dropped before it completes.
    ///
    /// # Errors
    ///
    /// - Returns [`Error::Tool`] if spawning the process fails.
    /// - Returns [`Error::Tool`] if the process outlives the timeout (message
    ///   includes the timeout duration).
    pub async fn execute(&self) -> Result<ProcessResult> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                // Dropping the wait future drops the child, which kills it.
                Err(_elapsed) => {
                    return Err(Error::tool(
                        program_name,
                        format!("timed out after {limit:?}"),
                    ))
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| Error::tool(&program_name, format!("I/O error waiting for process: {e}")))?;

        Ok(ProcessResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
