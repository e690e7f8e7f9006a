//! The transcoder seam.
//!
//! The orchestrator only ever needs "run this argument vector and tell me how
//! it went", so that is all [`ProcessRunner`] exposes. [`FfmpegRunner`] is the
//! production implementation; tests substitute their own.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use stillcast_common::Result;

use crate::command::{ProcessResult, ToolCommand};

/// Runs one external transcode invocation to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Name of the tool, used in logs and error messages.
    fn tool_name(&self) -> &str;

    /// Run the tool with `args` and wait for it to exit.
    async fn run(&self, args: &[String]) -> Result<ProcessResult>;
}

/// [`ProcessRunner`] backed by a resolved ffmpeg executable.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            timeout: None,
        }
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ProcessRunner for FfmpegRunner {
    fn tool_name(&self) -> &str {
        "ffmpeg"
    }

    async fn run(&self, args: &[String]) -> Result<ProcessResult> {
        tracing::debug!("exec: {} {}", self.program.display(), args.join(" "));

        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.args(args.iter().cloned());
        if let Some(limit) = self.timeout {
            cmd.timeout(limit);
        }
        cmd.execute().await
    }
}
