//! # stillcast-av
//!
//! The media plumbing behind stillcast.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the paths of
//!   ffmpeg and ffprobe.
//! - **Command execution** ([`ToolCommand`], [`ProcessRunner`]) -- run an
//!   external process without blocking the runtime and capture its output as
//!   a [`ProcessResult`].
//! - **Scratch storage** ([`ArtifactStore`], [`CleanupGuard`]) -- per-job
//!   namespaced paths and guaranteed, idempotent deletion.
//! - **Argument building** ([`mux`]) -- map a job's shape (image? subtitle?
//!   which mode?) onto the ffmpeg argument vector that produces an MP4.

pub mod command;
pub mod mux;
pub mod runner;
pub mod store;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ProcessResult, ToolCommand};
pub use mux::{mux_args, MuxInputs, MuxShape, SubtitleMode};
pub use runner::{FfmpegRunner, ProcessRunner};
pub use store::{ArtifactStore, CleanupGuard};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
