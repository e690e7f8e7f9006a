//! Stillcast - turn an audio track into an MP4
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod server;
