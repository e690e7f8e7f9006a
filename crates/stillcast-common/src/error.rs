//! Unified error type for stillcast.
//!
//! Startup problems, per-job failures and request validation all end up in
//! [`Error`], which carries enough context for the HTTP layer to pick a status
//! code via [`Error::http_status`].

use std::path::PathBuf;

/// Unified error type covering all failure modes in stillcast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The process cannot serve requests (missing tool, missing fixed asset,
    /// unusable scratch directory).
    #[error("Startup configuration error: {0}")]
    Startup(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request body exceeded the configured upload limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Writing an uploaded payload to scratch storage failed.
    #[error("Failed to persist upload to {}: {source}", path.display())]
    Persist {
        /// Scratch path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The transcoder ran and exited non-zero.
    #[error("{tool} conversion failed: {message}")]
    Transcode {
        /// Name of the tool that failed.
        tool: String,
        /// The tool's diagnostic output, trimmed.
        message: String,
    },

    /// An external tool could not be run to completion (spawn failure, timeout).
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    ///
    /// Everything that goes wrong inside a job is a 500; only malformed
    /// requests are the caller's fault.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::PayloadTooLarge(_) => 413,
            Error::Startup(_)
            | Error::Persist { .. }
            | Error::Transcode { .. }
            | Error::Tool { .. }
            | Error::Io { .. }
            | Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Startup(_) => "startup_error",
            Error::Validation(_) => "validation_error",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::Persist { .. } => "persist_error",
            Error::Transcode { .. } => "transcode_error",
            Error::Tool { .. } => "tool_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::Persist`].
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Persist {
            path: path.into(),
            source,
        }
    }

    /// Convenience constructor for [`Error::Transcode`].
    pub fn transcode(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transcode {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
