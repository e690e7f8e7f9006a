//! Startup validation.
//!
//! [`Settings::resolve`] runs every process-wide check once and hands back an
//! immutable value the orchestrator is built from. Any failure here is a
//! [`Error::Startup`] and the process must not serve requests.

use std::path::PathBuf;
use std::time::Duration;

use stillcast_av::{ArtifactStore, ToolRegistry};
use stillcast_common::{Error, Result};

use super::{Config, ImagePolicy};

/// Validated, resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Resolved ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// Optional limit on a single transcode.
    pub timeout: Option<Duration>,
    /// Scratch directory, already created.
    pub store: ArtifactStore,
    pub image_policy: ImagePolicy,
    /// Fixed image, present iff the policy uses one. Verified to exist.
    pub default_image: Option<PathBuf>,
    /// Language tag for soft subtitle tracks.
    pub subtitle_language: String,
}

impl Settings {
    /// Discover tools on `PATH` and validate `config`.
    pub fn resolve(config: &Config) -> Result<Self> {
        let tools = ToolRegistry::discover(config.tools.ffmpeg_path.as_deref());
        Self::resolve_with(config, &tools)
    }

    /// Validate `config` against an already discovered tool registry.
    pub fn resolve_with(config: &Config, tools: &ToolRegistry) -> Result<Self> {
        let ffmpeg = tools
            .require("ffmpeg")
            .map_err(|_| {
                Error::Startup(
                    "ffmpeg not found. Install FFmpeg and ensure it is on PATH \
                     (or set tools.ffmpeg_path)"
                        .into(),
                )
            })?
            .path
            .clone();

        let default_image = if config.image.policy.uses_fixed_image() {
            let image = &config.image.default_image;
            if !image.is_file() {
                return Err(Error::Startup(format!(
                    "default image {} not found (required by image policy {:?})",
                    image.display(),
                    config.image.policy
                )));
            }
            Some(image.clone())
        } else {
            None
        };

        let store = ArtifactStore::open(&config.storage.scratch_dir).map_err(|e| {
            Error::Startup(format!(
                "cannot create scratch directory {}: {e}",
                config.storage.scratch_dir.display()
            ))
        })?;

        tracing::info!(
            ffmpeg = %ffmpeg.display(),
            scratch_dir = %store.root().display(),
            image_policy = ?config.image.policy,
            "Startup checks passed"
        );

        Ok(Self {
            ffmpeg,
            timeout: config.tools.timeout(),
            store,
            image_policy: config.image.policy,
            default_image,
            subtitle_language: config.subtitles.language.clone(),
        })
    }
}
