use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub subtitles: SubtitleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size in MiB (audio + image + subtitle together)
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_max_upload_mb() -> usize {
    512
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory for in-flight uploads and outputs
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("temp_files")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Kill ffmpeg after this many seconds (0 = never)
    #[serde(default)]
    pub timeout_secs: u64,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Where the picture track comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePolicy {
    /// Always use the fixed default image; uploaded images are ignored
    AlwaysFixed,
    /// Use the uploaded image, or the fixed default image when none is sent
    #[default]
    OptionalWithFixedFallback,
    /// Never produce a video track; uploaded images are ignored
    NoImageSupport,
}

impl ImagePolicy {
    /// Whether this policy needs the fixed default image on disk.
    pub fn uses_fixed_image(&self) -> bool {
        matches!(
            self,
            ImagePolicy::AlwaysFixed | ImagePolicy::OptionalWithFixedFallback
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub policy: ImagePolicy,

    /// Fixed image used by `always_fixed` and as the fallback
    #[serde(default = "default_image")]
    pub default_image: PathBuf,
}

fn default_image() -> PathBuf {
    PathBuf::from("logo.png")
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            policy: ImagePolicy::default(),
            default_image: default_image(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubtitleConfig {
    /// Language tag written on soft subtitle tracks
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "eng".to_string()
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}
