//! Job orchestration.
//!
//! One [`Orchestrator::convert`] call is one job:
//!
//! ```text
//! Received -> InputsSaved -> CommandBuilt -> Running -> Succeeded | Failed
//! ```
//!
//! Every scratch path is registered with the job's [`CleanupGuard`] before it
//! is written. On failure the guard runs immediately; on success it travels
//! inside [`ConvertedMedia`] and runs once the output has been delivered. If
//! the job's future is dropped mid-way (client went away) the guard runs on
//! drop and ffmpeg is killed with it.

mod delivery;

pub use delivery::{CleanupStream, ConvertedMedia};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use stillcast_av::store::sanitize_file_name;
use stillcast_av::{
    mux_args, ArtifactStore, CleanupGuard, FfmpegRunner, MuxInputs, ProcessRunner, SubtitleMode,
};
use stillcast_common::{Error, JobId, Result};

use crate::config::{ImagePolicy, Settings};

/// One uploaded payload.
#[derive(Debug, Clone)]
pub struct Upload {
    /// File name as sent by the client.
    pub file_name: String,
    pub data: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// Everything a caller provides for one conversion.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub audio: Upload,
    pub image: Option<Upload>,
    pub subtitle: Option<Upload>,
    /// Only meaningful when `subtitle` is present.
    pub subtitle_mode: SubtitleMode,
}

impl ConversionRequest {
    pub fn audio_only(audio: Upload) -> Self {
        Self {
            audio,
            image: None,
            subtitle: None,
            subtitle_mode: SubtitleMode::default(),
        }
    }
}

/// Lifecycle of a job, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    InputsSaved,
    CommandBuilt,
    Running,
    Succeeded,
    Failed,
}

/// Picture source after the image policy has been applied.
enum ImageChoice<'a> {
    None,
    Fixed(&'a Path),
    Uploaded(&'a Upload),
}

/// Coordinates storage, argument building and the transcoder for each job.
pub struct Orchestrator {
    store: ArtifactStore,
    runner: Arc<dyn ProcessRunner>,
    image_policy: ImagePolicy,
    default_image: Option<PathBuf>,
    subtitle_language: String,
}

impl Orchestrator {
    /// Build an orchestrator that runs the resolved ffmpeg binary.
    pub fn from_settings(settings: Settings) -> Self {
        let runner = FfmpegRunner::new(settings.ffmpeg.clone()).with_timeout(settings.timeout);
        Self::with_runner(settings, Arc::new(runner))
    }

    /// Build an orchestrator around an arbitrary [`ProcessRunner`].
    pub fn with_runner(settings: Settings, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            store: settings.store,
            runner,
            image_policy: settings.image_policy,
            default_image: settings.default_image,
            subtitle_language: settings.subtitle_language,
        }
    }

    /// Run one job to completion.
    ///
    /// On success the returned [`ConvertedMedia`] owns the cleanup
    /// obligation for all of the job's files. On failure those files are
    /// already gone.
    pub async fn convert(&self, request: ConversionRequest) -> Result<ConvertedMedia> {
        self.convert_as(JobId::new(), request).await
    }

    async fn convert_as(&self, job: JobId, request: ConversionRequest) -> Result<ConvertedMedia> {
        let mut guard = self.store.guard();
        transition(job, JobState::Received);

        match self.run_job(job, &request, &mut guard).await {
            Ok((output, len)) => {
                transition(job, JobState::Succeeded);
                tracing::info!(job_id = %job, bytes = len, "Conversion succeeded");
                Ok(ConvertedMedia::new(
                    job,
                    output,
                    len,
                    download_name(&request.audio.file_name),
                    guard,
                ))
            }
            Err(e) => {
                transition(job, JobState::Failed);
                tracing::warn!(job_id = %job, error = %e, "Conversion failed");
                guard.run();
                Err(e)
            }
        }
    }

    async fn run_job(
        &self,
        job: JobId,
        request: &ConversionRequest,
        guard: &mut CleanupGuard,
    ) -> Result<(PathBuf, u64)> {
        let image = self.choose_image(request.image.as_ref())?;

        // Reject impossible shapes before anything touches the disk.
        if request.subtitle.is_some() && matches!(image, ImageChoice::None) {
            return Err(Error::Validation(
                "subtitles require an image; this request would produce audio-only output".into(),
            ));
        }

        let audio_path = self.persist(job, "audio", &request.audio, guard).await?;
        let image_path = match image {
            ImageChoice::None => None,
            ImageChoice::Fixed(path) => Some(path.to_path_buf()),
            ImageChoice::Uploaded(upload) => Some(self.persist(job, "image", upload, guard).await?),
        };
        let subtitle_path = match &request.subtitle {
            Some(upload) => Some(self.persist(job, "subtitle", upload, guard).await?),
            None => None,
        };
        let output = self.store.allocate(job, "output.mp4");
        guard.track(&output);
        transition(job, JobState::InputsSaved);

        let args = mux_args(&MuxInputs {
            audio: &audio_path,
            image: image_path.as_deref(),
            subtitle: subtitle_path
                .as_deref()
                .map(|path| (path, request.subtitle_mode)),
            output: &output,
            subtitle_language: &self.subtitle_language,
        })?;
        transition(job, JobState::CommandBuilt);

        transition(job, JobState::Running);
        let result = self.runner.run(&args).await?;
        if !result.success {
            return Err(Error::transcode(
                self.runner.tool_name(),
                result.diagnostic(),
            ));
        }

        let len = match tokio::fs::metadata(&output).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            Ok(_) => {
                return Err(Error::Internal(format!(
                    "{} exited successfully but wrote an empty file",
                    self.runner.tool_name()
                )))
            }
            Err(e) => {
                return Err(Error::Internal(format!(
                    "{} exited successfully but output is unreadable: {e}",
                    self.runner.tool_name()
                )))
            }
        };

        Ok((output, len))
    }

    fn choose_image<'a>(&'a self, uploaded: Option<&'a Upload>) -> Result<ImageChoice<'a>> {
        match (self.image_policy, uploaded) {
            (ImagePolicy::NoImageSupport, upload) => {
                if upload.is_some() {
                    tracing::debug!("Ignoring uploaded image: image support is disabled");
                }
                Ok(ImageChoice::None)
            }
            (ImagePolicy::AlwaysFixed, upload) => {
                if upload.is_some() {
                    tracing::debug!("Ignoring uploaded image: fixed image policy");
                }
                self.fixed_image()
            }
            (ImagePolicy::OptionalWithFixedFallback, Some(upload)) => {
                Ok(ImageChoice::Uploaded(upload))
            }
            (ImagePolicy::OptionalWithFixedFallback, None) => self.fixed_image(),
        }
    }

    fn fixed_image(&self) -> Result<ImageChoice<'_>> {
        self.default_image
            .as_deref()
            .map(ImageChoice::Fixed)
            .ok_or_else(|| Error::Internal("no default image configured".into()))
    }

    async fn persist(
        &self,
        job: JobId,
        role: &str,
        upload: &Upload,
        guard: &mut CleanupGuard,
    ) -> Result<PathBuf> {
        let name = format!("{role}_{}", sanitize_file_name(&upload.file_name));
        let path = self.store.allocate(job, &name);
        guard.track(&path);

        tokio::fs::write(&path, &upload.data)
            .await
            .map_err(|e| Error::persist(&path, e))?;

        tracing::debug!(
            job_id = %job,
            path = %path.display(),
            bytes = upload.data.len(),
            "Saved {role} upload"
        );
        Ok(path)
    }
}

fn transition(job: JobId, state: JobState) {
    tracing::debug!(job_id = %job, state = ?state, "Job state");
}

/// `converted_<audio stem>.mp4`, restricted to header-safe characters.
pub fn download_name(audio_file_name: &str) -> String {
    let safe = sanitize_file_name(audio_file_name);
    let stem = Path::new(&safe)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(safe);
    format!("converted_{stem}.mp4")
}
