//! ffmpeg argument vectors for audio-to-MP4 muxing.
//!
//! The argument vector depends only on the job's *shape*: whether a still
//! image is used, whether a subtitle is attached, and how it is attached.
//!
//! | image | subtitle | video                      | audio | subtitle                   |
//! |-------|----------|----------------------------|-------|----------------------------|
//! | no    | no       | none                       | copy  | none                       |
//! | no    | yes      | rejected                   |       |                            |
//! | yes   | no       | x264 from looped image     | copy  | none                       |
//! | yes   | hard     | x264 from looped image     | copy  | burned in via `subtitles=` |
//! | yes   | soft     | x264 from looped image     | copy  | `mov_text` track, language |
//!
//! Every image variant normalizes to `yuv420p` and stops at the end of the
//! audio (`-shortest`). Every variant overwrites the output (`-y`).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use stillcast_common::{Error, Result};

/// Video codec used when a still image becomes the picture track.
const VIDEO_CODEC: &str = "libx264";
/// Pixel format most players can decode.
const PIXEL_FORMAT: &str = "yuv420p";
/// Text codec MP4 accepts for selectable subtitle tracks.
const SOFT_SUBTITLE_CODEC: &str = "mov_text";

/// How a subtitle file is attached to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubtitleMode {
    /// Rendered permanently into the video frames.
    #[default]
    Hard,
    /// Carried as a separate, selectable text track.
    Soft,
}

impl SubtitleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleMode::Hard => "hard",
            SubtitleMode::Soft => "soft",
        }
    }
}

impl fmt::Display for SubtitleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubtitleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hard" => Ok(SubtitleMode::Hard),
            "soft" => Ok(SubtitleMode::Soft),
            other => Err(Error::Validation(format!(
                "subtitle_mode must be 'hard' or 'soft', got '{other}'"
            ))),
        }
    }
}

/// The inputs that decide which argument vector is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MuxShape {
    pub image: bool,
    pub subtitle: Option<SubtitleMode>,
}

impl MuxShape {
    /// Reject shapes the builder cannot express.
    ///
    /// A subtitle needs a video track to live next to (or inside), so an
    /// audio-only job with a subtitle is a validation error.
    pub fn validate(&self) -> Result<()> {
        if !self.image && self.subtitle.is_some() {
            return Err(Error::Validation(
                "subtitles require an image; audio-only output cannot carry them".into(),
            ));
        }
        Ok(())
    }
}

/// Paths and options for one mux invocation.
#[derive(Debug, Clone, Copy)]
pub struct MuxInputs<'a> {
    pub audio: &'a Path,
    pub image: Option<&'a Path>,
    pub subtitle: Option<(&'a Path, SubtitleMode)>,
    pub output: &'a Path,
    /// Language tag written on soft subtitle tracks (e.g. `eng`).
    pub subtitle_language: &'a str,
}

impl MuxInputs<'_> {
    pub fn shape(&self) -> MuxShape {
        MuxShape {
            image: self.image.is_some(),
            subtitle: self.subtitle.map(|(_, mode)| mode),
        }
    }
}

/// Build the ffmpeg argument vector (program name excluded).
///
/// Pure: performs no I/O, and equal inputs always produce equal output.
///
/// # Errors
///
/// Returns [`Error::Validation`] for a subtitle without an image.
pub fn mux_args(inputs: &MuxInputs<'_>) -> Result<Vec<String>> {
    inputs.shape().validate()?;

    let mut args: Vec<String> = vec!["-y".into()];

    let Some(image) = inputs.image else {
        // Audio-only container.
        args.extend(["-i".into(), path_arg(inputs.audio)]);
        args.extend(["-vn", "-c:a", "copy"].map(String::from));
        args.push(path_arg(inputs.output));
        return Ok(args);
    };

    args.extend(["-loop".into(), "1".into(), "-i".into(), path_arg(image)]);
    args.extend(["-i".into(), path_arg(inputs.audio)]);

    match inputs.subtitle {
        None => {}
        Some((subtitle, SubtitleMode::Hard)) => {
            args.push("-vf".into());
            args.push(format!("subtitles={}", escape_filter_path(subtitle)));
        }
        Some((subtitle, SubtitleMode::Soft)) => {
            args.extend(["-i".into(), path_arg(subtitle)]);
            args.extend(["-map", "0:v", "-map", "1:a", "-map", "2:s"].map(String::from));
        }
    }

    args.extend(["-c:v", VIDEO_CODEC, "-pix_fmt", PIXEL_FORMAT, "-c:a", "copy"].map(String::from));

    if let Some((_, SubtitleMode::Soft)) = inputs.subtitle {
        args.extend(["-c:s", SOFT_SUBTITLE_CODEC].map(String::from));
        args.extend([
            "-metadata:s:s:0".into(),
            format!("language={}", inputs.subtitle_language),
        ]);
    }

    args.push("-shortest".into());
    args.push(path_arg(inputs.output));
    Ok(args)
}

/// Escape a path for use inside an ffmpeg filter argument.
///
/// Backslashes become forward slashes and `:` is escaped, because the filter
/// syntax uses `:` to separate options.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
