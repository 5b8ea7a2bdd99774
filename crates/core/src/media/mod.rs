//! Media processing engine interface.
//!
//! The composer only needs two things from a media engine: the audio
//! duration of a file, and the execution of a [`FilterProgram`] over an
//! ordered list of input files.

pub mod ffmpeg;
pub mod probe;
pub mod runner;

use std::path::{Path, PathBuf};

use crate::error::MediaError;
use crate::timeline::FilterProgram;

pub use ffmpeg::FfmpegEngine;

/// How the engine writes the produced file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputOptions {
    /// Input index whose first video stream is copied unmodified
    pub video_passthrough: Option<usize>,
    /// Audio codec; the engine picks one from the extension when `None`
    pub audio_codec: Option<String>,
    /// Move container metadata to the front for streaming
    pub faststart: bool,
    /// Stop at the end of the shortest output stream
    pub shortest: bool,
}

impl OutputOptions {
    /// A plain audio file.
    pub fn audio_only() -> Self {
        Self::default()
    }

    /// A video with its picture copied from `video_input` and a new audio track.
    pub fn replace_audio(video_input: usize, audio_codec: &str) -> Self {
        Self {
            video_passthrough: Some(video_input),
            audio_codec: Some(audio_codec.to_string()),
            faststart: true,
            shortest: true,
        }
    }
}

/// External media engine used by the adapter and the composer.
pub trait MediaEngine: Send + Sync {
    /// Duration of the audio stream of `path`, in seconds.
    fn probe_duration(&self, path: &Path) -> Result<f64, MediaError>;

    /// Apply `program` to `inputs` and write the result to `output`.
    fn execute(
        &self,
        inputs: &[PathBuf],
        program: &FilterProgram,
        options: &OutputOptions,
        output: &Path,
    ) -> Result<PathBuf, MediaError>;
}
