//! Error taxonomy for composition and external engine calls.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::AdaptMode;

/// Failures surfaced to callers of the composition pipeline.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Malformed or overlapping edit set, detected before any synthesis.
    #[error("invalid timeline: {0}")]
    InvalidTimeline(String),

    /// The speech engine failed for one phrase.
    #[error("speech synthesis failed for phrase {index}: {message}")]
    SynthesisFailed { index: usize, message: String },

    /// A tempo or pad operation failed for one clip.
    #[error("{mode} adaptation to {target:.3}s failed: {message}")]
    AdaptationFailed {
        mode: AdaptMode,
        target: f64,
        message: String,
    },

    /// The final graph execution failed.
    #[error("composition failed: {0}")]
    CompositionFailed(String),

    /// Duration probing failed for an input.
    #[error("failed to probe duration of {path}: {message}")]
    ProbeFailed { path: PathBuf, message: String },
}

impl ComposeError {
    /// Replace every mention of the given paths in the error text.
    ///
    /// Used after transient files are removed so no returned error
    /// refers to a file that no longer exists.
    pub fn scrub_paths(self, removed: &[PathBuf]) -> Self {
        let scrub = |text: String| -> String {
            removed.iter().fold(text, |acc, p| {
                acc.replace(&p.display().to_string(), "<removed clip>")
            })
        };
        match self {
            ComposeError::InvalidTimeline(m) => ComposeError::InvalidTimeline(scrub(m)),
            ComposeError::SynthesisFailed { index, message } => ComposeError::SynthesisFailed {
                index,
                message: scrub(message),
            },
            ComposeError::AdaptationFailed {
                mode,
                target,
                message,
            } => ComposeError::AdaptationFailed {
                mode,
                target,
                message: scrub(message),
            },
            ComposeError::CompositionFailed(m) => ComposeError::CompositionFailed(scrub(m)),
            ComposeError::ProbeFailed { path, message } => {
                let path = if removed.contains(&path) {
                    PathBuf::from("<removed clip>")
                } else {
                    path
                };
                ComposeError::ProbeFailed {
                    path,
                    message: scrub(message),
                }
            }
        }
    }

    pub(crate) fn probe(path: &Path, err: impl std::fmt::Display) -> Self {
        ComposeError::ProbeFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Failures of an external media engine invocation.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code}: {stderr}")]
    Failed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("{tool} timed out after {seconds:.0}s")]
    Timeout { tool: String, seconds: f64 },

    #[error("unusable probe output: {0}")]
    Probe(String),

    #[error("empty filter program")]
    EmptyProgram,

    /// A program or output option names an input that was not supplied.
    #[error("input {index} is referenced but only {inputs} input(s) were given")]
    InputOutOfRange { index: usize, inputs: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptation_failed_message() {
        let err = ComposeError::AdaptationFailed {
            mode: AdaptMode::Fill,
            target: 5.0,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "fill adaptation to 5.000s failed: boom");
    }

    #[test]
    fn test_scrub_paths_in_message() {
        let clip = PathBuf::from("/tmp/work/abc.wav");
        let err = ComposeError::CompositionFailed(format!(
            "ffmpeg exited with code 1: {}: Invalid data",
            clip.display()
        ));
        let scrubbed = err.scrub_paths(&[clip.clone()]).to_string();
        assert!(!scrubbed.contains("/tmp/work/abc.wav"));
        assert!(scrubbed.contains("<removed clip>"));
    }

    #[test]
    fn test_scrub_paths_probe_path() {
        let clip = PathBuf::from("/tmp/work/abc.wav");
        let err = ComposeError::ProbeFailed {
            path: clip.clone(),
            message: "no streams".into(),
        };
        match err.scrub_paths(&[clip]) {
            ComposeError::ProbeFailed { path, .. } => {
                assert_eq!(path, PathBuf::from("<removed clip>"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scrub_leaves_unrelated_paths() {
        let err = ComposeError::ProbeFailed {
            path: PathBuf::from("/data/audio.aac"),
            message: "bad".into(),
        };
        let scrubbed = err.scrub_paths(&[PathBuf::from("/tmp/x.wav")]);
        assert!(scrubbed.to_string().contains("/data/audio.aac"));
    }

    #[test]
    fn test_media_error_timeout_message() {
        let err = MediaError::Timeout {
            tool: "ffmpeg".into(),
            seconds: 30.0,
        };
        assert_eq!(err.to_string(), "ffmpeg timed out after 30s");
    }
}
