use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::ComposeError;

/// How a synthesized clip is reconciled with its requested window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdaptMode {
    /// Time-scale the speech so it lasts exactly the window.
    Stretch,
    /// Pad short speech with silence; never truncate long speech.
    Fill,
}

impl fmt::Display for AdaptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdaptMode::Stretch => write!(f, "stretch"),
            AdaptMode::Fill => write!(f, "fill"),
        }
    }
}

/// One caller request to replace a window of the audio track with speech.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhraseEdit {
    /// Text to synthesize
    pub label: String,
    /// Offset into the original track (seconds)
    pub start: f64,
    /// Requested window length (seconds)
    pub duration: f64,
    pub mode: AdaptMode,
}

impl PhraseEdit {
    /// End of the requested window in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A synthesized clip after duration adaptation.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedClip {
    pub source_path: PathBuf,
    /// Duration re-probed from the adapted file (seconds)
    pub actual_duration: f64,
}

/// Inputs of one composition request.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub original_video: PathBuf,
    pub original_audio: PathBuf,
    pub edits: Vec<PhraseEdit>,
}

/// Descriptor of a produced video, in the shape handed back to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposeResponse {
    pub link: String,
    /// Audio duration probed from the produced file (seconds)
    pub duration: f64,
    /// Extension including the leading dot, e.g. ".mp4"
    pub ext: String,
    /// File name of the produced video
    pub name: String,
}

/// Parse the JSON wire shape of an edit batch.
///
/// Anything other than a JSON array of `{label, start, duration, mode}`
/// objects is rejected as an invalid timeline.
pub fn parse_edits(json: &str) -> Result<Vec<PhraseEdit>, ComposeError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|_| ComposeError::InvalidTimeline("phrases must be a json array".into()))?;
    if !value.is_array() {
        return Err(ComposeError::InvalidTimeline(
            "phrases must be a json array".into(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| ComposeError::InvalidTimeline(format!("malformed phrase: {}", e)))
}
