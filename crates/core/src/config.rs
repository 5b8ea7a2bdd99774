//! Explicit configuration for the composer and its external engines.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Settings for one [`Composer`](crate::compose::Composer).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Language code handed to the speech engine
    pub language: String,
    /// Directory for transient synthesized/adapted clips
    pub work_dir: PathBuf,
    /// Where produced videos go; next to the original audio when unset
    pub output_dir: Option<PathBuf>,
    /// Extension of produced videos, without the dot
    pub output_ext: String,
    /// Codec for the replaced audio stream
    pub audio_codec: String,
    /// Extension of adapted clips, without the dot
    pub clip_ext: String,
    /// Root that response links are made relative to
    pub public_root: Option<PathBuf>,
    /// Maximum number of phrases synthesized at once
    pub max_parallel: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            language: "ru".to_string(),
            work_dir: std::env::temp_dir().join("revoice"),
            output_dir: None,
            output_ext: "mp4".to_string(),
            audio_codec: "aac".to_string(),
            clip_ext: "wav".to_string(),
            public_root: None,
            max_parallel: 4,
        }
    }
}

/// Deadline for one external call from a seconds value.
///
/// Non-positive, non-finite and out-of-range values mean no limit.
pub fn call_timeout(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() || seconds <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Settings for the ffmpeg-backed media engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    /// Upper bound for a single ffmpeg/ffprobe call, in seconds
    pub timeout_s: f64,
}

impl FfmpegConfig {
    /// Per-call timeout, or `None` when disabled (non-positive).
    pub fn timeout(&self) -> Option<Duration> {
        call_timeout(self.timeout_s)
    }
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            timeout_s: 300.0,
        }
    }
}

/// Settings for the Google translate TTS backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleTtsConfig {
    pub endpoint: String,
    pub timeout_s: f64,
    /// Longest text sent in one request, in characters
    pub max_chunk_chars: usize,
}

impl Default for GoogleTtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://translate.google.com/translate_tts".to_string(),
            timeout_s: 30.0,
            max_chunk_chars: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composer_defaults() {
        let config = ComposerConfig::default();
        assert_eq!(config.language, "ru");
        assert_eq!(config.output_ext, "mp4");
        assert_eq!(config.audio_codec, "aac");
        assert!(config.output_dir.is_none());
        assert!(config.max_parallel > 0);
    }

    #[test]
    fn test_composer_partial_json() {
        let config: ComposerConfig =
            serde_json::from_str(r#"{"language": "en", "max_parallel": 2}"#).unwrap();
        assert_eq!(config.language, "en");
        assert_eq!(config.max_parallel, 2);
        assert_eq!(config.clip_ext, "wav");
    }

    #[test]
    fn test_ffmpeg_timeout() {
        let mut config = FfmpegConfig::default();
        assert_eq!(config.timeout(), Some(Duration::from_secs(300)));
        config.timeout_s = 0.0;
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_huge_timeout_means_no_limit() {
        let config = FfmpegConfig {
            timeout_s: 1e30,
            ..FfmpegConfig::default()
        };
        assert_eq!(config.timeout(), None);
        assert_eq!(call_timeout(f64::INFINITY), None);
        assert_eq!(call_timeout(f64::NAN), None);
        assert_eq!(call_timeout(1.5), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_google_defaults() {
        let config = GoogleTtsConfig::default();
        assert_eq!(config.max_chunk_chars, 100);
        assert!(config.endpoint.starts_with("https://"));
    }
}
