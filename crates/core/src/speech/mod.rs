//! Speech synthesis interface and backends.
//!
//! Provides raw speech clips for phrase labels:
//! - GoogleSynthesizer: Google translate TTS over HTTP (MP3)
//! - EspeakSynthesizer: local espeak-ng (subprocess, WAV)

#[cfg(feature = "google-tts")]
pub mod google;

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::config::{call_timeout, GoogleTtsConfig};
use crate::media::runner;

#[cfg(feature = "google-tts")]
pub use google::GoogleSynthesizer;

/// Speech synthesis backend trait.
pub trait Synthesizer: Send + Sync {
    /// Backend name for caching/display.
    fn name(&self) -> &str;

    /// Extension of the clips this backend writes, without the dot.
    fn clip_ext(&self) -> &str;

    /// Synthesize `text` spoken in `language` into the file at `output`.
    fn synthesize(&self, text: &str, language: &str, output: &Path) -> Result<()>;
}

/// espeak-ng backend via subprocess.
pub struct EspeakSynthesizer {
    pub program: String,
    /// Upper bound for one espeak-ng call, in seconds (non-positive disables)
    pub timeout_s: f64,
}

impl EspeakSynthesizer {
    pub fn timeout(&self) -> Option<Duration> {
        call_timeout(self.timeout_s)
    }
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            timeout_s: 300.0,
        }
    }
}

impl Synthesizer for EspeakSynthesizer {
    fn name(&self) -> &str {
        "espeak"
    }

    fn clip_ext(&self) -> &str {
        "wav"
    }

    fn synthesize(&self, text: &str, language: &str, output: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-v")
            .arg(language)
            .arg("-w")
            .arg(output)
            .arg("--")
            .arg(text);
        runner::run(cmd, &self.program, self.timeout())
            .with_context(|| format!("Failed to synthesize with {}", self.program))?;
        Ok(())
    }
}

/// Check if espeak-ng is available on the system.
pub fn espeak_available() -> bool {
    Command::new("espeak-ng")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Get a synthesis backend by name.
///
/// Modes:
/// - "google": Google translate TTS (needs the `google-tts` feature).
/// - "espeak": local espeak-ng.
/// - "auto": Google when compiled in, otherwise espeak-ng if installed.
pub fn get_synthesizer(name: &str, google: &GoogleTtsConfig) -> Result<Box<dyn Synthesizer>> {
    match name {
        "google" => google_backend(google),
        "espeak" => Ok(Box::new(EspeakSynthesizer::default())),
        "auto" => {
            if cfg!(feature = "google-tts") {
                google_backend(google)
            } else if espeak_available() {
                log::info!("Google TTS not compiled in, using espeak-ng");
                Ok(Box::new(EspeakSynthesizer::default()))
            } else {
                bail!("No speech backend available: build with 'google-tts' or install espeak-ng")
            }
        }
        _ => bail!("Unknown synthesizer: '{}'. Available: google, espeak, auto", name),
    }
}

#[cfg(feature = "google-tts")]
fn google_backend(config: &GoogleTtsConfig) -> Result<Box<dyn Synthesizer>> {
    Ok(Box::new(GoogleSynthesizer::new(config.clone())?))
}

#[cfg(not(feature = "google-tts"))]
fn google_backend(_config: &GoogleTtsConfig) -> Result<Box<dyn Synthesizer>> {
    bail!(
        "Google TTS requires the 'google-tts' feature. \
         Build with: cargo build --features google-tts"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_espeak_name_and_ext() {
        let synth = EspeakSynthesizer::default();
        assert_eq!(synth.name(), "espeak");
        assert_eq!(synth.clip_ext(), "wav");
    }

    #[test]
    fn test_get_synthesizer_espeak() {
        let synth = get_synthesizer("espeak", &GoogleTtsConfig::default()).unwrap();
        assert_eq!(synth.name(), "espeak");
    }

    #[cfg(feature = "google-tts")]
    #[test]
    fn test_get_synthesizer_google() {
        let synth = get_synthesizer("google", &GoogleTtsConfig::default()).unwrap();
        assert_eq!(synth.name(), "google");
        assert_eq!(synth.clip_ext(), "mp3");
    }

    #[test]
    fn test_get_synthesizer_unknown() {
        assert!(get_synthesizer("nonexistent", &GoogleTtsConfig::default()).is_err());
    }

    #[test]
    fn test_missing_program_fails() {
        let synth = EspeakSynthesizer {
            program: "revoice-no-such-tts-binary".to_string(),
            ..EspeakSynthesizer::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let result = synth.synthesize("hello", "en", &dir.path().join("out.wav"));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_program_times_out() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("hung-tts");
        std::fs::write(&stub, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        let synth = EspeakSynthesizer {
            program: stub.display().to_string(),
            timeout_s: 0.2,
        };
        let started = Instant::now();
        let err = synth
            .synthesize("hello", "en", &dir.path().join("out.wav"))
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(format!("{:#}", err).contains("timed out"));
    }

    #[test]
    fn test_default_timeout() {
        let synth = EspeakSynthesizer::default();
        assert_eq!(synth.timeout(), Some(Duration::from_secs(300)));
    }
}
