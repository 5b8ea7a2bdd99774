//! Fit a synthesized clip to its requested window.

use std::path::{Path, PathBuf};

use crate::error::ComposeError;
use crate::media::{MediaEngine, OutputOptions};
use crate::timeline::build_tempo_chain;
use crate::timeline::graph::{pad_program, tempo_program};
use crate::timeline::tempo::chained_duration;
use crate::types::AdaptMode;

/// Adapt the clip at `raw_path` to `target` seconds.
///
/// Returns the path holding the adapted audio: `out_path` when the engine
/// was invoked, `raw_path` when no adaptation was needed (no target, or
/// fill mode with speech already at least as long as the window).
pub fn adapt(
    engine: &dyn MediaEngine,
    raw_path: &Path,
    raw_duration: f64,
    target: Option<f64>,
    mode: AdaptMode,
    out_path: &Path,
) -> Result<PathBuf, ComposeError> {
    let target = match target {
        Some(t) if t > 0.0 => t,
        _ => return Ok(raw_path.to_path_buf()),
    };

    let program = match mode {
        AdaptMode::Stretch => {
            let stages = build_tempo_chain(raw_duration / target);
            log::debug!(
                "Stretching {:.3}s clip to {:.3}s with tempo stages {:?} (expect {:.3}s)",
                raw_duration,
                target,
                stages,
                chained_duration(raw_duration, &stages)
            );
            tempo_program(&stages)
        }
        AdaptMode::Fill => {
            if raw_duration >= target {
                log::debug!(
                    "Clip is {:.3}s, window {:.3}s: keeping it as is",
                    raw_duration,
                    target
                );
                return Ok(raw_path.to_path_buf());
            }
            log::debug!("Padding {:.3}s clip to {:.3}s", raw_duration, target);
            pad_program(target)
        }
    };

    engine
        .execute(
            &[raw_path.to_path_buf()],
            &program,
            &OutputOptions::audio_only(),
            out_path,
        )
        .map_err(|e| ComposeError::AdaptationFailed {
            mode,
            target,
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_clip, FakeEngine};

    fn setup(raw: f64) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("raw.mp3");
        write_clip(&raw_path, raw);
        let out = dir.path().join("adapted.wav");
        (dir, raw_path, out)
    }

    #[test]
    fn test_fill_pads_short_clip() {
        let engine = FakeEngine::default();
        let (_dir, raw, out) = setup(3.0);
        let path = adapt(&engine, &raw, 3.0, Some(5.0), AdaptMode::Fill, &out).unwrap();
        assert_eq!(path, out);
        assert!((engine.probe_duration(&path).unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_keeps_long_clip() {
        let engine = FakeEngine::default();
        let (_dir, raw, out) = setup(6.0);
        let path = adapt(&engine, &raw, 6.0, Some(5.0), AdaptMode::Fill, &out).unwrap();
        assert_eq!(path, raw);
        assert!(!out.exists());
        assert_eq!(engine.executions(), 0);
        assert!((engine.probe_duration(&path).unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_stretch_converges() {
        let engine = FakeEngine::default();
        let (_dir, raw, out) = setup(10.0);
        let path = adapt(&engine, &raw, 10.0, Some(2.0), AdaptMode::Stretch, &out).unwrap();
        assert!((engine.probe_duration(&path).unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_stretch_slows_short_clip() {
        let engine = FakeEngine::default();
        let (_dir, raw, out) = setup(1.0);
        let path = adapt(&engine, &raw, 1.0, Some(3.0), AdaptMode::Stretch, &out).unwrap();
        assert!((engine.probe_duration(&path).unwrap() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_unset_target_returns_raw() {
        let engine = FakeEngine::default();
        let (_dir, raw, out) = setup(4.0);
        for target in [None, Some(0.0), Some(-1.0)] {
            let path = adapt(&engine, &raw, 4.0, target, AdaptMode::Stretch, &out).unwrap();
            assert_eq!(path, raw);
        }
        assert_eq!(engine.executions(), 0);
    }

    #[test]
    fn test_engine_failure_is_adaptation_failed() {
        let engine = FakeEngine {
            fail_execute: true,
            ..FakeEngine::default()
        };
        let (_dir, raw, out) = setup(3.0);
        let err = adapt(&engine, &raw, 3.0, Some(5.0), AdaptMode::Fill, &out).unwrap_err();
        match err {
            ComposeError::AdaptationFailed { mode, target, .. } => {
                assert_eq!(mode, AdaptMode::Fill);
                assert_eq!(target, 5.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
