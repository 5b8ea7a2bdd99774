//! End-to-end composition of a re-voiced video.
//!
//! Pipeline per request:
//! 1. Probe the original audio and validate the edits against it
//! 2. Synthesize and adapt every phrase, fanned out over worker threads
//! 3. Plan the segment timeline from the clips' actual durations
//! 4. Compile the filter program and run it once over all inputs
//! 5. Remove transient clips, re-probe the output and describe it

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::Result;

use super::adapt::adapt;
use super::cleanup::TransientFiles;
use crate::cache::{speech_key, SpeechCache};
use crate::config::ComposerConfig;
use crate::error::ComposeError;
use crate::media::{MediaEngine, OutputOptions};
use crate::names::{fresh_output_path, public_link, transient_clip_path};
use crate::speech::Synthesizer;
use crate::timeline::{compile, plan_timeline, validate_edits, InputBindings, PlacedEdit};
use crate::types::{AdaptMode, AdaptedClip, ComposeRequest, ComposeResponse, PhraseEdit};

pub struct Composer {
    config: ComposerConfig,
    synthesizer: Arc<dyn Synthesizer>,
    engine: Arc<dyn MediaEngine>,
    cache: Option<SpeechCache>,
}

impl Composer {
    pub fn new(
        config: ComposerConfig,
        synthesizer: Arc<dyn Synthesizer>,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            config,
            synthesizer,
            engine,
            cache: None,
        }
    }

    /// Reuse raw synthesized clips across requests.
    pub fn with_cache(mut self, cache: SpeechCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the edited windows of the original audio with synthesized
    /// speech and mux the result under the original video.
    ///
    /// Every transient clip is removed before returning, on success and
    /// on failure alike.
    pub fn compose(&self, request: &ComposeRequest) -> Result<ComposeResponse, ComposeError> {
        let transient = TransientFiles::new();
        let result = self.compose_with(request, &transient);
        let removed = transient.remove_all();
        result.map_err(|e| e.scrub_paths(&removed))
    }

    fn compose_with(
        &self,
        request: &ComposeRequest,
        transient: &TransientFiles,
    ) -> Result<ComposeResponse, ComposeError> {
        let audio = &request.original_audio;
        let total = self
            .engine
            .probe_duration(audio)
            .map_err(|e| ComposeError::probe(audio, e))?;
        validate_edits(&request.edits, total)?;

        // Errors name phrases by their position in the request, not on the timeline.
        let mut edits: Vec<(usize, &PhraseEdit)> = request.edits.iter().enumerate().collect();
        edits.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));
        log::info!(
            "Composing {} phrase(s) over {:.3}s of audio",
            edits.len(),
            total
        );

        self.ensure_work_dir()?;
        let clips = self.prepare_clips(&edits, transient)?;

        let placed: Vec<PlacedEdit> = edits
            .iter()
            .zip(&clips)
            .map(|((_, edit), clip)| PlacedEdit {
                start: edit.start,
                actual_duration: clip.actual_duration,
            })
            .collect();
        let segments = plan_timeline(&placed, total)?;
        let program = compile(&segments, &InputBindings::sequential(1, clips.len()))?;
        log::debug!(
            "Planned {} segment(s), {} filter op(s)",
            segments.len(),
            program.ops.len()
        );

        let mut inputs = vec![request.original_video.clone(), audio.clone()];
        inputs.extend(clips.iter().map(|c| c.source_path.clone()));

        let output_dir = self.output_dir_for(audio);
        let output = fresh_output_path(&output_dir, &self.config.output_ext).map_err(|e| {
            ComposeError::CompositionFailed(format!(
                "cannot prepare output in {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        self.engine
            .execute(
                &inputs,
                &program,
                &OutputOptions::replace_audio(0, &self.config.audio_codec),
                &output,
            )
            .map_err(|e| ComposeError::CompositionFailed(e.to_string()))?;
        log::info!("Wrote {}", output.display());

        let duration = self
            .engine
            .probe_duration(&output)
            .map_err(|e| ComposeError::probe(&output, e))?;
        Ok(self.describe(&output, duration))
    }

    /// Synthesize and adapt every edit, keeping the order of `edits`.
    ///
    /// Each edit carries its index in the request, which failures report.
    ///
    /// Work runs in batches of `max_parallel` threads; a batch is always
    /// joined completely before an error is returned, so no worker is
    /// still writing when cleanup starts.
    fn prepare_clips(
        &self,
        edits: &[(usize, &PhraseEdit)],
        transient: &TransientFiles,
    ) -> Result<Vec<AdaptedClip>, ComposeError> {
        let width = self.config.max_parallel.max(1);
        let mut clips = Vec::with_capacity(edits.len());

        for chunk in edits.chunks(width) {
            let results: Vec<Result<AdaptedClip, ComposeError>> = thread::scope(|s| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|&(index, edit)| {
                        (index, s.spawn(move || self.prepare_clip(index, edit, transient)))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|(index, handle)| {
                        handle.join().unwrap_or_else(|_| {
                            Err(ComposeError::SynthesisFailed {
                                index,
                                message: "worker thread panicked".into(),
                            })
                        })
                    })
                    .collect()
            });

            for result in results {
                clips.push(result?);
            }
        }
        Ok(clips)
    }

    fn prepare_clip(
        &self,
        index: usize,
        edit: &PhraseEdit,
        transient: &TransientFiles,
    ) -> Result<AdaptedClip, ComposeError> {
        let raw_path = transient_clip_path(&self.config.work_dir, self.synthesizer.clip_ext());
        transient.track(&raw_path);
        self.synthesize_to(&edit.label, &raw_path)
            .map_err(|e| ComposeError::SynthesisFailed {
                index,
                message: format!("{:#}", e),
            })?;

        let raw_duration = self
            .engine
            .probe_duration(&raw_path)
            .map_err(|e| ComposeError::probe(&raw_path, e))?;

        let out_path = transient_clip_path(&self.config.work_dir, &self.config.clip_ext);
        transient.track(&out_path);
        let adapted = adapt(
            self.engine.as_ref(),
            &raw_path,
            raw_duration,
            Some(edit.duration),
            edit.mode,
            &out_path,
        )?;

        let actual_duration = if adapted == raw_path {
            raw_duration
        } else {
            self.engine
                .probe_duration(&adapted)
                .map_err(|e| ComposeError::probe(&adapted, e))?
        };
        log::debug!(
            "Phrase {} ({}): {:.3}s raw, {:.3}s adapted, window {:.3}s",
            index,
            edit.mode,
            raw_duration,
            actual_duration,
            edit.duration
        );

        Ok(AdaptedClip {
            source_path: adapted,
            actual_duration,
        })
    }

    /// Synthesize `text` into `output`, going through the cache when set.
    fn synthesize_to(&self, text: &str, output: &Path) -> Result<()> {
        let ext = self.synthesizer.clip_ext();
        let key = speech_key(self.synthesizer.name(), &self.config.language, text);

        if let Some(cache) = &self.cache {
            match cache.fetch(&key, ext, output) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => log::warn!("Speech cache read failed: {:#}", e),
            }
        }

        self.synthesizer
            .synthesize(text, &self.config.language, output)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&key, ext, output) {
                log::warn!("Speech cache write failed: {:#}", e);
            }
        }
        Ok(())
    }

    /// Synthesize one phrase on its own, optionally adapted to `duration`.
    ///
    /// The clip is written to the output directory (the work directory
    /// when none is configured) and described like a composed video.
    pub fn preview(
        &self,
        text: &str,
        duration: Option<f64>,
        mode: AdaptMode,
    ) -> Result<ComposeResponse, ComposeError> {
        if text.trim().is_empty() {
            return Err(ComposeError::InvalidTimeline(
                "nothing to synthesize".into(),
            ));
        }
        let transient = TransientFiles::new();
        let result = self.preview_with(text, duration, mode, &transient);
        let removed = transient.remove_all();
        result.map_err(|e| e.scrub_paths(&removed))
    }

    fn preview_with(
        &self,
        text: &str,
        duration: Option<f64>,
        mode: AdaptMode,
        transient: &TransientFiles,
    ) -> Result<ComposeResponse, ComposeError> {
        self.ensure_work_dir()?;
        let raw_path = transient_clip_path(&self.config.work_dir, self.synthesizer.clip_ext());
        transient.track(&raw_path);
        self.synthesize_to(text, &raw_path)
            .map_err(|e| ComposeError::SynthesisFailed {
                index: 0,
                message: format!("{:#}", e),
            })?;
        let raw_duration = self
            .engine
            .probe_duration(&raw_path)
            .map_err(|e| ComposeError::probe(&raw_path, e))?;

        let output_dir = self
            .config
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.work_dir.clone());
        let prepare = |ext: &str| {
            fresh_output_path(&output_dir, ext).map_err(|e| {
                ComposeError::CompositionFailed(format!(
                    "cannot prepare output in {}: {}",
                    output_dir.display(),
                    e
                ))
            })
        };

        let adapted_path = prepare(&self.config.clip_ext)?;
        let adapted = adapt(
            self.engine.as_ref(),
            &raw_path,
            raw_duration,
            duration,
            mode,
            &adapted_path,
        )?;

        let output = if adapted == raw_path {
            let output = prepare(self.synthesizer.clip_ext())?;
            std::fs::copy(&raw_path, &output).map_err(|e| {
                ComposeError::CompositionFailed(format!(
                    "cannot write {}: {}",
                    output.display(),
                    e
                ))
            })?;
            output
        } else {
            adapted
        };

        let duration = self
            .engine
            .probe_duration(&output)
            .map_err(|e| ComposeError::probe(&output, e))?;
        log::info!("Wrote {} ({:.3}s)", output.display(), duration);
        Ok(self.describe(&output, duration))
    }

    fn ensure_work_dir(&self) -> Result<(), ComposeError> {
        std::fs::create_dir_all(&self.config.work_dir).map_err(|e| {
            ComposeError::CompositionFailed(format!(
                "cannot create work directory {}: {}",
                self.config.work_dir.display(),
                e
            ))
        })
    }

    /// Produced files go next to the original audio unless configured.
    fn output_dir_for(&self, audio: &Path) -> PathBuf {
        if let Some(dir) = &self.config.output_dir {
            return dir.clone();
        }
        match audio.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn describe(&self, output: &Path, duration: f64) -> ComposeResponse {
        ComposeResponse {
            link: public_link(output, self.config.public_root.as_deref()),
            duration,
            ext: output
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
            name: output
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }
}
