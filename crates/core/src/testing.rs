//! In-crate fakes for engine-free tests.
//!
//! Fake clips are text files holding their duration in seconds. The fake
//! media engine reads those durations back and evaluates filter programs
//! numerically, so timing properties can be checked without ffmpeg.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::error::MediaError;
use crate::media::{MediaEngine, OutputOptions};
use crate::speech::Synthesizer;
use crate::timeline::{BufferRef, FilterKind, FilterProgram};

pub fn write_clip(path: &Path, duration: f64) {
    std::fs::write(path, duration.to_string()).unwrap();
}

pub fn read_clip(path: &Path) -> Result<f64, MediaError> {
    let text = std::fs::read_to_string(path)?;
    text.trim()
        .parse::<f64>()
        .map_err(|_| MediaError::Probe(format!("{} is not a fake clip", path.display())))
}

/// Synthesizer writing fake clips. Unknown labels last one second.
#[derive(Default)]
pub struct FakeSynth {
    pub durations: HashMap<String, f64>,
    pub delays: HashMap<String, Duration>,
    pub fail_label: Option<String>,
    pub calls: Mutex<Vec<String>>,
    pub written: Mutex<Vec<PathBuf>>,
}

impl FakeSynth {
    pub fn with_durations(pairs: &[(&str, f64)]) -> Self {
        Self {
            durations: pairs.iter().map(|(l, d)| (l.to_string(), *d)).collect(),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Synthesizer for FakeSynth {
    fn name(&self) -> &str {
        "fake"
    }

    fn clip_ext(&self) -> &str {
        "mp3"
    }

    fn synthesize(&self, text: &str, _language: &str, output: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some(delay) = self.delays.get(text) {
            std::thread::sleep(*delay);
        }
        if self.fail_label.as_deref() == Some(text) {
            bail!("synthesis refused for {}", output.display());
        }
        write_clip(output, self.durations.get(text).copied().unwrap_or(1.0));
        self.written.lock().unwrap().push(output.to_path_buf());
        Ok(())
    }
}

/// One recorded [`MediaEngine::execute`] call.
#[derive(Debug, Clone)]
pub struct Execution {
    pub inputs: Vec<PathBuf>,
    pub input_durations: Vec<f64>,
    pub program: FilterProgram,
    pub options: OutputOptions,
    pub output: PathBuf,
}

#[derive(Default)]
pub struct FakeEngine {
    pub fail_execute: bool,
    /// Fail only executions that pass video through, i.e. final composes.
    pub fail_compose: bool,
    pub log: Mutex<Vec<Execution>>,
}

impl FakeEngine {
    pub fn executions(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Execution> {
        self.log.lock().unwrap().last().cloned()
    }
}

fn evaluate(program: &FilterProgram, inputs: &[f64]) -> Result<f64, MediaError> {
    let mut buffers: HashMap<&str, f64> = HashMap::new();
    for op in &program.ops {
        let mut values = Vec::with_capacity(op.inputs.len());
        for input in &op.inputs {
            let value = match input {
                BufferRef::Input(i) => inputs.get(*i).copied(),
                BufferRef::Named(name) => buffers.get(name.as_str()).copied(),
            };
            values.push(value.ok_or_else(|| MediaError::Probe(format!("unknown buffer {}", input)))?);
        }
        let first = values.first().copied().unwrap_or(0.0);
        let result = match &op.kind {
            FilterKind::Trim { start, end } => {
                (end.map_or(first, |e| e.min(first)) - start).max(0.0)
            }
            FilterKind::ResetTimestamps | FilterKind::Resample => first,
            FilterKind::Concat => values.iter().sum(),
            FilterKind::Pad { whole_duration } => match whole_duration {
                Some(d) => first.max(*d),
                None => f64::INFINITY,
            },
            FilterKind::Tempo { factor } => first / factor,
        };
        buffers.insert(op.output.as_str(), result);
    }
    program
        .output()
        .and_then(|name| buffers.get(name).copied())
        .ok_or(MediaError::EmptyProgram)
}

impl MediaEngine for FakeEngine {
    fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        read_clip(path)
    }

    fn execute(
        &self,
        inputs: &[PathBuf],
        program: &FilterProgram,
        options: &OutputOptions,
        output: &Path,
    ) -> Result<PathBuf, MediaError> {
        let input_durations = inputs
            .iter()
            .map(|p| read_clip(p))
            .collect::<Result<Vec<_>, _>>()?;
        self.log.lock().unwrap().push(Execution {
            inputs: inputs.to_vec(),
            input_durations: input_durations.clone(),
            program: program.clone(),
            options: options.clone(),
            output: output.to_path_buf(),
        });

        if self.fail_execute || (self.fail_compose && options.video_passthrough.is_some()) {
            let culprit = inputs
                .last()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(MediaError::Failed {
                tool: "fake".into(),
                code: 1,
                stderr: format!("{}: Invalid data found", culprit),
            });
        }

        let mut duration = evaluate(program, &input_durations)?;
        if options.shortest {
            if let Some(video) = options.video_passthrough.and_then(|v| input_durations.get(v)) {
                duration = duration.min(*video);
            }
        }
        if !duration.is_finite() {
            return Err(MediaError::Probe("unbounded output".into()));
        }
        write_clip(output, duration);
        Ok(output.to_path_buf())
    }
}
