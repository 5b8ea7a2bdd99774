//! Engine-agnostic filter programs and the timeline compiler.
//!
//! A [`FilterProgram`] is an ordered list of operations over named
//! buffers. Inputs are referenced by position in the file list handed to
//! the media engine; only the engine knows how to turn the program into
//! a concrete invocation.

use std::fmt;

use super::plan::Segment;
use crate::error::ComposeError;

/// A buffer consumed by an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferRef {
    /// The first audio stream of the input file at this index.
    Input(usize),
    /// A buffer produced by an earlier operation.
    Named(String),
}

impl fmt::Display for BufferRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferRef::Input(i) => write!(f, "{}:a:0", i),
            BufferRef::Named(name) => write!(f, "{}", name),
        }
    }
}

/// The operations a program may contain.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Keep audio from `start` up to `end` (to the end of input when `None`).
    Trim { start: f64, end: Option<f64> },
    /// Restart the buffer's clock at zero.
    ResetTimestamps,
    /// Join all inputs, in order, into one audio buffer.
    Concat,
    /// Normalise timestamp and sample-rate drift.
    Resample,
    /// Append silence, up to `whole_duration` when given.
    Pad { whole_duration: Option<f64> },
    /// Change speed without changing pitch; `factor` in `[0.5, 2.0]`.
    Tempo { factor: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOp {
    pub kind: FilterKind,
    pub inputs: Vec<BufferRef>,
    pub output: String,
}

/// Ordered operations whose last output is the produced audio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterProgram {
    pub ops: Vec<FilterOp>,
}

impl FilterProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation and return a reference to its output buffer.
    pub fn push(
        &mut self,
        kind: FilterKind,
        inputs: Vec<BufferRef>,
        output: impl Into<String>,
    ) -> BufferRef {
        let output = output.into();
        self.ops.push(FilterOp {
            kind,
            inputs,
            output: output.clone(),
        });
        BufferRef::Named(output)
    }

    /// Name of the terminal buffer, if the program has any operation.
    pub fn output(&self) -> Option<&str> {
        self.ops.last().map(|op| op.output.as_str())
    }

    /// Highest input index referenced by any operation.
    pub fn max_input_index(&self) -> Option<usize> {
        self.ops
            .iter()
            .flat_map(|op| op.inputs.iter())
            .filter_map(|b| match b {
                BufferRef::Input(i) => Some(*i),
                BufferRef::Named(_) => None,
            })
            .max()
    }
}

/// Which input index feeds each kind of segment.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBindings {
    /// Input index of the original audio track
    pub original_audio: usize,
    /// Input index of each adapted clip, by clip index
    pub clips: Vec<usize>,
}

impl InputBindings {
    /// Bindings for inputs laid out as `[fixed..., original, clip0, clip1, ...]`.
    pub fn sequential(original_audio: usize, clip_count: usize) -> Self {
        Self {
            original_audio,
            clips: (0..clip_count).map(|i| original_audio + 1 + i).collect(),
        }
    }
}

/// Compile a planned timeline into a filter program.
///
/// Each segment becomes a trim (original audio) or a direct reference
/// (replacement clip) followed by a timestamp reset; the segment buffers
/// are concatenated in timeline order, resampled and padded.
pub fn compile(
    segments: &[Segment],
    bindings: &InputBindings,
) -> Result<FilterProgram, ComposeError> {
    if segments.is_empty() {
        return Err(ComposeError::InvalidTimeline(
            "cannot compile an empty timeline".into(),
        ));
    }

    let mut program = FilterProgram::new();
    let mut parts = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let source = match *segment {
            Segment::Original { from, to } => program.push(
                FilterKind::Trim {
                    start: from,
                    end: to,
                },
                vec![BufferRef::Input(bindings.original_audio)],
                format!("seg{}_trim", i),
            ),
            Segment::Replacement { clip_index } => {
                let input = bindings.clips.get(clip_index).copied().ok_or_else(|| {
                    ComposeError::InvalidTimeline(format!(
                        "segment {} references clip {} but only {} clips are bound",
                        i,
                        clip_index,
                        bindings.clips.len()
                    ))
                })?;
                BufferRef::Input(input)
            }
        };
        parts.push(program.push(
            FilterKind::ResetTimestamps,
            vec![source],
            format!("seg{}", i),
        ));
    }

    let joined = program.push(FilterKind::Concat, parts, "aout_raw");
    let resampled = program.push(FilterKind::Resample, vec![joined], "aout_pad");
    program.push(
        FilterKind::Pad {
            whole_duration: None,
        },
        vec![resampled],
        "aout",
    );

    Ok(program)
}

/// Program applying a tempo cascade to input 0.
pub fn tempo_program(stages: &[f64]) -> FilterProgram {
    let mut program = FilterProgram::new();
    let mut current = BufferRef::Input(0);
    for (i, &factor) in stages.iter().enumerate() {
        current = program.push(
            FilterKind::Tempo { factor },
            vec![current],
            format!("tempo{}", i),
        );
    }
    program
}

/// Program padding input 0 with silence up to `whole_duration` seconds.
pub fn pad_program(whole_duration: f64) -> FilterProgram {
    let mut program = FilterProgram::new();
    program.push(
        FilterKind::Pad {
            whole_duration: Some(whole_duration),
        },
        vec![BufferRef::Input(0)],
        "padded",
    );
    program
}
