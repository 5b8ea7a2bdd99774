//! ffmpeg/ffprobe-backed [`MediaEngine`].

use std::path::{Path, PathBuf};
use std::process::Command;

use super::probe::{native_audio_duration, parse_probe_json};
use super::runner;
use super::{MediaEngine, OutputOptions};
use crate::config::FfmpegConfig;
use crate::error::MediaError;
use crate::timeline::{FilterKind, FilterOp, FilterProgram};

const SECONDS_DECIMALS: usize = 6;
const FACTOR_DECIMALS: usize = 9;

pub struct FfmpegEngine {
    config: FfmpegConfig,
}

impl FfmpegEngine {
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    fn tool_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }

    fn run_ffmpeg(&self, args: &[String], output: &Path) -> Result<(), MediaError> {
        let mut cmd = Command::new(&self.config.ffmpeg);
        cmd.args(args);
        let result = runner::run(
            cmd,
            &Self::tool_name(&self.config.ffmpeg),
            self.config.timeout(),
        );
        if let Err(e) = result {
            if output.exists() {
                if let Err(rm) = std::fs::remove_file(output) {
                    log::warn!("Failed to remove partial output {}: {}", output.display(), rm);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Copy the first audio stream of `video` into `output` as audio only.
    pub fn extract_audio(&self, video: &Path, output: &Path) -> Result<PathBuf, MediaError> {
        let args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            video.display().to_string(),
            "-map".to_string(),
            "0:a:0".to_string(),
            "-vn".to_string(),
            output.display().to_string(),
        ];
        self.run_ffmpeg(&args, output)?;
        log::info!("Extracted audio of {} to {}", video.display(), output.display());
        Ok(output.to_path_buf())
    }
}

/// Format a number for a filter argument, without trailing zeros.
fn fmt_num(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value);
    if !text.contains('.') {
        return text;
    }
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        t => t.to_string(),
    }
}

fn render_filter(op: &FilterOp) -> String {
    match &op.kind {
        FilterKind::Trim { start, end } => {
            let mut args = Vec::new();
            if *start > 0.0 || end.is_none() {
                args.push(format!("start={}", fmt_num(*start, SECONDS_DECIMALS)));
            }
            if let Some(end) = end {
                args.push(format!("end={}", fmt_num(*end, SECONDS_DECIMALS)));
            }
            format!("atrim={}", args.join(":"))
        }
        FilterKind::ResetTimestamps => "asetpts=PTS-STARTPTS".to_string(),
        FilterKind::Concat => format!("concat=n={}:v=0:a=1", op.inputs.len()),
        FilterKind::Resample => "aresample=async=1:first_pts=0".to_string(),
        FilterKind::Pad {
            whole_duration: None,
        } => "apad".to_string(),
        FilterKind::Pad {
            whole_duration: Some(d),
        } => format!("apad=whole_dur={}", fmt_num(*d, SECONDS_DECIMALS)),
        FilterKind::Tempo { factor } => format!("atempo={}", fmt_num(*factor, FACTOR_DECIMALS)),
    }
}

/// Render a program as an ffmpeg `-filter_complex` graph.
pub fn render_filter_graph(program: &FilterProgram) -> Result<String, MediaError> {
    if program.ops.is_empty() {
        return Err(MediaError::EmptyProgram);
    }
    let chains: Vec<String> = program
        .ops
        .iter()
        .map(|op| {
            let inputs: String = op.inputs.iter().map(|b| format!("[{}]", b)).collect();
            format!("{}{}[{}]", inputs, render_filter(op), op.output)
        })
        .collect();
    Ok(chains.join(";"))
}

/// Full ffmpeg argument list for one program execution.
pub fn build_args(
    inputs: &[PathBuf],
    program: &FilterProgram,
    options: &OutputOptions,
    output: &Path,
) -> Result<Vec<String>, MediaError> {
    let graph = render_filter_graph(program)?;
    let terminal = program.output().ok_or(MediaError::EmptyProgram)?;

    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for input in inputs {
        args.push("-i".into());
        args.push(input.display().to_string());
    }
    args.push("-filter_complex".into());
    args.push(graph);

    if let Some(video) = options.video_passthrough {
        args.push("-map".into());
        args.push(format!("{}:v:0", video));
    }
    args.push("-map".into());
    args.push(format!("[{}]", terminal));
    if options.video_passthrough.is_some() {
        args.push("-c:v".into());
        args.push("copy".into());
    }
    if let Some(codec) = &options.audio_codec {
        args.push("-c:a".into());
        args.push(codec.clone());
    }
    if options.faststart {
        args.push("-movflags".into());
        args.push("+faststart".into());
    }
    if options.shortest {
        args.push("-shortest".into());
    }
    if options.video_passthrough.is_some() {
        args.push("-fflags".into());
        args.push("+genpts".into());
    }
    args.push(output.display().to_string());
    Ok(args)
}

impl MediaEngine for FfmpegEngine {
    fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        if !path.exists() {
            return Err(MediaError::Probe(format!("{} does not exist", path.display())));
        }

        let mut cmd = Command::new(&self.config.ffprobe);
        cmd.args(["-v", "error", "-show_streams", "-show_format", "-of", "json"])
            .arg(path);
        let tool = Self::tool_name(&self.config.ffprobe);

        match runner::run(cmd, &tool, self.config.timeout()) {
            Ok(output) => {
                if let Some(duration) = parse_probe_json(&output.stdout)? {
                    return Ok(duration);
                }
                log::debug!("{} reported no duration for {}", tool, path.display());
            }
            Err(MediaError::Spawn { .. }) => {
                log::debug!("{} unavailable, reading {} natively", tool, path.display());
            }
            Err(e) => return Err(e),
        }

        native_audio_duration(path)
    }

    fn execute(
        &self,
        inputs: &[PathBuf],
        program: &FilterProgram,
        options: &OutputOptions,
        output: &Path,
    ) -> Result<PathBuf, MediaError> {
        let referenced = program.max_input_index().into_iter().chain(options.video_passthrough);
        for index in referenced {
            if index >= inputs.len() {
                return Err(MediaError::InputOutOfRange {
                    index,
                    inputs: inputs.len(),
                });
            }
        }
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let args = build_args(inputs, program, options, output)?;
        log::debug!(
            "Executing {} filter ops over {} inputs into {}",
            program.ops.len(),
            inputs.len(),
            output.display()
        );
        self.run_ffmpeg(&args, output)?;
        Ok(output.to_path_buf())
    }
}
