//! Revoice CLI: replace spoken phrases in a video's audio track.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use revoice_core::cache::SpeechCache;
use revoice_core::compose::Composer;
use revoice_core::config::{ComposerConfig, FfmpegConfig, GoogleTtsConfig};
use revoice_core::media::{FfmpegEngine, MediaEngine};
use revoice_core::names::transient_clip_path;
use revoice_core::speech::{Synthesizer, get_synthesizer};
use revoice_core::types::{AdaptMode, ComposeRequest, ComposeResponse, parse_edits};

// ─── Top-level CLI ───────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "revoice",
    about = "Replace phrases of a video's audio track with synthesized speech",
    version,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace phrases of a video's audio track
    Compose(ComposeArgs),
    /// Synthesize a single phrase for preview
    Speak(SpeakArgs),
    /// Extract a video's audio track
    Extract(ExtractArgs),
    /// Print audio durations
    Probe(ProbeArgs),
}

// ─── Shared arguments (embedded in each subcommand) ──────────────

#[derive(Parser, Debug)]
struct EngineArgs {
    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe executable
    #[arg(long, default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Timeout for a single ffmpeg/ffprobe call in seconds (0 to disable)
    #[arg(long, default_value_t = 300.0)]
    timeout: f64,

    /// Show verbose output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl EngineArgs {
    fn engine(&self) -> FfmpegEngine {
        FfmpegEngine::new(FfmpegConfig {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
            timeout_s: self.timeout,
        })
    }
}

#[derive(Parser, Debug)]
struct SpeechArgs {
    /// Synthesis language code
    #[arg(long, default_value = "ru")]
    language: String,

    /// Speech backend
    #[arg(long, default_value = "auto", value_parser = ["auto", "google", "espeak"])]
    synthesizer: String,

    /// Directory for transient clips
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Make response links relative to this directory
    #[arg(long)]
    public_root: Option<PathBuf>,

    /// Disable the synthesized speech cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,
}

// ─── Compose ─────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Replace phrases of a video's audio track with synthesized speech")]
struct ComposeArgs {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    speech: SpeechArgs,

    /// Original video
    #[arg(long)]
    video: PathBuf,

    /// Original audio track (extracted from the video when omitted)
    #[arg(long)]
    audio: Option<PathBuf>,

    /// JSON file with the phrase array ("-" for stdin)
    #[arg(long)]
    phrases: PathBuf,

    /// Maximum number of phrases synthesized at once
    #[arg(long, default_value_t = 4)]
    max_parallel: usize,
}

// ─── Speak ───────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Synthesize a single phrase, optionally fitted to a duration")]
struct SpeakArgs {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    speech: SpeechArgs,

    /// Text to speak
    text: String,

    /// Target duration in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// How to fit the speech to --duration
    #[arg(long, default_value = "stretch", value_parser = ["stretch", "fill"])]
    mode: String,
}

// ─── Extract / Probe ─────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Extract the audio track of a video")]
struct ExtractArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Input video
    video: PathBuf,

    /// Output audio file (default: audio.aac next to the video)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Print the audio duration of media files")]
struct ProbeArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Audio/video files
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

// ─── Main ────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    // Init logging
    let verbose = match &cli.command {
        Command::Compose(a) => a.engine.verbose,
        Command::Speak(a) => a.engine.verbose,
        Command::Extract(a) => a.engine.verbose,
        Command::Probe(a) => a.engine.verbose,
    };
    let log_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Compose(args) => run_compose(args),
        Command::Speak(args) => run_speak(args),
        Command::Extract(args) => run_extract(args),
        Command::Probe(args) => run_probe(args),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    Ok(())
}

fn parse_mode(mode: &str) -> Result<AdaptMode> {
    match mode {
        "stretch" => Ok(AdaptMode::Stretch),
        "fill" => Ok(AdaptMode::Fill),
        other => bail!("Unknown mode: '{}'. Available: stretch, fill", other),
    }
}

fn read_phrases(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read phrases from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read phrases from {}", path.display()))
}

/// Build a composer from the shared flags.
fn build_composer(
    speech: &SpeechArgs,
    engine: FfmpegEngine,
    output_dir: Option<PathBuf>,
    max_parallel: usize,
) -> Result<Composer> {
    let defaults = ComposerConfig::default();
    let config = ComposerConfig {
        language: speech.language.clone(),
        work_dir: speech.work_dir.clone().unwrap_or(defaults.work_dir.clone()),
        output_dir,
        public_root: speech.public_root.clone(),
        max_parallel,
        ..defaults
    };

    let synthesizer = get_synthesizer(&speech.synthesizer, &GoogleTtsConfig::default())?;
    log::info!("Speech backend: {}", synthesizer.name());

    let mut composer = Composer::new(config, Arc::from(synthesizer), Arc::new(engine));
    if !speech.no_cache {
        composer = composer.with_cache(SpeechCache::from_env());
    }
    Ok(composer)
}

fn print_response(response: &ComposeResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

// ─── Compose runner ──────────────────────────────────────────────

fn run_compose(args: ComposeArgs) -> Result<()> {
    require_file(&args.video)?;
    let edits = parse_edits(&read_phrases(&args.phrases)?)?;
    log::info!("Loaded {} phrase(s)", edits.len());

    let engine = args.engine.engine();
    let video_dir = args
        .video
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    // Without an explicit track the audio is pulled out of the video into
    // the work dir; the output still lands next to the video.
    let (audio, extracted, output_dir) = match &args.audio {
        Some(audio) => {
            require_file(audio)?;
            (audio.clone(), false, args.speech.output_dir.clone())
        }
        None => {
            let work_dir = args
                .speech
                .work_dir
                .clone()
                .unwrap_or_else(|| ComposerConfig::default().work_dir);
            std::fs::create_dir_all(&work_dir)
                .with_context(|| format!("Failed to create {}", work_dir.display()))?;
            let audio = transient_clip_path(&work_dir, "aac");
            log::info!("Extracting audio: {} -> {}", args.video.display(), audio.display());
            engine.extract_audio(&args.video, &audio)?;
            let output_dir = args.speech.output_dir.clone().or(Some(video_dir));
            (audio, true, output_dir)
        }
    };

    let composer = build_composer(&args.speech, engine, output_dir, args.max_parallel)?;
    let request = ComposeRequest {
        original_video: args.video.clone(),
        original_audio: audio.clone(),
        edits,
    };
    let result = composer.compose(&request);

    if extracted {
        if let Err(e) = std::fs::remove_file(&audio) {
            log::warn!("Failed to remove {}: {}", audio.display(), e);
        }
    }

    let response = result?;
    print_response(&response)
}

// ─── Speak runner ────────────────────────────────────────────────

fn run_speak(args: SpeakArgs) -> Result<()> {
    let mode = parse_mode(&args.mode)?;
    if let Some(d) = args.duration {
        if !d.is_finite() || d <= 0.0 {
            bail!("--duration must be a positive number of seconds");
        }
    }

    let engine = args.engine.engine();
    let composer = build_composer(&args.speech, engine, args.speech.output_dir.clone(), 1)?;
    let response = composer.preview(&args.text, args.duration, mode)?;
    print_response(&response)
}

// ─── Extract / Probe runners ─────────────────────────────────────

fn run_extract(args: ExtractArgs) -> Result<()> {
    require_file(&args.video)?;
    let output = match args.output {
        Some(p) => p,
        None => args
            .video
            .parent()
            .map(|p| p.join("audio.aac"))
            .unwrap_or_else(|| PathBuf::from("audio.aac")),
    };
    let engine = args.engine.engine();
    let path = engine.extract_audio(&args.video, &output)?;
    println!("Output: {}", path.display());
    Ok(())
}

fn run_probe(args: ProbeArgs) -> Result<()> {
    let engine = args.engine.engine();
    for file in &args.files {
        let duration = engine
            .probe_duration(file)
            .with_context(|| format!("Failed to probe {}", file.display()))?;
        println!("{}\t{:.3}", file.display(), duration);
    }
    Ok(())
}
