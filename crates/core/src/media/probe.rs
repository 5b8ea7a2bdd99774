//! Audio duration probing: ffprobe JSON parsing and a native fallback.

use std::path::Path;

use serde::Deserialize;

use crate::error::MediaError;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Pick the audio duration out of `ffprobe -show_streams -show_format -of json`.
///
/// Prefers the first audio stream's duration, since container and audio
/// durations differ when a video stream is present, then falls back to
/// the container duration. `None` when neither is reported.
pub fn parse_probe_json(json: &[u8]) -> Result<Option<f64>, MediaError> {
    let probe: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| MediaError::Probe(format!("invalid ffprobe JSON: {}", e)))?;

    let audio = probe
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("audio"))
        .find_map(|s| parse_seconds(s.duration.as_deref()));
    if audio.is_some() {
        return Ok(audio);
    }

    Ok(probe
        .format
        .and_then(|f| parse_seconds(f.duration.as_deref())))
}

/// Audio duration computed by reading the file with symphonia.
///
/// Uses the frame count from the stream header when present, otherwise
/// sums packet durations.
pub fn native_audio_duration(path: &Path) -> Result<f64, MediaError> {
    use symphonia::core::codecs::CODEC_TYPE_NULL;
    use symphonia::core::errors::Error as SymphError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| MediaError::Probe(format!("unsupported format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MediaError::Probe("no audio track found".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    if let (Some(frames), Some(sr)) = (params.n_frames, params.sample_rate) {
        if sr > 0 {
            return Ok(frames as f64 / sr as f64);
        }
    }

    let mut total: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    total += packet.dur();
                }
            }
            Err(SymphError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphError::ResetRequired) => break,
            Err(e) => return Err(MediaError::Probe(format!("read error: {}", e))),
        }
    }

    if let Some(tb) = params.time_base {
        let time = tb.calc_time(total);
        return Ok(time.seconds as f64 + time.frac);
    }
    match params.sample_rate {
        Some(sr) if sr > 0 => Ok(total as f64 / sr as f64),
        _ => Err(MediaError::Probe("stream has no timing information".to_string())),
    }
}
