//! Google translate TTS client.
//!
//! The endpoint accepts short texts only, so longer phrases are split
//! into chunks and the returned MP3 streams are appended to one file.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::Synthesizer;
use crate::config::GoogleTtsConfig;

pub struct GoogleSynthesizer {
    config: GoogleTtsConfig,
    client: reqwest::blocking::Client,
}

impl GoogleSynthesizer {
    pub fn new(config: GoogleTtsConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_s.max(1.0)))
            .user_agent("Mozilla/5.0")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }
}

impl Synthesizer for GoogleSynthesizer {
    fn name(&self) -> &str {
        "google"
    }

    fn clip_ext(&self) -> &str {
        "mp3"
    }

    fn synthesize(&self, text: &str, language: &str, output: &Path) -> Result<()> {
        let chunks = split_text(text, self.config.max_chunk_chars);
        if chunks.is_empty() {
            bail!("Nothing to synthesize");
        }

        let mut file = std::fs::File::create(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;

        for (idx, chunk) in chunks.iter().enumerate() {
            let query = [
                ("ie", "UTF-8".to_string()),
                ("q", chunk.clone()),
                ("tl", language.to_string()),
                ("total", chunks.len().to_string()),
                ("idx", idx.to_string()),
                ("textlen", chunk.chars().count().to_string()),
                ("client", "tw-ob".to_string()),
            ];
            let bytes = self
                .client
                .get(&self.config.endpoint)
                .query(&query)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.bytes())
                .with_context(|| format!("TTS request {}/{} failed", idx + 1, chunks.len()))?;
            if bytes.is_empty() {
                bail!("TTS request {}/{} returned no audio", idx + 1, chunks.len());
            }
            file.write_all(&bytes)?;
        }

        file.flush()?;
        log::debug!(
            "Synthesized {} chunk(s) to {}",
            chunks.len(),
            output.display()
        );
        Ok(())
    }
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Words are packed greedily; a chunk prefers to end after sentence
/// punctuation, and a single word longer than the limit is cut.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, chunks: &mut Vec<String>| {
        if !current.is_empty() {
            chunks.push(std::mem::take(current));
        }
    };

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if word_len > max_chars {
            flush(&mut current, &mut chunks);
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed > max_chars {
            flush(&mut current, &mut chunks);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);

        if word.ends_with(['.', '!', '?', ';', '…']) && current.chars().count() * 2 > max_chars {
            flush(&mut current, &mut chunks);
        }
    }
    flush(&mut current, &mut chunks);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_short_text() {
        assert_eq!(split_text("  привет   мир ", 100), vec!["привет мир"]);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_text("   ", 100).is_empty());
    }

    #[test]
    fn test_split_respects_limit() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = split_text(text, 12);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 12, "chunk too long: {:?}", c);
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_split_counts_chars_not_bytes() {
        // 6 Cyrillic chars = 12 bytes
        assert_eq!(split_text("привет", 6), vec!["привет"]);
    }

    #[test]
    fn test_split_long_word() {
        let chunks = split_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_split_prefers_sentence_end() {
        let chunks = split_text("Hello there friend. How are you", 30);
        assert_eq!(chunks, vec!["Hello there friend.", "How are you"]);
    }

    #[test]
    fn test_synthesizer_identity() {
        let synth = GoogleSynthesizer::new(GoogleTtsConfig::default()).unwrap();
        assert_eq!(synth.name(), "google");
        assert_eq!(synth.clip_ext(), "mp3");
    }
}
