//! File-based cache for synthesized speech.
//!
//! Raw clips are keyed by a SHA-256 of backend, language and text. Hits
//! are copied out to a caller-owned path, so deleting a transient clip
//! never touches the cache.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Get the default cache directory.
///
/// Uses `REVOICE_CACHE_DIR` env var if set, otherwise `~/.cache/revoice`.
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REVOICE_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".cache").join("revoice")
}

/// Cache key for one synthesis request; a 64-character hex string.
pub fn speech_key(backend: &str, language: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [backend, language, text] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Atomically copy a file into place via temp file + rename.
fn atomic_copy(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = target.with_extension("tmp");
    std::fs::copy(source, &tmp_path)
        .with_context(|| format!("Failed to copy {} into cache", source.display()))?;
    std::fs::rename(&tmp_path, target)?;
    Ok(())
}

/// Synthesized clips stored under one root directory.
#[derive(Debug, Clone)]
pub struct SpeechCache {
    root: PathBuf,
}

impl SpeechCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache rooted at [`cache_dir`].
    pub fn from_env() -> Self {
        Self::new(cache_dir())
    }

    fn entry(&self, key: &str, ext: &str) -> PathBuf {
        self.root.join("speech").join(format!("{}.{}", key, ext))
    }

    /// Copy a cached clip to `dest`. Returns false on a miss.
    pub fn fetch(&self, key: &str, ext: &str, dest: &Path) -> Result<bool> {
        let path = self.entry(key, ext);
        if !path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
            return Ok(false);
        }
        std::fs::copy(&path, dest)
            .with_context(|| format!("Failed to copy cached clip to {}", dest.display()))?;
        log::info!("Cache hit: speech ({}...)", &key[..12.min(key.len())]);
        Ok(true)
    }

    /// Store a freshly synthesized clip.
    pub fn store(&self, key: &str, ext: &str, clip: &Path) -> Result<()> {
        atomic_copy(clip, &self.entry(key, ext))?;
        log::info!("Cached speech ({}...)", &key[..12.min(key.len())]);
        Ok(())
    }
}
