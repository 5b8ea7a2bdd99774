//! Tracking and removal of transient clip files.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Transient files created while serving one request.
///
/// Paths are registered before the file is written, so a failure midway
/// still gets its partial file removed. Anything left is removed on drop.
#[derive(Debug, Default)]
pub struct TransientFiles {
    paths: Mutex<Vec<PathBuf>>,
}

impl TransientFiles {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a path for removal.
    pub fn track(&self, path: &Path) {
        let mut paths = self.guard();
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_path_buf());
        }
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every tracked file that exists, best-effort.
    ///
    /// Returns every tracked path, so callers can scrub them from error
    /// messages. Failures are logged and do not stop the sweep.
    pub fn remove_all(&self) -> Vec<PathBuf> {
        let paths = std::mem::take(&mut *self.guard());
        let mut removed = 0;
        for path in &paths {
            if !path.exists() {
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        if removed > 0 {
            log::debug!("Removed {} transient file(s)", removed);
        }
        paths
    }
}

impl Drop for TransientFiles {
    fn drop(&mut self) {
        self.remove_all();
    }
}
