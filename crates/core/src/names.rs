//! Fresh names for produced videos and transient clips.
//!
//! Produced files get a short random alphanumeric token, transient clips
//! a UUID, so concurrent requests never write to the same path.

use std::path::{Component, Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

/// Length of the token in produced file names.
pub const TOKEN_LEN: usize = 10;

/// Generate a random alphanumeric token like "aZ3kQ9xP0b".
///
/// If seed is provided, the token is deterministic.
pub fn random_token(len: usize, seed: Option<u64>) -> String {
    let rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Pick an unused `<token>.<ext>` path inside `dir`, creating `dir`.
pub fn fresh_output_path(dir: &Path, ext: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    loop {
        let candidate = dir.join(format!("{}.{}", random_token(TOKEN_LEN, None), ext));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
}

/// Path for a new transient clip in `work_dir`.
pub fn transient_clip_path(work_dir: &Path, ext: &str) -> PathBuf {
    work_dir.join(format!("{}.{}", Uuid::new_v4(), ext))
}

/// Caller-facing link for a produced file.
///
/// Relative to `public_root` with a leading `/` and forward slashes when
/// the file lives under it, the full path otherwise.
pub fn public_link(path: &Path, public_root: Option<&Path>) -> String {
    let relative = public_root.and_then(|root| path.strip_prefix(root).ok());
    match relative {
        Some(rel) => {
            let parts: Vec<String> = rel
                .components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                    _ => None,
                })
                .collect();
            format!("/{}", parts.join("/"))
        }
        None => path.display().to_string(),
    }
}
