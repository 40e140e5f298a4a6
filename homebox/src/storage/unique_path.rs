//! Collision avoidance for blob file names
//!
//! Picks a file name that does not clash, ignoring case, with any sibling in
//! the target directory. `bar.pdf` becomes `bar (1).pdf`, then `bar (2).pdf`,
//! and so on.

use crate::config::MAX_UNIQUE_PATH_CANDIDATES;
use crate::error::{AppError, Result};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// Lists the file names inside a directory.
///
/// Implementations may block; the local store calls them from
/// `tokio::task::spawn_blocking`.
pub trait DirLister: Send + Sync {
    fn list(&self, dir: &Path) -> io::Result<Vec<String>>;
}

impl<F> DirLister for F
where
    F: Fn(&Path) -> io::Result<Vec<String>> + Send + Sync,
{
    fn list(&self, dir: &Path) -> io::Result<Vec<String>> {
        self(dir)
    }
}

/// Lists directories on the host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirLister;

impl DirLister for FsDirLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

/// Return `path`, or a sibling of it carrying a " (N)" suffix when the name is taken.
///
/// If the parent directory cannot be listed (usually because it does not
/// exist yet) the path is returned unchanged.
pub fn unique_path(path: &Path, lister: &dyn DirLister) -> Result<PathBuf> {
    let (dir, file_name) = match (path.parent(), path.file_name().and_then(|n| n.to_str())) {
        (Some(dir), Some(name)) => (dir, name),
        _ => return Ok(path.to_path_buf()),
    };

    let taken: HashSet<String> = match lister.list(dir) {
        Ok(names) => names.into_iter().map(|n| n.to_lowercase()).collect(),
        Err(e) => {
            tracing::debug!("Skipping collision check for {:?}: {}", path, e);
            return Ok(path.to_path_buf());
        }
    };

    if !taken.contains(&file_name.to_lowercase()) {
        return Ok(path.to_path_buf());
    }

    let (stem, ext) = split_extension(file_name);

    for n in 1..MAX_UNIQUE_PATH_CANDIDATES {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if !taken.contains(&candidate.to_lowercase()) {
            tracing::debug!("Renamed {:?} to {:?} to avoid a collision", file_name, candidate);
            return Ok(dir.join(candidate));
        }
    }

    Err(AppError::BlobStore(format!(
        "No free file name for {:?} after {} candidates",
        path, MAX_UNIQUE_PATH_CANDIDATES
    )))
}

/// Split "name.ext" into ("name", ".ext"). Leading dots belong to the stem.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}
