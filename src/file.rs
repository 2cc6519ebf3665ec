//! Reading config sources from disk.
//!
//! Two jobs live here:
//!
//! - The [`ByteSource`] collaborator: given candidate paths, return the text
//!   of the first one that exists. Absence is never an error; other I/O
//!   failures are logged and the candidate is skipped.
//! - Discovery: each [`SearchPath`] resolves to one or more directories
//!   (priority-ascending, last = highest), which are then probed for a file
//!   name under a [`SearchMode`].
//!
//! `Ancestors(boundary)` expands into every directory from the working
//! directory toward the filesystem root, emitted **shallowest first** so the
//! directory closest to CWD has the highest priority.

use std::path::{Path, PathBuf};

use crate::error::LayerfigError;
use crate::types::{Boundary, SearchMode, SearchPath};

/// Raw text access to files. Swappable so callers can serve config from
/// memory or an archive.
pub trait ByteSource {
    /// `Ok(None)` when the file does not exist.
    fn read(&self, path: &Path) -> Result<Option<String>, LayerfigError>;

    /// Contents of the first existing candidate, in order.
    fn read_first(&self, paths: &[PathBuf]) -> Option<(PathBuf, String)> {
        for path in paths {
            match self.read(path) {
                Ok(Some(content)) => return Some((path.clone(), content)),
                Ok(None) => continue,
                Err(e) => tracing::error!("{e}"),
            }
        }
        None
    }
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl ByteSource for FsSource {
    fn read(&self, path: &Path) -> Result<Option<String>, LayerfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // A directory is not a config file; treat it like a miss.
            Err(_) if path.is_dir() => Ok(None),
            Err(e) => Err(LayerfigError::IoError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

/// Resolve a single-directory [`SearchPath`] to a concrete path.
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory) or
/// for [`SearchPath::Ancestors`], which needs [`expand_ancestors`].
pub fn resolve_search_path(sp: &SearchPath) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform(app_name) => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
        SearchPath::Ancestors(_) => None,
    }
}

/// Walk from the working directory toward the root (see [`expand_ancestors_from`]).
pub fn expand_ancestors(boundary: &Boundary) -> Vec<PathBuf> {
    let Ok(cwd) = std::env::current_dir() else {
        return vec![];
    };
    expand_ancestors_from(cwd, boundary)
}

/// Collect `start` and its ancestors, shallowest first.
///
/// With [`Boundary::Marker`] the walk stops (inclusive) at the first
/// directory containing the marker, or reaches the root if none does.
pub fn expand_ancestors_from(start: PathBuf, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = start.as_path();

    loop {
        dirs.push(current.to_path_buf());

        if let Boundary::Marker(name) = boundary
            && current.join(name).exists()
        {
            break;
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    dirs.reverse();
    dirs
}

/// Expand all search paths into a flat, priority-ascending directory list.
pub fn expand_search_paths(search_paths: &[SearchPath]) -> Vec<PathBuf> {
    expand_search_paths_from(search_paths, None)
}

/// Like [`expand_search_paths`] with an explicit start for `Ancestors`.
pub fn expand_search_paths_from(
    search_paths: &[SearchPath],
    ancestors_start: Option<&Path>,
) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for sp in search_paths {
        match sp {
            SearchPath::Ancestors(boundary) => {
                let expanded = match ancestors_start {
                    Some(start) => expand_ancestors_from(start.to_path_buf(), boundary),
                    None => expand_ancestors(boundary),
                };
                dirs.extend(expanded);
            }
            other => {
                if let Some(dir) = resolve_search_path(other) {
                    dirs.push(dir);
                }
            }
        }
    }
    dirs
}

/// Probe the expanded directories for `file_name`, respecting [`SearchMode`].
///
/// Results are `(path, contents)` in priority-ascending order.
pub fn load_config_files(
    source: &dyn ByteSource,
    search_paths: &[SearchPath],
    file_name: &str,
    mode: SearchMode,
) -> Vec<(PathBuf, String)> {
    let dirs = expand_search_paths(search_paths);
    match mode {
        SearchMode::Merge => load_all(source, &dirs, file_name),
        SearchMode::FirstMatch => load_first_match(source, &dirs, file_name),
    }
}

fn load_all(source: &dyn ByteSource, dirs: &[PathBuf], file_name: &str) -> Vec<(PathBuf, String)> {
    let mut results = Vec::new();
    for dir in dirs {
        let file_path = dir.join(file_name);
        match source.read(&file_path) {
            Ok(Some(content)) => results.push((file_path, content)),
            Ok(None) => continue,
            Err(e) => tracing::error!("{e}"),
        }
    }
    results
}

/// Searches from the highest-priority end backward.
fn load_first_match(
    source: &dyn ByteSource,
    dirs: &[PathBuf],
    file_name: &str,
) -> Vec<(PathBuf, String)> {
    let candidates: Vec<PathBuf> = dirs.iter().rev().map(|d| d.join(file_name)).collect();
    source.read_first(&candidates).into_iter().collect()
}
