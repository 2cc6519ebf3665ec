use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Deserialize;

use crate::list::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_VALUE_LENGTH};

/// Where to look for config files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory for the named app (XDG on Linux,
    /// ~/Library/Application Support on macOS).
    Platform(String),
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp".into())`.
    Home(String),
    /// Current working directory.
    Cwd,
    /// An explicit path.
    Path(PathBuf),
    /// Every directory from the working directory up to `Boundary`,
    /// shallowest first.
    Ancestors(Boundary),
}

/// How far an [`Ancestors`](SearchPath::Ancestors) walk goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// Up to the filesystem root.
    Root,
    /// Up to (and including) the first directory containing this entry.
    Marker(String),
}

/// What to do when several discovered files exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Apply every file found, later (higher-priority) ones on top.
    #[default]
    Merge,
    /// Apply only the highest-priority file found.
    FirstMatch,
}

/// Environment restriction for the next source call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Gate {
    #[default]
    Always,
    WhenSet(BTreeSet<String>),
}

/// Library options. Field names deserialize in camelCase so options can
/// live in the same JSON files as the rest of the config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Writes after `lock()` return an error instead of logging a warning.
    pub exception_on_locked: bool,
    /// Compare environment labels exactly. When `false` (the default),
    /// labels are upper-cased on the way in and compared upper-cased.
    pub case_sensitive_environments: bool,
    pub max_list_depth: usize,
    pub max_list_value_length: usize,
    /// Log every applied layer at `debug` level.
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            exception_on_locked: false,
            case_sensitive_environments: false,
            max_list_depth: DEFAULT_MAX_DEPTH,
            max_list_value_length: DEFAULT_MAX_VALUE_LENGTH,
            debug: false,
        }
    }
}
