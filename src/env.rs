//! Process environment access and runtime-environment discovery.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::file::ByteSource;
use crate::value::{Map, Value};

/// Read-only view of environment variables.
pub trait EnvSource {
    fn get(&self, name: &str) -> Option<String>;

    /// Every variable, for prefix scans.
    fn vars(&self) -> Vec<(String, String)>;
}

/// The real process environment. Variables that are not valid UTF-8 are
/// treated as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars().collect()
    }
}

/// A fixed set of variables, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapEnv(BTreeMap<String, String>);

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl EnvSource for MapEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Where to discover the runtime environment label.
///
/// Sources are tried in order: the variable named by `env`, then the
/// trimmed contents of the first readable file in `paths`, then `default`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSearch {
    pub env: Option<String>,
    pub paths: Vec<PathBuf>,
    pub default: Option<String>,
}

impl EnvironmentSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn default_label(mut self, label: impl Into<String>) -> Self {
        self.default = Some(label.into());
        self
    }

    /// The discovered label, unmodified apart from file-content trimming.
    /// An empty variable or default counts as unset. `None` means no
    /// environment was selected.
    pub fn search(&self, env: &dyn EnvSource, files: &dyn ByteSource) -> Option<String> {
        if let Some(value) = self
            .env
            .as_deref()
            .and_then(|name| env.get(name))
            .filter(|value| !value.is_empty())
        {
            tracing::debug!(var = self.env.as_deref(), "runtime environment from variable");
            return Some(value);
        }
        if let Some((path, content)) = files.read_first(&self.paths) {
            tracing::debug!(path = %path.display(), "runtime environment from file");
            return Some(content.trim().to_string());
        }
        self.default.clone().filter(|label| !label.is_empty())
    }
}

/// Build a map from environment variables matching `{PREFIX}__*`.
///
/// Double underscore `__` separates nesting levels; a single `_` is part of
/// the key. Segments are lowercased. Values stay strings: typing them is the
/// job of whoever reads the config.
pub fn env_to_map(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Map {
    let needle = format!("{prefix}__");
    let mut map = Map::new();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }

        let segments: Vec<&str> = rest.split("__").collect();
        if segments.iter().any(|s| s.is_empty()) {
            tracing::debug!(var = %key, "skipping variable with an empty segment");
            continue;
        }
        insert_nested(&mut map, &segments, Value::String(value));
    }

    map
}

fn insert_nested(map: &mut Map, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let key = first.to_lowercase();

    if rest.is_empty() {
        map.insert(key, value);
        return;
    }
    let sub = map.entry(key).or_insert_with(Value::empty_map);
    if !sub.is_map() {
        // APP__DB=x and APP__DB__URL=y: the nested form wins.
        *sub = Value::empty_map();
    }
    if let Value::Map(sub_map) = sub {
        insert_nested(sub_map, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FsSource;
    use std::fs;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn simple_key() {
        let map = env_to_map("MYAPP", vars(&[("MYAPP__HOST", "0.0.0.0")]));
        assert_eq!(map["host"].as_str(), Some("0.0.0.0"));
    }

    #[test]
    fn nested_key() {
        let map = env_to_map("MYAPP", vars(&[("MYAPP__DATABASE__URL", "postgres://db")]));
        let db = map["database"].as_map().unwrap();
        assert_eq!(db["url"].as_str(), Some("postgres://db"));
    }

    #[test]
    fn single_underscore_preserved() {
        let map = env_to_map("MYAPP", vars(&[("MYAPP__POOL_SIZE", "10")]));
        assert_eq!(map["pool_size"].as_str(), Some("10"));
    }

    #[test]
    fn values_stay_strings() {
        let map = env_to_map("MYAPP", vars(&[("MYAPP__DEBUG", "true"), ("MYAPP__PORT", "80")]));
        assert_eq!(map["debug"], Value::from("true"));
        assert_eq!(map["port"], Value::from("80"));
    }

    #[test]
    fn no_matching_prefix_ignored() {
        assert!(env_to_map("MYAPP", vars(&[("OTHER__HOST", "x")])).is_empty());
    }

    #[test]
    fn bare_prefix_ignored() {
        assert!(env_to_map("MYAPP", vars(&[("MYAPP", "x"), ("MYAPP__", "y")])).is_empty());
    }

    #[test]
    fn prefix_with_single_underscore_not_matched() {
        assert!(env_to_map("MYAPP", vars(&[("MYAPP_HOST", "x")])).is_empty());
    }

    #[test]
    fn empty_segment_skipped() {
        assert!(env_to_map("APP", vars(&[("APP__DB____URL", "x")])).is_empty());
    }

    #[test]
    fn nested_form_replaces_scalar() {
        let map = env_to_map("APP", vars(&[("APP__DB", "flat"), ("APP__DB__URL", "pg://")]));
        assert_eq!(map["db"].as_map().unwrap()["url"].as_str(), Some("pg://"));
    }

    #[test]
    fn map_env_lookup() {
        let env = MapEnv::new().with("NODE_ENV", "prod");
        assert_eq!(env.get("NODE_ENV").as_deref(), Some("prod"));
        assert_eq!(env.get("OTHER"), None);
        assert_eq!(env.vars().len(), 1);
    }

    #[test]
    fn search_prefers_variable() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("env"), "file-env").unwrap();
        let search = EnvironmentSearch::new()
            .env("APP_ENV")
            .path(dir.path().join("env"))
            .default_label("local");
        let env = MapEnv::new().with("APP_ENV", "prod");
        assert_eq!(search.search(&env, &FsSource).as_deref(), Some("prod"));
    }

    #[test]
    fn search_reads_first_existing_file_trimmed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("second"), "  staging\n").unwrap();
        let search = EnvironmentSearch::new()
            .env("APP_ENV")
            .paths([dir.path().join("first"), dir.path().join("second")])
            .default_label("local");
        assert_eq!(search.search(&MapEnv::new(), &FsSource).as_deref(), Some("staging"));
    }

    #[test]
    fn search_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let search = EnvironmentSearch::new()
            .env("APP_ENV")
            .path(dir.path().join("missing"))
            .default_label("local");
        assert_eq!(search.search(&MapEnv::new(), &FsSource).as_deref(), Some("local"));
    }

    #[test]
    fn search_with_nothing_selects_nothing() {
        assert_eq!(EnvironmentSearch::new().search(&MapEnv::new(), &FsSource), None);
    }

    #[test]
    fn search_keeps_label_case() {
        let search = EnvironmentSearch::new().env("APP_ENV");
        let env = MapEnv::new().with("APP_ENV", "Dev");
        assert_eq!(search.search(&env, &FsSource).as_deref(), Some("Dev"));
    }

    #[test]
    fn empty_variable_falls_through_to_default() {
        let search = EnvironmentSearch::new().env("APP_ENV").default_label("local");
        let env = MapEnv::new().with("APP_ENV", "");
        assert_eq!(search.search(&env, &FsSource).as_deref(), Some("local"));
    }

    #[test]
    fn empty_variable_falls_through_to_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("env"), "qa").unwrap();
        let search = EnvironmentSearch::new().env("APP_ENV").path(dir.path().join("env"));
        let env = MapEnv::new().with("APP_ENV", "");
        assert_eq!(search.search(&env, &FsSource).as_deref(), Some("qa"));
    }

    #[test]
    fn empty_default_selects_nothing() {
        let search = EnvironmentSearch::new().default_label("");
        assert_eq!(search.search(&MapEnv::new(), &FsSource), None);
    }
}
