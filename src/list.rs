//! Depth-first listing of the tree with provenance.
//!
//! Each key becomes one line:
//!
//! ```text
//! ├───database : [FILE app.json]
//! ├───├───url : postgres://localhost [FILE app.json]
//! ├───├───password : ***** [ENV DB_PASSWORD]
//! ```
//!
//! Maps are recursed into up to `max_depth` levels; deeper maps print `...`.
//! Keys matching a [`SecureMatcher`] print a redaction marker and their
//! subtree is never visited.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "color")]
use owo_colors::OwoColorize;
use regex::Regex;

use crate::error::LayerfigError;
use crate::path;
use crate::provenance::Trace;
use crate::value::Value;

pub const DEFAULT_MAX_DEPTH: usize = 8;
pub const DEFAULT_MAX_VALUE_LENGTH: usize = 60;

const DEPTH_MARKER: &str = "├───";
const REDACTED: &str = "*****";
const ELLIPSIS: &str = "...";

/// Renders a leaf value for display. Receives the value and its dotted path.
pub type ValueFormatter = Arc<dyn Fn(&Value, &str) -> String + Send + Sync>;

/// Selects key paths whose values must not be printed.
///
/// Paths are compared without the leading dot (`"db.password"`).
#[derive(Debug, Clone)]
pub enum SecureMatcher {
    Exact(String),
    Pattern(Regex),
}

impl SecureMatcher {
    pub fn pattern(pattern: &str) -> Result<Self, LayerfigError> {
        Regex::new(pattern)
            .map(SecureMatcher::Pattern)
            .map_err(|e| LayerfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn matches(&self, key_path: &str) -> bool {
        let key_path = key_path.strip_prefix('.').unwrap_or(key_path);
        match self {
            SecureMatcher::Exact(exact) => exact == key_path,
            SecureMatcher::Pattern(re) => re.is_match(key_path),
        }
    }
}

impl From<&str> for SecureMatcher {
    fn from(exact: &str) -> Self {
        SecureMatcher::Exact(exact.to_string())
    }
}

impl From<String> for SecureMatcher {
    fn from(exact: String) -> Self {
        SecureMatcher::Exact(exact)
    }
}

impl From<Regex> for SecureMatcher {
    fn from(re: Regex) -> Self {
        SecureMatcher::Pattern(re)
    }
}

#[derive(Clone)]
pub struct ListOptions {
    /// Levels to descend. `0` prints nothing at all.
    pub max_depth: usize,
    /// Characters shown before a value is truncated.
    pub max_value_length: usize,
    pub formatter: Option<ValueFormatter>,
    pub secure: Vec<SecureMatcher>,
    /// Emit ANSI colors (needs the `color` feature).
    pub color: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_value_length: DEFAULT_MAX_VALUE_LENGTH,
            formatter: None,
            secure: Vec::new(),
            color: false,
        }
    }
}

impl fmt::Debug for ListOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListOptions")
            .field("max_depth", &self.max_depth)
            .field("max_value_length", &self.max_value_length)
            .field("formatter", &self.formatter.as_ref().map(|_| ".."))
            .field("secure", &self.secure)
            .field("color", &self.color)
            .finish()
    }
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn max_value_length(mut self, length: usize) -> Self {
        self.max_value_length = length;
        self
    }

    pub fn formatter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &str) -> String + Send + Sync + 'static,
    {
        self.formatter = Some(Arc::new(f));
        self
    }

    pub fn secure(mut self, matcher: impl Into<SecureMatcher>) -> Self {
        self.secure.push(matcher.into());
        self
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn is_secured(&self, key_path: &str) -> bool {
        self.secure.iter().any(|m| m.matches(key_path))
    }
}

enum Painted {
    Key,
    Value,
    Marker,
    Source,
    Redacted,
}

#[cfg(feature = "color")]
fn paint(text: &str, part: Painted, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match part {
        Painted::Key => text.bold().to_string(),
        Painted::Value => text.cyan().to_string(),
        Painted::Marker | Painted::Source => text.yellow().to_string(),
        Painted::Redacted => text.red().to_string(),
    }
}

#[cfg(not(feature = "color"))]
fn paint(text: &str, _part: Painted, _color: bool) -> String {
    text.to_string()
}

/// Render `root` line by line into `sink`.
pub fn render(root: &Value, trace: &Trace, opts: &ListOptions, sink: &mut dyn FnMut(&str)) {
    if opts.max_depth == 0 {
        return;
    }
    if let Value::Map(map) = root {
        render_map(map, "", 1, trace, opts, sink);
    }
}

fn render_map(
    map: &crate::value::Map,
    parent: &str,
    depth: usize,
    trace: &Trace,
    opts: &ListOptions,
    sink: &mut dyn FnMut(&str),
) {
    let indicator = DEPTH_MARKER.repeat(depth);
    for (key, value) in map {
        let key_path = path::child(parent, key);
        let mut line = format!("{indicator}{} : ", paint(key, Painted::Key, opts.color));
        let mut recurse = None;

        if opts.is_secured(&key_path) {
            line.push_str(&paint(REDACTED, Painted::Redacted, opts.color));
        } else {
            match value {
                Value::Map(inner) if depth < opts.max_depth => recurse = Some(inner),
                Value::Map(_) => line.push_str(&paint(ELLIPSIS, Painted::Marker, opts.color)),
                leaf => {
                    let shown = match &opts.formatter {
                        Some(format) => format(leaf, key_path.trim_start_matches('.')),
                        None => leaf.to_string(),
                    };
                    let (shown, truncated) = truncate(&shown, opts.max_value_length);
                    line.push_str(&paint(&shown, Painted::Value, opts.color));
                    if truncated {
                        line.push(' ');
                        line.push_str(&paint(ELLIPSIS, Painted::Marker, opts.color));
                    }
                }
            }
        }

        if let Some(source) = trace.get(&key_path) {
            line.push_str(&format!(" [{}]", paint(source, Painted::Source, opts.color)));
        }
        sink(&line);

        if let Some(inner) = recurse {
            render_map(inner, &key_path, depth + 1, trace, opts, sink);
        }
    }
}

fn truncate(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((cut, _)) => (text[..cut].to_string(), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lines(root: &Value, trace: &Trace, opts: &ListOptions) -> Vec<String> {
        let mut out = Vec::new();
        render(root, trace, opts, &mut |line| out.push(line.to_string()));
        out
    }

    fn nested() -> Value {
        Value::from(json!({"oneLevel": {"twoLevel": {"threeLevel": {"four": 4}}}}))
    }

    #[test]
    fn prints_key_value_and_source() {
        let root = Value::from(json!({"key": "string"}));
        let mut trace = Trace::new();
        trace.record("key", "SET");
        let out = lines(&root, &trace, &ListOptions::new());
        assert_eq!(out, vec!["├───key : string [SET]"]);
    }

    #[test]
    fn full_depth_reaches_leaves() {
        let out = lines(&nested(), &Trace::new(), &ListOptions::new()).join("/");
        assert!(out.contains("threeLevel"));
        assert!(out.contains("four : 4"));
    }

    #[test]
    fn depth_limit_stops_with_marker() {
        let out = lines(&nested(), &Trace::new(), &ListOptions::new().max_depth(3)).join("/");
        assert!(out.contains("threeLevel : ..."));
        assert!(!out.contains("four"));
    }

    #[test]
    fn depth_one_shows_top_level_only() {
        let out = lines(&nested(), &Trace::new(), &ListOptions::new().max_depth(1)).join("/");
        assert!(out.contains("oneLevel"));
        assert!(!out.contains("twoLevel"));
    }

    #[test]
    fn depth_zero_prints_nothing() {
        assert!(lines(&nested(), &Trace::new(), &ListOptions::new().max_depth(0)).is_empty());
    }

    #[test]
    fn long_values_truncate() {
        let root = Value::from(json!({"key": "1234567890"}));
        let out = lines(&root, &Trace::new(), &ListOptions::new().max_value_length(5));
        assert_eq!(out, vec!["├───key : 12345 ..."]);
    }

    #[test]
    fn secure_exact_hides_subtree() {
        let root = Value::from(json!({"string": "s", "mapObject": {"key_a": "value_a"}}));
        let out = lines(&root, &Trace::new(), &ListOptions::new().secure("mapObject")).join("/");
        assert!(out.contains("mapObject : *****"));
        assert!(!out.contains("key_a"));
        assert!(!out.contains("value_a"));
        assert!(out.contains("string : s"));
    }

    #[test]
    fn secure_pattern_matches_nested_keys() {
        let root = Value::from(json!({"db": {"password": "hunter2", "user": "me"}}));
        let opts = ListOptions::new().secure(SecureMatcher::pattern("pass").unwrap());
        let out = lines(&root, &Trace::new(), &opts).join("/");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("user : me"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(SecureMatcher::pattern("(unclosed").is_err());
    }

    #[test]
    fn formatter_receives_path() {
        let root = Value::from(json!({"a": {"b": 1}}));
        let opts = ListOptions::new().formatter(|v, p| format!("<{p}={v}>"));
        let out = lines(&root, &Trace::new(), &opts).join("/");
        assert!(out.contains("<a.b=1>"));
    }

    #[test]
    fn lists_and_bytes_print_inline() {
        let mut map = crate::value::Map::new();
        map.insert("array".into(), Value::from(vec!["value_a", "value_b"]));
        map.insert("buffer".into(), Value::bytes("buffer"));
        let out = lines(&Value::Map(map), &Trace::new(), &ListOptions::new()).join("/");
        assert!(out.contains("[value_a, value_b]"));
        assert!(out.contains("buffer : buffer"));
    }

    #[cfg(feature = "color")]
    #[test]
    fn color_wraps_parts_in_ansi_codes() {
        let root = Value::from(json!({"key": "string"}));
        let mut trace = Trace::new();
        trace.record("key", "SET");
        let out = lines(&root, &trace, &ListOptions::new().color(true));
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("\u{1b}["));
        assert!(out[0].contains("key"));
        assert!(out[0].contains("string"));
        assert!(out[0].contains("SET"));
        assert_ne!(out[0], "├───key : string [SET]");
    }
}
