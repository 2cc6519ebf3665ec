//! Dotted key paths.
//!
//! `"a.b.c"` addresses `root.a.b.c`; the literal `"."` addresses the root
//! itself. A single leading dot is accepted and ignored, so `".a.b"` and
//! `"a.b"` name the same node (this is the form trace keys are stored in).

use std::fmt;

use crate::error::LayerfigError;
use crate::value::{Map, Value};

/// A parsed, non-empty key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPath {
    /// The whole tree (`"."`).
    Root,
    /// One or more map keys, outermost first.
    Nested(Vec<String>),
}

impl KeyPath {
    pub fn parse(path: &str) -> Result<Self, LayerfigError> {
        if path.is_empty() {
            return Err(LayerfigError::EmptyPath);
        }
        if path == "." {
            return Ok(KeyPath::Root);
        }
        let body = path.strip_prefix('.').unwrap_or(path);
        let segments: Vec<String> = body.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(LayerfigError::EmptySegment(path.to_string()));
        }
        Ok(KeyPath::Nested(segments))
    }

    pub fn segments(&self) -> &[String] {
        match self {
            KeyPath::Root => &[],
            KeyPath::Nested(segments) => segments,
        }
    }

    /// The form used as a key in the provenance trace: always dot-prefixed.
    pub fn trace_key(&self) -> String {
        match self {
            KeyPath::Root => ".".to_string(),
            KeyPath::Nested(segments) => format!(".{}", segments.join(".")),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPath::Root => f.write_str("."),
            KeyPath::Nested(segments) => f.write_str(&segments.join(".")),
        }
    }
}

/// Normalize a raw path string into its trace-key form (`"a.b"` → `".a.b"`).
pub fn normalize(path: &str) -> String {
    if path.starts_with('.') {
        path.to_string()
    } else {
        format!(".{path}")
    }
}

/// Compose the trace path of `key` beneath `parent` (`""` is the root).
pub fn child(parent: &str, key: &str) -> String {
    format!("{parent}.{key}")
}

fn structural(path: &KeyPath, prefix: &[String]) -> LayerfigError {
    LayerfigError::StructuralPath {
        path: path.to_string(),
        segment: prefix.join("."),
    }
}

/// Walk `parents` from `root`, creating empty maps for absent segments.
///
/// Fails if a segment already holds something other than a map.
pub fn navigate_mut<'t>(
    root: &'t mut Map,
    parents: &[String],
    path: &KeyPath,
) -> Result<&'t mut Map, LayerfigError> {
    let mut current = root;
    for (i, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(Value::empty_map);
        current = match entry {
            Value::Map(map) => map,
            _ => return Err(structural(path, &parents[..=i])),
        };
    }
    Ok(current)
}

/// Read the node at `path`. A missing segment is a soft miss (`Ok(None)`);
/// routing through a non-map is an error, mirroring writes.
pub fn lookup<'t>(root: &'t Map, path: &KeyPath) -> Result<Option<&'t Value>, LayerfigError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(None);
    };
    let mut current = root;
    for (i, segment) in parents.iter().enumerate() {
        match current.get(segment) {
            None => return Ok(None),
            Some(Value::Map(map)) => current = map,
            Some(_) => return Err(structural(path, &parents[..=i])),
        }
    }
    Ok(current.get(last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(v: serde_json::Value) -> Map {
        match Value::from(v) {
            Value::Map(m) => m,
            other => panic!("expected a map, got {}", other.kind()),
        }
    }

    #[test]
    fn dot_is_root() {
        assert_eq!(KeyPath::parse(".").unwrap(), KeyPath::Root);
        assert!(KeyPath::parse(".").unwrap().segments().is_empty());
    }

    #[test]
    fn splits_on_dots() {
        let path = KeyPath::parse("a.b.c").unwrap();
        assert_eq!(path.segments(), ["a", "b", "c"]);
        assert_eq!(path.trace_key(), ".a.b.c");
        assert_eq!(path.to_string(), "a.b.c");
    }

    #[test]
    fn leading_dot_is_ignored() {
        assert_eq!(KeyPath::parse(".a.b").unwrap(), KeyPath::parse("a.b").unwrap());
    }

    #[test]
    fn empty_path_rejected() {
        assert!(matches!(KeyPath::parse(""), Err(LayerfigError::EmptyPath)));
    }

    #[test]
    fn empty_segment_rejected() {
        assert!(matches!(
            KeyPath::parse("a..b"),
            Err(LayerfigError::EmptySegment(_))
        ));
        assert!(KeyPath::parse("a.").is_err());
    }

    #[test]
    fn normalize_prefixes_once() {
        assert_eq!(normalize("a.b"), ".a.b");
        assert_eq!(normalize(".a.b"), ".a.b");
        assert_eq!(normalize(""), ".");
        assert_eq!(child("", "a"), ".a");
        assert_eq!(child(".a", "b"), ".a.b");
    }

    #[test]
    fn navigate_creates_intermediates() {
        let mut root = Map::new();
        let path = KeyPath::parse("a.b.c").unwrap();
        let (_, parents) = path.segments().split_last().unwrap();
        let parent = navigate_mut(&mut root, parents, &path).unwrap();
        parent.insert("c".into(), Value::Integer(1));
        assert_eq!(root, tree(json!({"a": {"b": {"c": 1}}})));
    }

    #[test]
    fn navigate_through_scalar_fails() {
        let mut root = tree(json!({"a": {"b": 5}}));
        let path = KeyPath::parse("a.b.c.d").unwrap();
        let (_, parents) = path.segments().split_last().unwrap();
        let err = navigate_mut(&mut root, parents, &path).unwrap_err();
        match err {
            LayerfigError::StructuralPath { segment, .. } => assert_eq!(segment, "a.b"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn lookup_finds_nested() {
        let root = tree(json!({"a": {"b": {"c": "deep"}}}));
        let found = lookup(&root, &KeyPath::parse("a.b.c").unwrap()).unwrap();
        assert_eq!(found, Some(&Value::from("deep")));
    }

    #[test]
    fn lookup_miss_is_soft() {
        let root = tree(json!({"a": {}}));
        assert_eq!(lookup(&root, &KeyPath::parse("a.x.y").unwrap()).unwrap(), None);
        assert_eq!(lookup(&root, &KeyPath::parse("missing").unwrap()).unwrap(), None);
    }

    #[test]
    fn lookup_through_scalar_is_an_error() {
        let root = tree(json!({"a": "scalar"}));
        assert!(lookup(&root, &KeyPath::parse("a.b").unwrap()).is_err());
    }
}
