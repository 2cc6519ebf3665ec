use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayerfigError {
    #[error("Cannot route through non-map value at '{segment}' while addressing '{path}'")]
    StructuralPath { path: String, segment: String },

    #[error("Config is locked; refusing to write '{path}'")]
    Locked { path: String },

    #[error("Failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid flag descriptor '{descriptor}': {reason}")]
    InvalidFlag { descriptor: String, reason: String },

    #[error("Key path must not be empty")]
    EmptyPath,

    #[error("Key path '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("The root of the tree must be a map, got {0}")]
    RootNotMap(&'static str),

    #[error("Invalid secure pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_path_names_the_segment() {
        let err = LayerfigError::StructuralPath {
            path: "db.url.scheme".into(),
            segment: "db.url".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("db.url.scheme"));
        assert!(msg.contains("'db.url'"));
    }

    #[test]
    fn locked_mentions_lock() {
        let err = LayerfigError::Locked { path: "port".into() };
        assert!(err.to_string().contains("locked"));
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn invalid_flag_formats() {
        let err = LayerfigError::InvalidFlag {
            descriptor: "-v, --".into(),
            reason: "empty flag name".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("-v, --"));
        assert!(msg.contains("empty flag name"));
    }
}
