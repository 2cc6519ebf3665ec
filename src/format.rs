//! Structured-data parsers for config files.
//!
//! A [`ConfigFormat`] turns file text into a [`Value`] tree. The format is
//! picked from the file extension; anything unknown is read as JSON.

use std::path::Path;

use crate::error::LayerfigError;
use crate::value::Value;

/// A pluggable config file parser.
pub trait ConfigFormat: Send + Sync {
    /// File extensions this format handles, without the leading dot.
    fn extensions(&self) -> &[&str];

    /// Parse `contents`; `source_name` only appears in the error.
    fn parse(&self, contents: &str, source_name: &str) -> Result<Value, LayerfigError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl ConfigFormat for JsonFormat {
    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn parse(&self, contents: &str, source_name: &str) -> Result<Value, LayerfigError> {
        serde_json::from_str::<serde_json::Value>(contents)
            .map(Value::from)
            .map_err(|e| LayerfigError::Parse {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl ConfigFormat for TomlFormat {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, contents: &str, source_name: &str) -> Result<Value, LayerfigError> {
        toml::from_str::<toml::Table>(contents)
            .map(|table| Value::from(toml::Value::Table(table)))
            .map_err(|e| LayerfigError::Parse {
                source_name: source_name.to_string(),
                reason: e.message().to_string(),
            })
    }
}

static FORMATS: [&dyn ConfigFormat; 2] = [&JsonFormat, &TomlFormat];

/// The format registered for `path`'s extension, JSON otherwise.
pub fn format_for_path(path: &Path) -> &'static dyn ConfigFormat {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return &JsonFormat;
    };
    FORMATS
        .iter()
        .copied()
        .find(|f| f.extensions().iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(&JsonFormat)
}

/// Parse file text with the format matching its path.
pub fn parse_file(path: &Path, contents: &str) -> Result<Value, LayerfigError> {
    format_for_path(path).parse(contents, &path.display().to_string())
}
