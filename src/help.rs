//! Help text for declared flags.
//!
//! ```text
//! Usage: tool tests the cli
//!
//! Flags:
//!   -f, --file [filename]  a file name, default: 'the_file'
//!   -h, --help             Show command help
//! ```

use crate::value::Value;

pub const HELP_DESCRIPTION: &str = "Show command help";

/// One row of the `Flags:` block.
#[derive(Debug, Clone, PartialEq)]
pub struct HelpEntry {
    pub flags: String,
    pub description: Option<String>,
    pub default: Option<Value>,
}

impl HelpEntry {
    fn detail(&self) -> String {
        let default = self.default.as_ref().map(|d| match d {
            Value::String(s) => format!("default: '{s}'"),
            other => format!("default: {other}"),
        });
        match (&self.description, default) {
            (Some(desc), Some(default)) => format!("{desc}, {default}"),
            (Some(desc), None) => desc.clone(),
            (None, Some(default)) => default,
            (None, None) => String::new(),
        }
    }
}

/// Render the help block. The `Usage:` line appears only when `usage` is set.
pub fn render(program: Option<&str>, usage: Option<&str>, entries: &[HelpEntry]) -> String {
    let mut out = String::new();

    if let Some(usage) = usage {
        match program {
            Some(program) => out.push_str(&format!("Usage: {program} {usage}\n\n")),
            None => out.push_str(&format!("Usage: {usage}\n\n")),
        }
    }

    out.push_str("Flags:\n");
    let width = entries.iter().map(|e| e.flags.chars().count()).max().unwrap_or(0);
    for entry in entries {
        let detail = entry.detail();
        if detail.is_empty() {
            out.push_str(&format!("  {}\n", entry.flags));
        } else {
            out.push_str(&format!("  {:width$}  {detail}\n", entry.flags));
        }
    }
    out
}
