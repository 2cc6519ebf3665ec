//! Interpreting the command line against declared flags.
//!
//! [`CliState`] holds what the program declared (flags, an optional
//! bare-arguments path, an optional stdin source, usage text). Given a
//! tokenized [`ArgMap`], [`CliState::interpret`] decides what gets written
//! where and under which label; applying the writes is the builder's job.

use std::fmt;
use std::sync::Arc;

use crate::argv::ArgMap;
use crate::flags::{self, FlagSpec};
use crate::help::{self, HELP_DESCRIPTION, HelpEntry};
use crate::value::Value;

pub const LABEL_DEFAULT: &str = "CLI (DEFAULT)";
pub const LABEL_STDIN: &str = "STDIN";
pub const LABEL_ARGUMENTS: &str = "CLI ARGUMENTS";

/// Receives the rendered help text instead of printing it.
pub type HelpCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A value bound for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CliWrite {
    pub path: String,
    pub value: Value,
    pub label: String,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Apply(Vec<CliWrite>),
    /// The help flag was given; nothing is applied.
    Help,
}

#[derive(Clone, Default)]
pub struct CliState {
    flags: Vec<FlagSpec>,
    arguments: Option<String>,
    stdin: Option<FlagSpec>,
    usage: Option<String>,
    program: Option<String>,
    on_help: Option<HelpCallback>,
}

impl fmt::Debug for CliState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliState")
            .field("flags", &self.flags)
            .field("arguments", &self.arguments)
            .field("stdin", &self.stdin)
            .field("usage", &self.usage)
            .field("program", &self.program)
            .field("on_help", &self.on_help.as_ref().map(|_| ".."))
            .finish()
    }
}

impl CliState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_flag(&mut self, spec: FlagSpec) {
        self.flags.push(spec);
    }

    pub fn set_arguments(&mut self, path: &str) {
        self.arguments = Some(path.to_string());
    }

    /// Only one stdin source exists; a later declaration replaces it.
    pub fn set_stdin(&mut self, spec: FlagSpec) {
        self.stdin = Some(spec);
    }

    pub fn set_usage(&mut self, usage: &str) {
        self.usage = Some(usage.to_string());
    }

    pub fn set_program(&mut self, program: &str) {
        self.program = Some(program.to_string());
    }

    pub fn set_on_help(&mut self, callback: HelpCallback) {
        self.on_help = Some(callback);
    }

    pub fn on_help(&self) -> Option<&HelpCallback> {
        self.on_help.as_ref()
    }

    pub fn has_stdin(&self) -> bool {
        self.stdin.is_some()
    }

    fn declared(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.iter().chain(self.stdin.iter())
    }

    /// Tokens of the built-in help flag: whichever of `h` and `help` no
    /// declared flag has claimed.
    pub fn help_tokens(&self) -> Vec<String> {
        ["h", "help"]
            .into_iter()
            .filter(|t| !self.declared().any(|spec| spec.claims(t)))
            .map(String::from)
            .collect()
    }

    /// Help is wanted only when a help token was given bare (`--help`), not
    /// when it picked up a value (`--help topic`).
    pub fn wants_help(&self, args: &ArgMap) -> bool {
        self.help_tokens()
            .iter()
            .any(|t| args.get(t) == Some(&Value::Bool(true)))
    }

    /// Program name for the usage line: the explicit one, else the file name
    /// of the running executable.
    fn program_name(&self) -> Option<String> {
        if let Some(program) = &self.program {
            return Some(program.clone());
        }
        let exe = std::env::args_os().next()?;
        std::path::Path::new(&exe)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    pub fn help_message(&self) -> String {
        let mut entries: Vec<HelpEntry> = self
            .flags
            .iter()
            .map(|spec| HelpEntry {
                flags: spec.display_flags(),
                description: spec.description_text().map(String::from),
                default: spec.default().cloned(),
            })
            .collect();

        if let Some(spec) = &self.stdin {
            let flags = match spec.display_flags() {
                shown if shown.is_empty() => "<stdin>".to_string(),
                shown => format!("{shown} | <stdin>"),
            };
            entries.push(HelpEntry {
                flags,
                description: spec.description_text().map(String::from),
                default: spec.default().cloned(),
            });
        }

        let help_tokens = self.help_tokens();
        if !help_tokens.is_empty() {
            entries.push(HelpEntry {
                flags: flags::display_tokens(&help_tokens),
                description: Some(HELP_DESCRIPTION.to_string()),
                default: None,
            });
        }

        let program = self.usage.as_ref().and_then(|_| self.program_name());
        help::render(program.as_deref(), self.usage.as_deref(), &entries)
    }

    /// Map tokenized arguments (and captured stdin) onto config paths.
    ///
    /// Per flag, the first of its tokens present wins; otherwise its default
    /// is used under [`LABEL_DEFAULT`]. A parser error is logged and the flag
    /// is skipped. Stdin data overrides the same flag given on the command
    /// line.
    pub fn interpret(&self, args: &ArgMap, stdin: Option<Value>) -> Interpretation {
        if self.wants_help(args) {
            return Interpretation::Help;
        }

        let mut writes = Vec::new();
        for spec in &self.flags {
            if let Some(write) = resolve_flag(spec, args) {
                writes.push(write);
            }
        }

        if let Some(spec) = &self.stdin {
            let write = match stdin {
                Some(data) => parse_into(spec, data, LABEL_STDIN.to_string()),
                None => resolve_flag(spec, args),
            };
            writes.extend(write);
        }

        if let Some(path) = &self.arguments
            && !args.bare().is_empty()
        {
            writes.push(CliWrite {
                path: path.clone(),
                value: Value::List(args.bare().iter().map(|a| Value::from(a.as_str())).collect()),
                label: LABEL_ARGUMENTS.to_string(),
            });
        }

        Interpretation::Apply(writes)
    }
}

fn resolve_flag(spec: &FlagSpec, args: &ArgMap) -> Option<CliWrite> {
    match args.first_of(spec.tokens()) {
        Some((token, raw)) => parse_into(spec, raw.clone(), format!("CLI {}", flags::dashed(token))),
        None => spec.default().map(|default| CliWrite {
            path: spec.config_path().to_string(),
            value: default.clone(),
            label: LABEL_DEFAULT.to_string(),
        }),
    }
}

fn parse_into(spec: &FlagSpec, raw: Value, label: String) -> Option<CliWrite> {
    match spec.apply_parser(raw) {
        Ok(value) => Some(CliWrite {
            path: spec.config_path().to_string(),
            value,
            label,
        }),
        Err(reason) => {
            tracing::warn!(path = spec.config_path(), "flag parser failed ({label}): {reason}");
            None
        }
    }
}
