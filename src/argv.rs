//! Tokenizing raw command-line arguments.
//!
//! The grammar is deliberately small:
//!
//! - `--name` starts a long flag, recorded as `true`.
//! - `-abc` sets `a`, `b` and `c` to `true`; `c` becomes the current flag.
//! - `--` ends flag parsing; everything after it is a bare argument.
//! - Any other token is a value for the current flag (`true` becomes the
//!   string, a second value turns it into a list) or, with no current flag,
//!   a bare argument.

use std::collections::BTreeMap;
use std::ffi::OsStr;

use crate::value::Value;

/// Flag name → raw value, plus the bare arguments in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgMap {
    flags: BTreeMap<String, Value>,
    bare: Vec<String>,
}

impl ArgMap {
    pub fn parse<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = ArgMap::default();
        let mut current: Option<String> = None;
        let mut flags_done = false;

        for token in tokens {
            let token = token.as_ref();
            if flags_done {
                map.bare.push(token.to_string());
                continue;
            }

            if token == "--" {
                flags_done = true;
            } else if let Some(name) = token.strip_prefix("--") {
                map.flags.insert(name.to_string(), Value::Bool(true));
                current = Some(name.to_string());
            } else if let Some(cluster) = token.strip_prefix('-').filter(|c| !c.is_empty()) {
                for letter in cluster.chars() {
                    let name = letter.to_string();
                    map.flags.insert(name.clone(), Value::Bool(true));
                    current = Some(name);
                }
            } else {
                match &current {
                    Some(name) => map.accumulate(name, token),
                    None => map.bare.push(token.to_string()),
                }
            }
        }
        map
    }

    /// Process arguments, which need not be UTF-8. Invalid sequences become
    /// U+FFFD rather than aborting the parse.
    pub fn parse_os<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::parse(
            tokens
                .into_iter()
                .map(|t| t.as_ref().to_string_lossy().into_owned()),
        )
    }

    /// Whitespace-separated tokens, for tests and simple embedding.
    pub fn parse_str(line: &str) -> Self {
        Self::parse(line.split_whitespace())
    }

    fn accumulate(&mut self, name: &str, token: &str) {
        let Some(slot) = self.flags.get_mut(name) else {
            return;
        };
        match slot {
            Value::List(items) => items.push(Value::from(token)),
            Value::String(first) => {
                let first = std::mem::take(first);
                *slot = Value::List(vec![Value::String(first), Value::from(token)]);
            }
            _ => *slot = Value::from(token),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.flags.get(name)
    }

    /// The first of `names` that was given, with its value.
    pub fn first_of<'a>(&'a self, names: &'a [String]) -> Option<(&'a str, &'a Value)> {
        names
            .iter()
            .find_map(|n| self.flags.get(n).map(|v| (n.as_str(), v)))
    }

    pub fn flags(&self) -> &BTreeMap<String, Value> {
        &self.flags
    }

    pub fn bare(&self) -> &[String] {
        &self.bare
    }
}
