//! Command-line flag declarations.
//!
//! A descriptor such as `"-v, --version [a-version]"` names the tokens that
//! select a flag (`v`, `version`) plus an optional parameter hint. The hint
//! is only shown in help text.

use std::fmt;
use std::sync::Arc;

use crate::error::LayerfigError;
use crate::value::Value;

/// Transforms a raw command-line value. An `Err` is logged and the flag is
/// treated as absent.
pub type FlagParser = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// One declared flag: which tokens select it and where its value goes.
#[derive(Clone)]
pub struct FlagSpec {
    config_path: String,
    tokens: Vec<String>,
    parameter: Option<String>,
    description: Option<String>,
    default: Option<Value>,
    parser: Option<FlagParser>,
}

impl fmt::Debug for FlagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSpec")
            .field("config_path", &self.config_path)
            .field("tokens", &self.tokens)
            .field("parameter", &self.parameter)
            .field("description", &self.description)
            .field("default", &self.default)
            .field("parser", &self.parser.as_ref().map(|_| ".."))
            .finish()
    }
}

impl FlagSpec {
    /// Declare a flag writing to `config_path`.
    ///
    /// Fails on descriptors that name no flag, contain an empty name (`"-v, "`),
    /// a name with whitespace, or an unterminated parameter hint.
    pub fn new(config_path: &str, descriptor: &str) -> Result<Self, LayerfigError> {
        let (tokens, parameter) = parse_descriptor(descriptor)?;
        if tokens.is_empty() {
            return Err(invalid(descriptor, "no flag name"));
        }
        Ok(Self::from_parts(config_path, tokens, parameter))
    }

    /// Declare a flag from bare token names instead of a descriptor string.
    pub fn with_tokens<I, S>(config_path: &str, tokens: I) -> Result<Self, LayerfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = tokens
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self::new(config_path, &joined)
    }

    /// A standard-input source. The descriptor is optional: when given, the
    /// same value may also be supplied as a flag.
    pub fn stdin(config_path: &str, descriptor: Option<&str>) -> Result<Self, LayerfigError> {
        let (tokens, parameter) = match descriptor.map(str::trim) {
            Some(d) if !d.is_empty() => parse_descriptor(d)?,
            _ => (Vec::new(), None),
        };
        Ok(Self::from_parts(config_path, tokens, parameter))
    }

    fn from_parts(config_path: &str, tokens: Vec<String>, parameter: Option<String>) -> Self {
        Self {
            config_path: config_path.to_string(),
            tokens,
            parameter,
            description: None,
            default: None,
            parser: None,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Value written when none of the tokens appear.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn parser<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.parser = Some(Arc::new(f));
        self
    }

    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    /// Flag names without dashes, in declaration order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn claims(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Run the parser, if any. `Err` carries the parser's message.
    pub fn apply_parser(&self, raw: Value) -> Result<Value, String> {
        match &self.parser {
            Some(parse) => parse(&raw),
            None => Ok(raw),
        }
    }

    /// Flags as typed on the command line: `-v, --version [a-version]`.
    pub fn display_flags(&self) -> String {
        let mut out = display_tokens(&self.tokens);
        if let Some(param) = &self.parameter {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(param);
        }
        out
    }
}

/// `["v", "version"]` → `-v, --version`.
pub fn display_tokens(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| dashed(t))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single-character names are short flags.
pub fn dashed(token: &str) -> String {
    if token.chars().count() == 1 {
        format!("-{token}")
    } else {
        format!("--{token}")
    }
}

fn invalid(descriptor: &str, reason: &str) -> LayerfigError {
    LayerfigError::InvalidFlag {
        descriptor: descriptor.to_string(),
        reason: reason.to_string(),
    }
}

/// Split a descriptor into flag names and the parameter hint.
fn parse_descriptor(descriptor: &str) -> Result<(Vec<String>, Option<String>), LayerfigError> {
    let (names, parameter) = match descriptor.find(['[', '<']) {
        Some(open) => {
            let close_char = if descriptor[open..].starts_with('[') { ']' } else { '>' };
            let Some(close) = descriptor[open..].find(close_char).map(|i| open + i) else {
                return Err(invalid(descriptor, "unterminated parameter hint"));
            };
            if !descriptor[close + 1..].trim().is_empty() {
                return Err(invalid(descriptor, "text after parameter hint"));
            }
            (&descriptor[..open], Some(descriptor[open..=close].to_string()))
        }
        None => (descriptor, None),
    };

    let names = names.trim();
    if names.is_empty() {
        return Ok((Vec::new(), parameter));
    }

    let mut tokens = Vec::new();
    for raw in names.split(',') {
        let name = raw.trim().trim_start_matches('-');
        if name.is_empty() {
            return Err(invalid(descriptor, "empty flag name"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(invalid(descriptor, "flag names cannot contain whitespace"));
        }
        if !tokens.iter().any(|t: &String| t == name) {
            tokens.push(name.to_string());
        }
    }
    Ok((tokens, parameter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long() {
        let spec = FlagSpec::new("version", "-v, --version").unwrap();
        assert_eq!(spec.tokens(), &["v", "version"]);
        assert_eq!(spec.parameter(), None);
        assert_eq!(spec.config_path(), "version");
    }

    #[test]
    fn dashes_are_optional() {
        assert_eq!(FlagSpec::new("version", "v").unwrap().tokens(), &["v"]);
        assert_eq!(FlagSpec::new("version", "-v").unwrap().tokens(), &["v"]);
    }

    #[test]
    fn whitespace_is_trimmed() {
        let spec = FlagSpec::new("version", "   -v, \t--version\n\r").unwrap();
        assert_eq!(spec.tokens(), &["v", "version"]);
    }

    #[test]
    fn parameter_hint_is_extracted() {
        let spec = FlagSpec::new("version", "-v, --version [a-version]").unwrap();
        assert_eq!(spec.tokens(), &["v", "version"]);
        assert_eq!(spec.parameter(), Some("[a-version]"));
        assert_eq!(spec.display_flags(), "-v, --version [a-version]");
    }

    #[test]
    fn hint_may_contain_commas() {
        let spec = FlagSpec::new("names", "-n, --names [name,...]").unwrap();
        assert_eq!(spec.tokens(), &["n", "names"]);
        assert_eq!(spec.parameter(), Some("[name,...]"));
    }

    #[test]
    fn angle_bracket_hint() {
        let spec = FlagSpec::new("file", "--file <path>").unwrap();
        assert_eq!(spec.parameter(), Some("<path>"));
    }

    #[test]
    fn token_list_form() {
        let spec = FlagSpec::with_tokens("version", ["-v", "--version"]).unwrap();
        assert_eq!(spec.tokens(), &["v", "version"]);
    }

    #[test]
    fn malformed_descriptors_fail() {
        for bad in ["", "  ", "-v, ", "-v,,--version", "--", "--my flag", "-f [open", "-f [x] y"] {
            let err = FlagSpec::new("p", bad).unwrap_err();
            assert!(matches!(err, LayerfigError::InvalidFlag { .. }), "{bad:?}");
        }
    }

    #[test]
    fn stdin_allows_no_descriptor() {
        let spec = FlagSpec::stdin("path", None).unwrap();
        assert!(spec.tokens().is_empty());
        let spec = FlagSpec::stdin("path", Some("-d, --data [text]")).unwrap();
        assert_eq!(spec.tokens(), &["d", "data"]);
    }

    #[test]
    fn parser_runs_on_raw_value() {
        let spec = FlagSpec::new("names", "-n")
            .unwrap()
            .parser(|v| Ok(Value::from(v.to_string().split(',').map(String::from).collect::<Vec<_>>())));
        assert_eq!(
            spec.apply_parser(Value::from("a,b")).unwrap(),
            Value::from(vec!["a", "b"])
        );
    }

    #[test]
    fn no_parser_passes_through() {
        let spec = FlagSpec::new("x", "-x").unwrap();
        assert_eq!(spec.apply_parser(Value::Bool(true)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn dashed_forms() {
        assert_eq!(dashed("h"), "-h");
        assert_eq!(dashed("help"), "--help");
        assert_eq!(display_tokens(&["h".into(), "help".into()]), "-h, --help");
    }
}
