use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::argv::ArgMap;
use crate::cli::{CliState, Interpretation};
use crate::env::{self, EnvSource, EnvironmentSearch, ProcessEnv};
use crate::error::LayerfigError;
use crate::file::{self, ByteSource, FsSource};
use crate::flags::FlagSpec;
use crate::format;
use crate::list::ListOptions;
use crate::merge;
use crate::provenance::Trace;
use crate::stdin::{self, ProcessStdin, StdinSource};
use crate::store::ConfigStore;
use crate::types::{Gate, Options, SearchMode, SearchPath};
use crate::value::Value;

const LABEL_SET: &str = "SET";
const LABEL_OBJECT: &str = "OBJECT";

/// Entry point for assembling a layered configuration.
pub struct Layerfig;

impl Layerfig {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Result of a `cli_parse*` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Flag values were written to the store.
    Applied,
    /// The help flag was given and the help callback received this text.
    Help(String),
    /// The environment gate did not match; nothing was applied.
    Skipped,
}

/// Accumulates layers into a [`ConfigStore`], in the order they are declared.
///
/// Every source call (`object`, `file`, `env`, `set`, `cli_parse`, ...) is a
/// layer merged on top of what came before. Prefix a call with
/// [`when`](Self::when) to apply it only in some runtime environments:
///
/// ```
/// use layerfig::{Layerfig, Value};
/// use serde_json::json;
///
/// let mut config = Layerfig::builder();
/// config.use_runtime_environment("dev");
/// config
///     .object(json!({"db": {"host": "localhost", "port": 5432}}))?
///     .when(["prod"])
///     .object(json!({"db": {"host": "db.internal"}}))?;
///
/// assert_eq!(config.get("db.host")?, Some(&Value::from("localhost")));
/// # Ok::<(), layerfig::LayerfigError>(())
/// ```
///
/// Collaborators for the process environment, file reads and standard input
/// can be swapped with [`with_env`](Self::with_env),
/// [`with_files`](Self::with_files) and [`with_stdin`](Self::with_stdin).
pub struct ConfigBuilder {
    store: ConfigStore,
    options: Options,
    environment: Option<String>,
    cli: CliState,
    last_args: Option<ArgMap>,
    env: Box<dyn EnvSource>,
    files: Box<dyn ByteSource>,
    stdin: Box<dyn StdinSource>,
}

impl fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("store", &self.store)
            .field("options", &self.options)
            .field("environment", &self.environment)
            .field("cli", &self.cli)
            .finish_non_exhaustive()
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A builder with an environment gate attached to its next source call.
///
/// Created by [`ConfigBuilder::when`] and [`ConfigBuilder::always`]. The gate
/// is consumed by that one call; the builder it hands back is ungated.
#[must_use = "a gate does nothing until a source is applied through it"]
pub struct Gated<'a> {
    config: &'a mut ConfigBuilder,
    gate: Gate,
}

impl<'a> Gated<'a> {
    pub fn object(self, value: impl Into<Value>) -> Result<&'a mut ConfigBuilder, LayerfigError> {
        self.config.apply_object(&self.gate, value.into())?;
        Ok(self.config)
    }

    pub fn object_from<S: Serialize + ?Sized>(
        self,
        source: &S,
    ) -> Result<&'a mut ConfigBuilder, LayerfigError> {
        let value = Value::from_serialize(source)?;
        self.object(value)
    }

    pub fn file(self, path: impl AsRef<Path>) -> Result<&'a mut ConfigBuilder, LayerfigError> {
        self.config.apply_file(&self.gate, path.as_ref())?;
        Ok(self.config)
    }

    pub fn files<I, P>(self, paths: I) -> Result<&'a mut ConfigBuilder, LayerfigError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        self.config.apply_files(&self.gate, &paths)?;
        Ok(self.config)
    }

    pub fn search_files(
        self,
        search_paths: &[SearchPath],
        file_name: &str,
        mode: SearchMode,
    ) -> Result<&'a mut ConfigBuilder, LayerfigError> {
        self.config
            .apply_search(&self.gate, search_paths, file_name, mode)?;
        Ok(self.config)
    }

    pub fn env(self, path: &str, var: &str) -> Result<&'a mut ConfigBuilder, LayerfigError> {
        self.config.apply_env(&self.gate, path, var, None)?;
        Ok(self.config)
    }

    pub fn env_with<F>(
        self,
        path: &str,
        var: &str,
        parser: F,
    ) -> Result<&'a mut ConfigBuilder, LayerfigError>
    where
        F: Fn(&str) -> Result<Value, String>,
    {
        self.config.apply_env(&self.gate, path, var, Some(&parser))?;
        Ok(self.config)
    }

    pub fn env_prefix(self, prefix: &str) -> Result<&'a mut ConfigBuilder, LayerfigError> {
        self.config.apply_env_prefix(&self.gate, prefix)?;
        Ok(self.config)
    }

    pub fn set(
        self,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<&'a mut ConfigBuilder, LayerfigError> {
        if self.config.gate_open(&self.gate, LABEL_SET) {
            self.config.apply(path, value.into(), LABEL_SET)?;
        }
        Ok(self.config)
    }

    /// Run `f` against the builder if the gate matches.
    pub fn call<F>(self, f: F) -> Result<&'a mut ConfigBuilder, LayerfigError>
    where
        F: FnOnce(&mut ConfigBuilder) -> Result<(), LayerfigError>,
    {
        if self.config.gate_open(&self.gate, "CALL") {
            f(&mut *self.config)?;
        }
        Ok(self.config)
    }

    pub fn cli_parse(self) -> Result<ParseOutcome, LayerfigError> {
        self.config.apply_cli(&self.gate, ArgMap::parse_os(std::env::args_os().skip(1)))
    }

    pub fn cli_parse_from<I, S>(self, tokens: I) -> Result<ParseOutcome, LayerfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.apply_cli(&self.gate, ArgMap::parse(tokens))
    }

    pub fn cli_parse_str(self, line: &str) -> Result<ParseOutcome, LayerfigError> {
        self.config.apply_cli(&self.gate, ArgMap::parse_str(line))
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            store: ConfigStore::new(),
            options: Options::default(),
            environment: None,
            cli: CliState::new(),
            last_args: None,
            env: Box::new(ProcessEnv),
            files: Box::new(FsSource),
            stdin: Box::new(ProcessStdin::new()),
        }
    }

    // --- collaborators -----------------------------------------------------

    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    pub fn with_files(mut self, files: impl ByteSource + 'static) -> Self {
        self.files = Box::new(files);
        self
    }

    pub fn with_stdin(mut self, stdin: impl StdinSource + 'static) -> Self {
        self.stdin = Box::new(stdin);
        self
    }

    pub fn options(&mut self, options: Options) -> &mut Self {
        self.options = options;
        self
    }

    pub fn current_options(&self) -> &Options {
        &self.options
    }

    // --- runtime environment -----------------------------------------------

    /// Select the runtime environment explicitly.
    pub fn use_runtime_environment(&mut self, label: &str) -> &mut Self {
        tracing::debug!(environment = label, "using runtime environment");
        self.environment = Some(label.to_string());
        self
    }

    /// Discover the runtime environment. When nothing is found the current
    /// selection is cleared.
    pub fn find_runtime_environment(&mut self, search: &EnvironmentSearch) -> &mut Self {
        self.environment = search.search(self.env.as_ref(), self.files.as_ref());
        match &self.environment {
            Some(found) => tracing::debug!(environment = %found, "found runtime environment"),
            None => tracing::debug!("no runtime environment found"),
        }
        self
    }

    /// The selected environment. Upper-cased unless
    /// [`Options::case_sensitive_environments`] is set.
    pub fn runtime_environment(&self) -> Option<String> {
        self.environment.as_deref().map(|e| self.normalize_label(e))
    }

    pub fn is_runtime_environment(&self, label: &str) -> bool {
        self.runtime_environment()
            .is_some_and(|current| current == self.normalize_label(label))
    }

    fn normalize_label(&self, label: &str) -> String {
        if self.options.case_sensitive_environments {
            label.to_string()
        } else {
            label.to_uppercase()
        }
    }

    // --- gates -------------------------------------------------------------

    /// Gate the next source call on the runtime environment being one of
    /// `labels`. With no environment selected the gate never matches.
    pub fn when<I, S>(&mut self, labels: I) -> Gated<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Gated {
            config: self,
            gate: Gate::WhenSet(labels),
        }
    }

    pub fn always(&mut self) -> Gated<'_> {
        Gated {
            config: self,
            gate: Gate::Always,
        }
    }

    fn gate_open(&self, gate: &Gate, layer: &str) -> bool {
        let open = match gate {
            Gate::Always => true,
            Gate::WhenSet(labels) => self
                .runtime_environment()
                .is_some_and(|current| labels.iter().any(|l| self.normalize_label(l) == current)),
        };
        if !open && self.options.debug {
            tracing::debug!(layer, environment = ?self.environment, "skipping layer outside its environments");
        }
        open
    }

    fn apply(&mut self, path: &str, value: Value, label: &str) -> Result<(), LayerfigError> {
        self.store.set(path, value, label)?;
        if self.options.debug {
            tracing::debug!(path, label, environment = ?self.environment, "applied layer");
        }
        Ok(())
    }

    // --- sources -----------------------------------------------------------

    /// Merge a map at the root. Label `OBJECT`.
    pub fn object(&mut self, value: impl Into<Value>) -> Result<&mut Self, LayerfigError> {
        self.always().object(value)
    }

    /// Merge any serializable value (a struct of defaults, a `HashMap`, ...)
    /// at the root.
    pub fn object_from<S: Serialize + ?Sized>(&mut self, source: &S) -> Result<&mut Self, LayerfigError> {
        self.always().object_from(source)
    }

    /// Merge a JSON or TOML file at the root. Label `FILE <path>`.
    ///
    /// A missing file is skipped silently; unreadable or malformed files are
    /// logged and skipped.
    pub fn file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, LayerfigError> {
        self.always().file(path)
    }

    /// Merge the first of `paths` that exists.
    pub fn files<I, P>(&mut self, paths: I) -> Result<&mut Self, LayerfigError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.always().files(paths)
    }

    /// Discover `file_name` across `search_paths` (priority-ascending) and
    /// merge what is found according to `mode`.
    pub fn search_files(
        &mut self,
        search_paths: &[SearchPath],
        file_name: &str,
        mode: SearchMode,
    ) -> Result<&mut Self, LayerfigError> {
        self.always().search_files(search_paths, file_name, mode)
    }

    /// Copy an environment variable, as a string, to `path`. Label `ENV <VAR>`.
    pub fn env(&mut self, path: &str, var: &str) -> Result<&mut Self, LayerfigError> {
        self.always().env(path, var)
    }

    /// Like [`env`](Self::env), converting the raw string with `parser`.
    /// A parser error is logged and the variable ignored.
    pub fn env_with<F>(&mut self, path: &str, var: &str, parser: F) -> Result<&mut Self, LayerfigError>
    where
        F: Fn(&str) -> Result<Value, String>,
    {
        self.always().env_with(path, var, parser)
    }

    /// Merge every `{PREFIX}__A__B` variable at `a.b`. Label `ENV <PREFIX>__*`.
    pub fn env_prefix(&mut self, prefix: &str) -> Result<&mut Self, LayerfigError> {
        self.always().env_prefix(prefix)
    }

    /// Merge `value` at `path`. Label `SET`.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, LayerfigError> {
        self.always().set(path, value)
    }

    fn apply_object(&mut self, gate: &Gate, value: Value) -> Result<(), LayerfigError> {
        if !self.gate_open(gate, LABEL_OBJECT) {
            return Ok(());
        }
        self.apply(".", value, LABEL_OBJECT)
    }

    fn apply_file(&mut self, gate: &Gate, path: &Path) -> Result<(), LayerfigError> {
        let label = file_label(path);
        if !self.gate_open(gate, &label) {
            return Ok(());
        }
        match self.files.read(path) {
            Ok(Some(content)) => self.apply_file_content(path, &content),
            Ok(None) => {
                tracing::debug!(path = %path.display(), "config file not found; skipping");
                Ok(())
            }
            Err(e) => {
                tracing::error!("{e}");
                Ok(())
            }
        }
    }

    fn apply_files(&mut self, gate: &Gate, paths: &[PathBuf]) -> Result<(), LayerfigError> {
        if !self.gate_open(gate, "FILES") {
            return Ok(());
        }
        match self.files.read_first(paths) {
            Some((path, content)) => self.apply_file_content(&path, &content),
            None => {
                tracing::debug!(candidates = paths.len(), "no config file found; skipping");
                Ok(())
            }
        }
    }

    fn apply_search(
        &mut self,
        gate: &Gate,
        search_paths: &[SearchPath],
        file_name: &str,
        mode: SearchMode,
    ) -> Result<(), LayerfigError> {
        if !self.gate_open(gate, file_name) {
            return Ok(());
        }
        let found = file::load_config_files(self.files.as_ref(), search_paths, file_name, mode);
        for (path, content) in found {
            self.apply_file_content(&path, &content)?;
        }
        Ok(())
    }

    fn apply_file_content(&mut self, path: &Path, content: &str) -> Result<(), LayerfigError> {
        let value = match format::parse_file(path, content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("{e}; skipping");
                return Ok(());
            }
        };
        if !value.is_map() {
            tracing::warn!(
                path = %path.display(),
                "config file holds a {} rather than a map; skipping",
                value.kind()
            );
            return Ok(());
        }
        self.apply(".", value, &file_label(path))
    }

    fn apply_env(
        &mut self,
        gate: &Gate,
        path: &str,
        var: &str,
        parser: Option<&dyn Fn(&str) -> Result<Value, String>>,
    ) -> Result<(), LayerfigError> {
        let label = format!("ENV {var}");
        if !self.gate_open(gate, &label) {
            return Ok(());
        }
        let Some(raw) = self.env.get(var) else {
            return Ok(());
        };
        let value = match parser {
            Some(parse) => match parse(&raw) {
                Ok(value) => value,
                Err(reason) => {
                    tracing::warn!("failed to parse ${var}: {reason}");
                    return Ok(());
                }
            },
            None => Value::String(raw),
        };
        self.apply(path, value, &label)
    }

    fn apply_env_prefix(&mut self, gate: &Gate, prefix: &str) -> Result<(), LayerfigError> {
        let label = format!("ENV {prefix}__*");
        if !self.gate_open(gate, &label) {
            return Ok(());
        }
        let map = env::env_to_map(prefix, self.env.vars());
        if map.is_empty() {
            return Ok(());
        }
        self.apply(".", Value::Map(map), &label)
    }

    // --- command line ------------------------------------------------------

    pub fn cli_flag(&mut self, spec: FlagSpec) -> &mut Self {
        self.cli.add_flag(spec);
        self
    }

    /// Collect bare arguments as a list at `path`.
    pub fn cli_arguments(&mut self, path: &str) -> &mut Self {
        self.cli.set_arguments(path);
        self
    }

    /// Declare a standard-input source. Input is read when the command line
    /// is parsed, and wins over the same flag given as an argument.
    pub fn cli_stdin(&mut self, spec: FlagSpec) -> &mut Self {
        self.cli.set_stdin(spec);
        self
    }

    pub fn cli_usage(&mut self, usage: &str) -> &mut Self {
        self.cli.set_usage(usage);
        self
    }

    /// Program name for the usage line (default: the executable's file name).
    pub fn cli_program_name(&mut self, name: &str) -> &mut Self {
        self.cli.set_program(name);
        self
    }

    /// Hand help text to `callback` instead of printing it and exiting.
    pub fn cli_on_help<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.cli.set_on_help(Arc::new(callback));
        self
    }

    pub fn cli_help_message(&self) -> String {
        self.cli.help_message()
    }

    /// Parse the process arguments.
    ///
    /// If the help flag is present and no [`cli_on_help`](Self::cli_on_help)
    /// callback is registered, help is printed and the process exits with
    /// code `0`.
    pub fn cli_parse(&mut self) -> Result<ParseOutcome, LayerfigError> {
        self.always().cli_parse()
    }

    pub fn cli_parse_from<I, S>(&mut self, tokens: I) -> Result<ParseOutcome, LayerfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.always().cli_parse_from(tokens)
    }

    /// Parse a whitespace-separated line.
    pub fn cli_parse_str(&mut self, line: &str) -> Result<ParseOutcome, LayerfigError> {
        self.always().cli_parse_str(line)
    }

    /// Raw tokenized value of a flag from the last parse.
    pub fn command_line_value(&self, token: &str) -> Option<&Value> {
        self.last_args.as_ref()?.get(token.trim_start_matches('-'))
    }

    fn apply_cli(&mut self, gate: &Gate, args: ArgMap) -> Result<ParseOutcome, LayerfigError> {
        if !self.gate_open(gate, "CLI") {
            self.last_args = Some(args);
            return Ok(ParseOutcome::Skipped);
        }

        let captured = if self.cli.has_stdin() && !self.cli.wants_help(&args) {
            self.stdin.read_all().map(stdin::to_value)
        } else {
            None
        };
        let interpretation = self.cli.interpret(&args, captured);
        self.last_args = Some(args);

        match interpretation {
            Interpretation::Apply(writes) => {
                for write in writes {
                    self.apply(&write.path, write.value, &write.label)?;
                }
                Ok(ParseOutcome::Applied)
            }
            Interpretation::Help => {
                let text = self.cli.help_message();
                match self.cli.on_help() {
                    Some(callback) => {
                        callback(&text);
                        Ok(ParseOutcome::Help(text))
                    }
                    None => {
                        print!("{text}");
                        std::process::exit(0);
                    }
                }
            }
        }
    }

    // --- reads -------------------------------------------------------------

    pub fn get(&self, path: &str) -> Result<Option<&Value>, LayerfigError> {
        self.store.get(path)
    }

    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Result<Value, LayerfigError> {
        self.store.get_or(path, default.into())
    }

    /// Deserialize the subtree at `path` into `T`. `None` when absent.
    pub fn extract<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, LayerfigError> {
        let Some(value) = self.store.get(path)? else {
            return Ok(None);
        };
        let parse_err = |e: serde_json::Error| LayerfigError::Parse {
            source_name: format!("config at '{path}'"),
            reason: e.to_string(),
        };
        let json = serde_json::to_value(value).map_err(parse_err)?;
        serde_json::from_value(json).map(Some).map_err(parse_err)
    }

    pub fn trace(&self, path: &str) -> Option<&str> {
        self.store.trace(path)
    }

    pub fn trace_map(&self) -> &Trace {
        self.store.trace_map()
    }

    /// Deep-merge two values without touching the store.
    pub fn merge_objects(&self, base: &Value, overlay: Value) -> Value {
        merge::merge_values(Some(base), overlay)
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn into_store(self) -> ConfigStore {
        self.store
    }

    // --- lifecycle ---------------------------------------------------------

    /// Freeze the configuration. Later writes warn and are ignored, or fail
    /// when [`Options::exception_on_locked`] is set.
    pub fn lock(&mut self) -> &mut Self {
        self.store.lock(self.options.exception_on_locked);
        self
    }

    /// Freeze, choosing explicitly whether later writes fail.
    pub fn lock_with(&mut self, exception_on_locked: bool) -> &mut Self {
        self.store.lock(exception_on_locked);
        self
    }

    pub fn is_locked(&self) -> bool {
        self.store.is_locked()
    }

    /// Back to a freshly constructed state. Collaborators are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.store.reset();
        self.options = Options::default();
        self.environment = None;
        self.cli = CliState::new();
        self.last_args = None;
        self
    }

    // --- listing -----------------------------------------------------------

    /// List options seeded from [`Options`].
    pub fn list_options(&self) -> ListOptions {
        ListOptions::new()
            .max_depth(self.options.max_list_depth)
            .max_value_length(self.options.max_list_value_length)
    }

    /// `CONFIG: [ENV]`, plus ` [LOCKED]` once locked.
    pub fn list_header(&self) -> String {
        let environment = self.runtime_environment().unwrap_or_default();
        let mut header = format!("CONFIG: [{environment}]");
        if self.is_locked() {
            header.push_str(" [LOCKED]");
        }
        header
    }

    /// Print the header and the tree to stdout.
    pub fn list(&self, options: &ListOptions) {
        self.list_to(options, &mut |line| println!("{line}"));
    }

    pub fn list_to(&self, options: &ListOptions, sink: &mut dyn FnMut(&str)) {
        if options.max_depth == 0 {
            return;
        }
        sink(&self.list_header());
        self.store.list(options, sink);
    }
}

fn file_label(path: &Path) -> String {
    format!("FILE {}", path.display())
}
