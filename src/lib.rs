//! Layered configuration assembly with per-key provenance.
//!
//! Layerfig accumulates configuration from objects, files, environment
//! variables, command-line flags and standard input, in the order you declare
//! them. Each layer is deep-merged on top of the previous ones, and every key
//! remembers which layer last wrote it.
//!
//! ```
//! use layerfig::{FlagSpec, Layerfig, Value};
//! use serde_json::json;
//!
//! let mut config = Layerfig::builder();
//! config
//!     .object(json!({"server": {"host": "localhost", "port": 8080}}))?
//!     .cli_flag(FlagSpec::new("server.port", "-p, --port [port]")?.description("listen port"));
//! config.cli_parse_from(["--port", "9090"])?;
//!
//! assert_eq!(config.get("server.port")?, Some(&Value::from("9090")));
//! assert_eq!(config.trace("server.port"), Some("CLI --port"));
//! assert_eq!(config.trace("server.host"), Some("OBJECT"));
//! # Ok::<(), layerfig::LayerfigError>(())
//! ```
//!
//! # Merge rules
//!
//! Only maps merge. Everything else (scalars, lists, binary blobs, callables)
//! replaces whatever was at that key before; lists are never concatenated.
//! Merging never mutates either input.
//!
//! # Key paths
//!
//! `"a.b.c"` addresses nested maps and `"."` addresses the root. Writing
//! through a missing intermediate creates it; writing or reading *through* a
//! non-map is a [`LayerfigError::StructuralPath`]. A read that simply misses
//! returns `None`.
//!
//! # Runtime environments
//!
//! A builder may select one runtime environment label, explicitly with
//! [`ConfigBuilder::use_runtime_environment`] or by discovery with
//! [`ConfigBuilder::find_runtime_environment`] (an environment variable,
//! then marker files, then a default). [`ConfigBuilder::when`] restricts the
//! next source call to a set of labels. Comparison ignores case unless
//! [`Options::case_sensitive_environments`] is set.
//!
//! # Locking
//!
//! [`ConfigBuilder::lock`] freezes the configuration. Later writes are
//! dropped with a warning, or fail with [`LayerfigError::Locked`] when
//! [`Options::exception_on_locked`] is set.
//!
//! # Command line
//!
//! Flags are declared with [`FlagSpec`] descriptors like
//! `"-v, --version [a-version]"`. The tokenizer understands `--long`, short
//! clusters (`-abc`), `--` and repeated values (which become lists). A help
//! flag is added for whichever of `-h`/`--help` you did not claim.
//!
//! # Logging
//!
//! Layerfig logs through [`tracing`]: locked writes, unreadable files, parse
//! failures and flag-parser errors are warnings; applied layers are logged at
//! `debug` when [`Options::debug`] is on. No subscriber is installed.

pub mod error;
pub mod types;

mod argv;
mod builder;
mod cli;
mod env;
mod file;
mod flags;
mod format;
mod help;
mod list;
pub(crate) mod merge;
mod path;
mod provenance;
mod stdin;
mod store;
mod value;

pub use argv::ArgMap;
pub use builder::{ConfigBuilder, Gated, Layerfig, ParseOutcome};
pub use cli::{CliState, CliWrite, HelpCallback, Interpretation};
pub use env::{EnvSource, EnvironmentSearch, MapEnv, ProcessEnv, env_to_map};
pub use error::LayerfigError;
pub use file::{ByteSource, FsSource};
pub use flags::{FlagParser, FlagSpec};
pub use format::{ConfigFormat, JsonFormat, TomlFormat};
pub use list::{ListOptions, SecureMatcher, ValueFormatter};
pub use merge::{deep_merge, merge_values};
pub use path::KeyPath;
pub use provenance::Trace;
pub use stdin::{FixedStdin, ProcessStdin, StdinSource};
pub use store::{ConfigStore, LockState};
pub use types::{Boundary, Gate, Options, SearchMode, SearchPath};
pub use value::{Callable, Map, Value};
