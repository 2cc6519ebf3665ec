//! # layerfig demo application
//!
//! A small tool that assembles its configuration from every kind of layer
//! layerfig supports and prints the result with provenance. It exists to
//! demonstrate and manually verify the library.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example layerfig_demo
//! cargo run --example layerfig_demo -- --port 9999 -v
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                | How to exercise it                                                   |
//! |------------------------|----------------------------------------------------------------------|
//! | Compiled defaults      | `cargo run --example layerfig_demo`                                  |
//! | Runtime environment    | `DEMO_ENV=prod cargo run --example layerfig_demo`                    |
//! | Config file discovery  | Create `layerfig-demo.json` in cwd or any parent                     |
//! | Env var prefix         | `DEMO__SERVER__HOST=0.0.0.0 cargo run --example layerfig_demo`      |
//! | Single env var         | `DATABASE_URL=pg://x cargo run --example layerfig_demo`              |
//! | Flags                  | `cargo run --example layerfig_demo -- --port 9999 -v`                |
//! | Bare arguments         | `cargo run --example layerfig_demo -- -- a b c`                      |
//! | Stdin                  | `echo hello \| cargo run --example layerfig_demo`                    |
//! | Help                   | `cargo run --example layerfig_demo -- --help`                        |
//! | Logging                | `RUST_LOG=layerfig=debug cargo run --example layerfig_demo`          |

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use layerfig::{
    Boundary, EnvironmentSearch, FlagSpec, Layerfig, LayerfigError, Options, ProcessStdin,
    SearchMode, SearchPath, Value,
};

#[derive(Debug, Deserialize)]
struct Server {
    host: String,
    port: String,
}

fn main() -> Result<(), LayerfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut config =
        Layerfig::builder().with_stdin(ProcessStdin::new().timeout(Duration::from_millis(200)));
    config.options(Options {
        debug: true,
        ..Options::default()
    });
    config.find_runtime_environment(&EnvironmentSearch::new().env("DEMO_ENV").default_label("dev"));

    config
        .object(json!({
            "server": {"host": "localhost", "port": "8080"},
            "database": {"url": "postgres://localhost/demo", "password": "hunter2"},
            "verbose": false,
        }))?
        .when(["prod"])
        .object(json!({"server": {"host": "demo.example.com"}}))?
        .search_files(
            &[SearchPath::Ancestors(Boundary::Root)],
            "layerfig-demo.json",
            SearchMode::Merge,
        )?
        .env_prefix("DEMO")?
        .env("database.url", "DATABASE_URL")?;

    config
        .cli_usage("[flags] [-- args...]")
        .cli_program_name("layerfig-demo")
        .cli_flag(FlagSpec::new("server.port", "-p, --port [port]")?.description("port to listen on"))
        .cli_flag(
            FlagSpec::new("verbose", "-v, --verbose")?
                .description("chatty output")
                .parser(|raw| Ok(Value::Bool(raw.as_bool().unwrap_or(true)))),
        )
        .cli_arguments("args")
        .cli_stdin(FlagSpec::stdin("input", Some("-i, --input [text]"))?.description("text to echo"));
    config.cli_parse()?;
    config.lock();

    let list = config
        .list_options()
        .secure("database.password")
        .color(true);
    config.list(&list);

    if let Some(server) = config.extract::<Server>("server")? {
        println!("\nlistening on {}:{}", server.host, server.port);
    }
    Ok(())
}
