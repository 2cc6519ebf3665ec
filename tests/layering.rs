//! End-to-end layering scenarios through the public API.

use std::fs;

use layerfig::{
    EnvironmentSearch, FixedStdin, FlagSpec, Layerfig, LayerfigError, MapEnv, Options,
    ParseOutcome, SecureMatcher, Value,
};
use serde_json::json;
use tempfile::TempDir;

fn v(j: serde_json::Value) -> Value {
    Value::from(j)
}

fn lines(config: &layerfig::ConfigBuilder, opts: &layerfig::ListOptions) -> Vec<String> {
    let mut out = Vec::new();
    config.list_to(opts, &mut |line| out.push(line.to_string()));
    out
}

#[test]
fn two_objects_merge_and_trace() {
    let mut config = Layerfig::builder();
    config.object(json!({"a": {"b": 1, "c": 2}})).unwrap();
    config.set("marker", "between").unwrap();
    config.object(json!({"a": {"b": 3}})).unwrap();

    assert_eq!(config.get("a").unwrap(), Some(&v(json!({"b": 3, "c": 2}))));
    assert_eq!(config.trace("a.b"), Some("OBJECT"));
    assert_eq!(config.trace("a.c"), Some("OBJECT"));
    assert_eq!(config.trace("marker"), Some("SET"));
}

#[test]
fn later_layer_traces_only_what_it_touches() {
    let mut config = Layerfig::builder();
    config.object(json!({"a": {"b": 1, "c": 2}})).unwrap();
    config.set("a", json!({"b": 3})).unwrap();

    assert_eq!(config.trace("a"), Some("SET"));
    assert_eq!(config.trace("a.b"), Some("SET"));
    assert_eq!(config.trace("a.c"), Some("OBJECT"));
}

#[test]
fn environment_gating_flips_with_label() {
    let mut config = Layerfig::builder();
    config.use_runtime_environment("DEV");
    config.when(["PROD"]).object(json!({"db": {"host": "prod"}})).unwrap();
    assert_eq!(config.get("db.host").unwrap(), None);

    config.use_runtime_environment("PROD");
    config.when(["PROD"]).object(json!({"db": {"host": "prod"}})).unwrap();
    assert_eq!(config.get("db.host").unwrap(), Some(&Value::from("prod")));
}

#[test]
fn full_stack_precedence() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("app.json"),
        r#"{"server": {"host": "file-host", "port": "1000"}, "tags": ["a", "b"]}"#,
    )
    .unwrap();
    fs::write(dir.path().join("env"), "staging\n").unwrap();

    let env = MapEnv::new()
        .with("APP__SERVER__PORT", "2000")
        .with("TOKEN", "secret");
    let mut config = Layerfig::builder().with_env(env);
    config.find_runtime_environment(
        &EnvironmentSearch::new()
            .env("APP_ENV")
            .path(dir.path().join("env"))
            .default_label("local"),
    );
    assert_eq!(config.runtime_environment().as_deref(), Some("STAGING"));

    config
        .object(json!({"server": {"host": "default", "port": "80", "tls": false}, "tags": ["x"]}))
        .unwrap()
        .file(dir.path().join("app.json"))
        .unwrap()
        .when(["staging"])
        .env_prefix("APP")
        .unwrap()
        .env("token", "TOKEN")
        .unwrap()
        .cli_flag(FlagSpec::new("server.port", "-p, --port [port]").unwrap());
    config.cli_parse_str("-p 3000").unwrap();

    assert_eq!(
        config.get(".").unwrap(),
        Some(&v(json!({
            "server": {"host": "file-host", "port": "3000", "tls": false},
            "tags": ["a", "b"],
            "token": "secret",
        })))
    );
    assert_eq!(config.trace("server.tls"), Some("OBJECT"));
    assert_eq!(config.trace("server.port"), Some("CLI -p"));
    assert_eq!(config.trace("token"), Some("ENV TOKEN"));
    let file_label = format!("FILE {}", dir.path().join("app.json").display());
    assert_eq!(config.trace("server.host"), Some(file_label.as_str()));
}

#[test]
fn lock_scenario() {
    let mut config = Layerfig::builder();
    config.set("k", "A").unwrap();
    config.lock();
    config.set("k", "B").unwrap();
    assert_eq!(config.get("k").unwrap(), Some(&Value::from("A")));

    let mut strict = Layerfig::builder();
    strict.options(Options {
        exception_on_locked: true,
        ..Options::default()
    });
    strict.lock();
    let err = strict.set("k", "B").unwrap_err();
    assert!(matches!(err, LayerfigError::Locked { .. }));
}

#[test]
fn structural_errors_surface() {
    let mut config = Layerfig::builder();
    config.set("a", "scalar").unwrap();
    assert!(matches!(
        config.set("a.b", 1),
        Err(LayerfigError::StructuralPath { .. })
    ));
    assert!(matches!(
        config.get("a.b"),
        Err(LayerfigError::StructuralPath { .. })
    ));
    assert_eq!(config.get("missing.deeper").unwrap(), None);
}

#[test]
fn cli_version_flag() {
    let mut config = Layerfig::builder();
    config.cli_flag(FlagSpec::new("version", "-v, --version").unwrap());
    config.cli_parse_from(["-v", "1.2.3"]).unwrap();
    assert_eq!(config.get("version").unwrap(), Some(&Value::from("1.2.3")));
}

#[test]
fn cli_short_cluster() {
    let mut config = Layerfig::builder();
    config
        .cli_flag(FlagSpec::new("alpha", "-a").unwrap())
        .cli_flag(FlagSpec::new("beta", "-b").unwrap());
    config.cli_parse_from(["-ab"]).unwrap();
    assert_eq!(config.get("alpha").unwrap(), Some(&Value::Bool(true)));
    assert_eq!(config.get("beta").unwrap(), Some(&Value::Bool(true)));
}

#[test]
fn cli_defaults_parsers_and_arguments() {
    let mut config = Layerfig::builder();
    config
        .cli_flag(
            FlagSpec::new("names", "-n, --names [name,...]")
                .unwrap()
                .description("list of names")
                .parser(|raw| {
                    let text = raw.as_str().ok_or("expected a value")?;
                    Ok(Value::from(text.split(',').collect::<Vec<_>>()))
                }),
        )
        .cli_flag(
            FlagSpec::new("filename", "-f, --file [filename]")
                .unwrap()
                .default_value("the_file"),
        )
        .cli_arguments("rest");
    config.cli_parse_str("--names joe,bob,tony -- x y").unwrap();

    assert_eq!(config.get("names").unwrap(), Some(&Value::from(vec!["joe", "bob", "tony"])));
    assert_eq!(config.get("filename").unwrap(), Some(&Value::from("the_file")));
    assert_eq!(config.trace("filename"), Some("CLI (DEFAULT)"));
    assert_eq!(config.get("rest").unwrap(), Some(&Value::from(vec!["x", "y"])));
    assert_eq!(config.trace("rest"), Some("CLI ARGUMENTS"));
}

#[test]
fn help_goes_to_callback() {
    let mut config = Layerfig::builder();
    config.cli_on_help(|_| {});
    let outcome = config.cli_parse_str("--help").unwrap();
    let text = match outcome {
        ParseOutcome::Help(text) => text,
        other => panic!("expected help, got {other:?}"),
    };
    assert_eq!(
        text.split_whitespace().collect::<Vec<_>>().join(" "),
        "Flags: -h, --help Show command help"
    );
}

#[test]
fn stdin_uses_parser_and_wins() {
    let mut config = Layerfig::builder().with_stdin(FixedStdin::new("this is the lowercase data"));
    config.cli_stdin(
        FlagSpec::stdin("path", Some("-d, --data [text]"))
            .unwrap()
            .description("A text string to process")
            .parser(|raw| Ok(Value::from(raw.to_string().to_uppercase()))),
    );
    config.cli_parse_str("-d from_the_command_line").unwrap();
    assert_eq!(
        config.get("path").unwrap(),
        Some(&Value::from("THIS IS THE LOWERCASE DATA"))
    );
    assert!(config.cli_help_message().contains("<stdin>"));
}

#[test]
fn listing_redacts_and_limits_depth() {
    let mut config = Layerfig::builder();
    config.use_runtime_environment("test");
    config
        .object(json!({
            "db": {"password": "hunter2", "user": "me"},
            "deep": {"one": {"two": {"three": 3}}},
        }))
        .unwrap();

    let opts = config
        .list_options()
        .max_depth(2)
        .secure(SecureMatcher::pattern("pass").unwrap());
    let out = lines(&config, &opts);

    assert_eq!(out[0], "CONFIG: [TEST]");
    assert!(out.contains(&"├───├───password : ***** [OBJECT]".to_string()));
    assert!(out.contains(&"├───├───one : ... [OBJECT]".to_string()));
    assert!(!out.iter().any(|l| l.contains("hunter2")));
    assert!(!out.iter().any(|l| l.contains("two")));
}

#[test]
fn reset_isolates_runs() {
    let mut config = Layerfig::builder();
    config.set("a", 1).unwrap();
    config.lock_with(true);
    config.reset();
    config.set("b", 2).unwrap();
    assert_eq!(config.get(".").unwrap(), Some(&v(json!({"b": 2}))));
}
