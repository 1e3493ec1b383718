use rask_haproxy_ingest::app::{ConfigError, LogFormat, LogLevel};
use rask_haproxy_ingest::{Codec, Config, SerializerConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const BIN: &str = "rask-haproxy-ingest";

#[test]
fn test_defaults_from_minimal_args() {
    let config = Config::from_args([BIN, "--output", "-"]).unwrap();

    assert_eq!(config.input, None);
    assert!(config.writes_to_stdout());
    assert_eq!(config.sync_interval, 4096);
    assert_eq!(config.codec, Codec::Deflate);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.log_format, LogFormat::Compact);
    assert!(!config.add_host_header);
    assert!(!config.dump);
}

#[test]
fn test_full_args() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("access.log");
    fs::write(&input, "line\n").unwrap();
    let output = dir.path().join("out.avro");

    let config = Config::from_args([
        BIN,
        "--input",
        input.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "--sync-interval",
        "100",
        "--codec",
        "null",
        "--log-level",
        "debug",
        "--log-format",
        "json",
        "--add-host-header",
    ])
    .unwrap();

    assert_eq!(config.input, Some(input));
    assert_eq!(config.output, Some(output));
    assert!(!config.writes_to_stdout());
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_format, LogFormat::Json);
    assert!(config.add_host_header);
    assert_eq!(
        config.serializer_config(),
        SerializerConfig::new(100).with_codec(Codec::Null)
    );
}

#[test]
fn test_dash_input_means_stdin() {
    let config = Config::from_args([BIN, "--input", "-", "--output", "-"]).unwrap();
    assert_eq!(config.input, None);
}

#[test]
fn test_dump_mode_needs_no_output() {
    let config = Config::from_args([BIN, "--dump"]).unwrap();
    assert!(config.dump);
    assert_eq!(config.output, None);
}

#[test]
fn test_validation_errors() {
    let missing_output = Config::from_args([BIN]);
    assert!(matches!(missing_output, Err(ConfigError::InvalidConfig(_))));

    let zero_interval = Config::from_args([BIN, "--output", "-", "--sync-interval", "0"]);
    assert!(matches!(zero_interval, Err(ConfigError::InvalidConfig(_))));

    let missing_input = Config::from_args([
        BIN,
        "--input",
        "/nonexistent/haproxy/access.log",
        "--output",
        "-",
    ]);
    assert!(matches!(missing_input, Err(ConfigError::InvalidConfig(_))));

    let missing_parent = Config::from_args([BIN, "--output", "/nonexistent/dir/out.avro"]);
    assert!(matches!(missing_parent, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_from_file() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.avro");
    let path = dir.path().join("ingest.toml");
    fs::write(
        &path,
        format!(
            r#"
output = "{}"
syncInterval = 16
codec = "null"
log_level = "warn"
"#,
            output.display()
        ),
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.output, Some(output));
    assert_eq!(config.sync_interval, 16);
    assert_eq!(config.codec, Codec::Null);
    assert_eq!(config.log_level, LogLevel::Warn);
    assert_eq!(config.log_format, LogFormat::Compact);
}

#[test]
fn test_config_file_replaces_args() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ingest.toml");
    fs::write(&path, "output = \"-\"\nsync_interval = 7\n").unwrap();

    let config = Config::from_args([
        BIN,
        "--config-file",
        path.to_str().unwrap(),
        "--sync-interval",
        "99",
    ])
    .unwrap();

    assert_eq!(config.sync_interval, 7);
    assert!(config.writes_to_stdout());
    assert_eq!(config.config_file, Some(path));
}

#[test]
fn test_bad_config_files() {
    let dir = TempDir::new().unwrap();

    let unreadable = Config::from_file(dir.path().join("absent.toml"));
    assert!(matches!(unreadable, Err(ConfigError::FileError(_))));

    let path = dir.path().join("broken.toml");
    fs::write(&path, "sync_interval = \"lots\"\n").unwrap();
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::ParseError(_))
    ));

    let path = dir.path().join("zero.toml");
    fs::write(&path, "output = \"-\"\nsync_interval = 0\n").unwrap();
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_config_serializes_back_to_toml() {
    let config = Config {
        output: Some(PathBuf::from("-")),
        sync_interval: 12,
        ..Config::default()
    };

    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}
