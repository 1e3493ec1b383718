use super::{ConfigError, LogFormat, LogLevel};
use crate::container::{Codec, DEFAULT_SYNC_INTERVAL};
use crate::serializer::SerializerConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Path value meaning stdin or stdout.
pub const STDIO_PATH: &str = "-";

#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// HAProxy log file to read (stdin when absent or "-")
    #[arg(long, short, env = "INPUT")]
    pub input: Option<PathBuf>,

    /// Container file to write ("-" for stdout)
    #[arg(long, short, env = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Records per container block
    #[arg(long, env = "SYNC_INTERVAL", default_value_t = DEFAULT_SYNC_INTERVAL)]
    #[serde(alias = "syncInterval", alias = "sync-interval")]
    pub sync_interval: usize,

    /// Block compression codec
    #[arg(long, env = "CODEC", value_enum, default_value_t = Codec::Deflate)]
    pub codec: Codec,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Add a `host` header with the local hostname to every record
    #[arg(long, env = "ADD_HOST_HEADER")]
    pub add_host_header: bool,

    /// Read the container given as input and print its records as JSON lines
    #[arg(long)]
    pub dump: bool,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            codec: Codec::default(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            add_host_header: false,
            dump: false,
            config_file: None,
        }
    }
}

impl Config {
    /// Parse command-line arguments. When `--config-file` is given, the file
    /// replaces the argument values.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::parse_from(args);
        if let Some(path) = &config.config_file {
            let mut from_file = Self::from_file(path)?;
            from_file.config_file = Some(path.clone());
            return Ok(from_file);
        }

        let mut config = config;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        // "-" and empty paths mean stdin
        if self
            .input
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty() || path.as_os_str() == STDIO_PATH)
        {
            self.input = None;
        }

        if self
            .output
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            self.output = None;
        }

        Ok(())
    }

    pub fn writes_to_stdout(&self) -> bool {
        self.output
            .as_ref()
            .is_some_and(|path| path.as_os_str() == STDIO_PATH)
    }

    pub fn serializer_config(&self) -> SerializerConfig {
        SerializerConfig::new(self.sync_interval).with_codec(self.codec)
    }
}
