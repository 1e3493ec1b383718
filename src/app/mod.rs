pub mod config;
pub mod logging_system;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging_system::{InitializationError, setup_logging};

use crate::container::ContainerReader;
use crate::domain::Event;
use crate::serializer::{SerializerBuilder, SerializerStats};
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::process;
use tracing::{info, warn};

/// Header carrying the local hostname when `--add-host-header` is set.
pub const HOST_HEADER: &str = "host";

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn from_args<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::new(Config::from_args(args)?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self) -> anyhow::Result<()> {
        info!("Starting rask-haproxy-ingest v{}", crate::VERSION);

        let input = self.open_input()?;
        if self.config.dump {
            let stdout = io::stdout();
            let count = dump(input, stdout.lock()).context("Failed to dump container")?;
            info!(records = count, "Dump finished");
            return Ok(());
        }

        let headers = self.extra_headers();
        let builder = SerializerBuilder::new(self.config.serializer_config());

        let stats = match &self.config.output {
            Some(path) if !self.config.writes_to_stdout() => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let (file, stats) =
                    ingest(BufReader::new(input), BufWriter::new(file), &builder, &headers)?;
                file.into_inner()
                    .map_err(|e| e.into_error())
                    .and_then(|file| file.sync_all())
                    .with_context(|| format!("Failed to persist {}", path.display()))?;
                stats
            }
            _ => {
                let stdout = io::stdout();
                let (_, stats) = ingest(BufReader::new(input), stdout.lock(), &builder, &headers)?;
                stats
            }
        };

        info!(
            events = stats.events,
            grammar_mismatches = stats.grammar_mismatches,
            blocks = stats.blocks,
            "Ingestion finished"
        );
        Ok(())
    }

    fn open_input(&self) -> anyhow::Result<Box<dyn Read>> {
        match &self.config.input {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                Ok(Box::new(file))
            }
            None => Ok(Box::new(io::stdin())),
        }
    }

    fn extra_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if self.config.add_host_header {
            match hostname::get() {
                Ok(name) => {
                    headers.insert(HOST_HEADER.to_string(), name.to_string_lossy().into_owned());
                }
                Err(e) => warn!(error = %e, "Could not determine hostname, skipping host header"),
            }
        }
        headers
    }
}

/// Serialize every line of `input` into a new container on `sink`.
///
/// Lines are split on `\n`; a trailing `\r` is dropped and blank lines are
/// skipped. `headers` are attached to every event.
pub fn ingest<R: BufRead, W: Write>(
    mut input: R,
    sink: W,
    builder: &SerializerBuilder,
    headers: &BTreeMap<String, String>,
) -> anyhow::Result<(W, SerializerStats)> {
    let mut serializer = builder.build(sink).context("Failed to create serializer")?;
    serializer.after_create().context("Failed to write container header")?;

    let mut line = Vec::with_capacity(1024);
    let mut line_number = 0u64;
    loop {
        line.clear();
        if input
            .read_until(b'\n', &mut line)
            .context("Failed to read input")?
            == 0
        {
            break;
        }
        line_number += 1;

        let mut end = line.len();
        while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        if end == 0 {
            continue;
        }

        let event = Event {
            headers: headers.clone(),
            body: Bytes::copy_from_slice(&line[..end]),
        };
        serializer
            .write_event(&event)
            .with_context(|| format!("Failed to write line {line_number}"))?;
    }

    serializer.before_close().context("Failed to flush container")?;
    let stats = serializer.stats();
    let sink = serializer.into_inner().context("Failed to close container")?;
    Ok((sink, stats))
}

/// Print every record of the container read from `input` as one JSON line.
pub fn dump<R: Read, W: Write>(input: R, mut out: W) -> anyhow::Result<u64> {
    let reader = ContainerReader::new(input).context("Failed to read container header")?;

    let mut count = 0u64;
    for record in reader {
        let record = record.with_context(|| format!("Failed to read record {}", count + 1))?;
        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush()?;

    Ok(count)
}

// Main entry point for the application
pub fn main() -> anyhow::Result<()> {
    let config = match Config::from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(2);
        }
    };

    if let Err(e) = setup_logging(config.log_level, config.log_format) {
        eprintln!("Warning: {e}, continuing without structured logging");
    }

    App::new(config).run()
}
