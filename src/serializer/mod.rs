//! Event serializer facade.
//!
//! Mirrors the lifecycle a host ingestion pipeline drives per output file:
//! `after_create` once the file is opened, `write_event` per line, `flush`
//! whenever the host commits, `before_close` before the file is closed.

pub mod config;
pub mod shared;

pub use config::SerializerConfig;
pub use shared::SharedSerializer;

use crate::container::{Codec, ContainerWriter, WriteError, WriterState};
use crate::domain::{Event, LogRecord};
use crate::parser::{HaproxyParser, ParsedLine};
use std::io::Write;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializerStats {
    pub events: u64,
    pub grammar_mismatches: u64,
    pub blocks: u64,
}

/// Creates serializers from a validated configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializerBuilder {
    config: SerializerConfig,
}

impl SerializerBuilder {
    pub fn new(config: SerializerConfig) -> Self {
        Self { config }
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.config.codec = codec;
        self
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    pub fn build<W: Write>(&self, sink: W) -> Result<HaproxyEventSerializer<W>, WriteError> {
        self.config.validate()?;
        let writer = ContainerWriter::haproxy(sink, self.config.codec, self.config.sync_interval)?;

        Ok(HaproxyEventSerializer {
            parser: HaproxyParser::new(),
            writer,
            stats: SerializerStats::default(),
        })
    }
}

/// Converts raw HAProxy lines into records and appends them to a container.
pub struct HaproxyEventSerializer<W: Write> {
    parser: HaproxyParser,
    writer: ContainerWriter<W>,
    stats: SerializerStats,
}

impl<W: Write> HaproxyEventSerializer<W> {
    /// Called once the output is newly created: writes the container header.
    pub fn after_create(&mut self) -> Result<(), WriteError> {
        self.writer.write_header()?;
        info!(
            codec = %self.writer.codec(),
            sync_interval = self.writer.sync_interval(),
            "HAProxy container created"
        );
        Ok(())
    }

    /// Appending to an existing container is not supported.
    pub fn after_reopen(&mut self) -> Result<(), WriteError> {
        Err(WriteError::ReopenUnsupported)
    }

    pub fn supports_reopen(&self) -> bool {
        false
    }

    /// Parse one host event without writing it.
    pub fn convert(&self, event: &Event) -> ParsedLine {
        self.parser.parse_event(event)
    }

    pub fn write_event(&mut self, event: &Event) -> Result<(), WriteError> {
        let parsed = self.convert(event);
        self.write_parsed(parsed)
    }

    pub fn write_line(&mut self, line: &str) -> Result<(), WriteError> {
        let parsed = self.parser.parse(line);
        self.write_parsed(parsed)
    }

    /// Append an already structured record.
    pub fn write_record(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        self.writer.append(record)?;
        self.stats.events += 1;
        self.stats.blocks = self.writer.stats().blocks_written;
        Ok(())
    }

    fn write_parsed(&mut self, parsed: ParsedLine) -> Result<(), WriteError> {
        self.write_record(&parsed.record)?;
        if !parsed.outcome.is_match() {
            self.stats.grammar_mismatches += 1;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.writer.flush()?;
        self.stats.blocks = self.writer.stats().blocks_written;
        Ok(())
    }

    /// Called before the host closes the output: writes the pending block.
    /// The serializer stays usable until `close`.
    pub fn before_close(&mut self) -> Result<(), WriteError> {
        debug!(
            pending = self.writer.buffered_records(),
            "Flushing before close"
        );
        self.flush()
    }

    pub fn close(&mut self) -> Result<(), WriteError> {
        if self.writer.state() == WriterState::Closed {
            return Ok(());
        }
        self.writer.close()?;
        self.stats.blocks = self.writer.stats().blocks_written;
        info!(
            events = self.stats.events,
            grammar_mismatches = self.stats.grammar_mismatches,
            blocks = self.stats.blocks,
            "HAProxy container closed"
        );
        Ok(())
    }

    /// Close the container and return the sink.
    pub fn into_inner(mut self) -> Result<W, WriteError> {
        self.close()?;
        self.writer.into_inner()
    }

    pub fn stats(&self) -> SerializerStats {
        self.stats
    }

    pub fn state(&self) -> WriterState {
        self.writer.state()
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }
}
