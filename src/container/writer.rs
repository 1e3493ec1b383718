//! Block-structured container writer

use super::codec::Codec;
use super::format::{Header, MAX_BLOCK_BYTES, SYNC_SIZE, SyncToken};
use crate::domain::LogRecord;
use crate::encoding::RecordEncoder;
use crate::encoding::binary::{MAX_VARINT_LEN, write_long};
use crate::schema::{RecordSchema, SchemaError};
use std::fmt;
use std::io::{self, Write};
use tracing::{debug, error};

/// Errors that can occur during writing
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Container is closed")]
    Closed,

    #[error("Cannot {operation} while writer is {state}")]
    InvalidState {
        operation: &'static str,
        state: WriterState,
    },

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Reopening an existing container is not supported")]
    ReopenUnsupported,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Writer lifecycle.
///
/// `Created -> HeaderWritten -> Appending <-> Synced -> Closed`. `Failed` is
/// entered after an I/O error and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Created,
    HeaderWritten,
    Appending,
    Synced,
    Closed,
    Failed,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriterState::Created => "created",
            WriterState::HeaderWritten => "header-written",
            WriterState::Appending => "appending",
            WriterState::Synced => "synced",
            WriterState::Closed => "closed",
            WriterState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Records handed to `append`
    pub records_appended: u64,
    /// Records inside blocks already written to the sink
    pub records_written: u64,
    pub blocks_written: u64,
    /// Bytes written to the sink, header included
    pub bytes_written: u64,
}

/// Writes records into a container on an exclusively owned sink.
pub struct ContainerWriter<W: Write> {
    sink: W,
    header: Header,
    encoder: RecordEncoder,
    sync_interval: usize,
    buffer: Vec<u8>,
    buffered: usize,
    state: WriterState,
    stats: WriterStats,
}

impl<W: Write> ContainerWriter<W> {
    /// Create a writer. Nothing is written until `write_header`.
    ///
    /// `sync_interval` is the number of records per block and must be positive.
    pub fn new(
        sink: W,
        schema: &RecordSchema,
        codec: Codec,
        sync_interval: usize,
    ) -> Result<Self, WriteError> {
        if sync_interval == 0 {
            return Err(WriteError::InvalidConfig(
                "sync interval must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            sink,
            header: Header::new(schema.clone(), codec),
            encoder: RecordEncoder::new(schema)?,
            sync_interval,
            buffer: Vec::new(),
            buffered: 0,
            state: WriterState::Created,
            stats: WriterStats::default(),
        })
    }

    /// Writer for the built-in HAProxy schema.
    pub fn haproxy(sink: W, codec: Codec, sync_interval: usize) -> Result<Self, WriteError> {
        Self::new(sink, RecordSchema::haproxy(), codec, sync_interval)
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    pub fn sync_token(&self) -> &SyncToken {
        &self.header.sync
    }

    pub fn codec(&self) -> Codec {
        self.header.codec
    }

    pub fn sync_interval(&self) -> usize {
        self.sync_interval
    }

    /// Records appended but not yet written out as a block.
    pub fn buffered_records(&self) -> usize {
        self.buffered
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    fn check_open(&self, operation: &'static str) -> Result<(), WriteError> {
        match self.state {
            WriterState::Closed => Err(WriteError::Closed),
            WriterState::Created | WriterState::Failed => Err(WriteError::InvalidState {
                operation,
                state: self.state,
            }),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, e: io::Error) -> WriteError {
        error!(error = %e, state = %self.state, "Container write failed");
        self.state = WriterState::Failed;
        WriteError::Io(e)
    }

    /// Write magic, metadata and sync token. Allowed once, before any record.
    pub fn write_header(&mut self) -> Result<(), WriteError> {
        match self.state {
            WriterState::Created => {}
            WriterState::Closed => return Err(WriteError::Closed),
            state => {
                return Err(WriteError::InvalidState {
                    operation: "write header",
                    state,
                });
            }
        }

        let mut bytes = Vec::with_capacity(1024);
        self.header.write_to_buffer(&mut bytes);
        self.sink.write_all(&bytes).map_err(|e| self.fail(e))?;

        self.stats.bytes_written += bytes.len() as u64;
        self.state = WriterState::HeaderWritten;
        debug!(
            codec = %self.header.codec,
            sync_interval = self.sync_interval,
            header_bytes = bytes.len(),
            "Container header written"
        );
        Ok(())
    }

    /// Encode `record` into the current block, cutting the block when full.
    pub fn append(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        self.check_open("append")?;

        self.encoder.encode(record, &mut self.buffer);
        self.buffered += 1;
        self.stats.records_appended += 1;
        self.state = WriterState::Appending;

        if self.buffered >= self.sync_interval || self.buffer.len() >= MAX_BLOCK_BYTES {
            self.write_block()?;
        }
        Ok(())
    }

    pub fn append_all<'a, I>(&mut self, records: I) -> Result<(), WriteError>
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        for record in records {
            self.append(record)?;
        }
        Ok(())
    }

    /// Write any partial block and flush the sink.
    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.check_open("flush")?;

        if self.buffered > 0 {
            self.write_block()?;
        }
        self.sink.flush().map_err(|e| self.fail(e))
    }

    /// Flush everything and close. Closing twice is a no-op.
    ///
    /// A writer closed before its header was written still emits the header,
    /// so the sink always holds a readable container. A failed writer closes
    /// without touching the sink; its error was returned by the failing call.
    pub fn close(&mut self) -> Result<(), WriteError> {
        match self.state {
            WriterState::Closed => return Ok(()),
            WriterState::Failed => {
                self.buffer.clear();
                self.buffered = 0;
                self.state = WriterState::Closed;
                debug!("Failed container closed without flushing");
                return Ok(());
            }
            WriterState::Created => self.write_header()?,
            _ => {}
        }

        self.flush()?;
        self.state = WriterState::Closed;
        debug!(
            records = self.stats.records_written,
            blocks = self.stats.blocks_written,
            bytes = self.stats.bytes_written,
            "Container closed"
        );
        Ok(())
    }

    /// Close the container and hand back the sink.
    pub fn into_inner(mut self) -> Result<W, WriteError> {
        self.close()?;
        Ok(self.sink)
    }

    fn write_block(&mut self) -> Result<(), WriteError> {
        let payload = self
            .header
            .codec
            .compress(&self.buffer)
            .map_err(|e| self.fail(e))?;

        let mut frame = Vec::with_capacity(payload.len() + 2 * MAX_VARINT_LEN + SYNC_SIZE);
        write_long(&mut frame, self.buffered as i64);
        write_long(&mut frame, payload.len() as i64);
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&self.header.sync);

        self.sink.write_all(&frame).map_err(|e| self.fail(e))?;
        self.sink.flush().map_err(|e| self.fail(e))?;

        debug!(
            records = self.buffered,
            raw_bytes = self.buffer.len(),
            block_bytes = frame.len(),
            "Block written"
        );

        self.stats.records_written += self.buffered as u64;
        self.stats.blocks_written += 1;
        self.stats.bytes_written += frame.len() as u64;
        self.buffer.clear();
        self.buffered = 0;
        self.state = WriterState::Synced;
        Ok(())
    }
}
