//! Container reader for verification and read-back

use super::format::{
    Counted, Header, MAX_READ_BLOCK_BYTES, SYNC_SIZE, SyncToken, read_exact, read_varint,
};
use crate::domain::LogRecord;
use crate::encoding::binary::read_long_from;
use crate::encoding::{ByteReader, DecodeError, RecordDecoder};
use crate::schema::{RecordSchema, SchemaError};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;
use tracing::debug;

/// Errors that can occur during reading
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Not a container: bad magic {0:?}")]
    BadMagic([u8; 4]),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid embedded schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("Sync marker mismatch after block ending at offset {offset}")]
    SyncMismatch { offset: u64 },

    #[error("Truncated container at offset {offset}: {detail}")]
    Truncated { offset: u64, detail: String },

    #[error("Corrupt block at offset {offset}: {detail}")]
    Corrupt { offset: u64, detail: String },

    #[error("Failed to decode record in block at offset {offset}: {source}")]
    Decode {
        offset: u64,
        #[source]
        source: DecodeError,
    },

    #[error("Failed to decompress block at offset {offset}: {source}")]
    Decompression {
        offset: u64,
        #[source]
        source: io::Error,
    },
}

impl ReadError {
    /// True when the bytes themselves are damaged, as opposed to an I/O or
    /// capability failure.
    pub fn is_corruption(&self) -> bool {
        !matches!(self, ReadError::Io(_) | ReadError::UnsupportedCodec(_))
    }

    pub(crate) fn from_io(error: io::Error, offset: u64, what: &str) -> Self {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => ReadError::Truncated {
                offset,
                detail: format!("{what}: {error}"),
            },
            io::ErrorKind::InvalidData => ReadError::Corrupt {
                offset,
                detail: format!("{what}: {error}"),
            },
            _ => ReadError::Io(error),
        }
    }
}

struct Block {
    offset: u64,
    payload: Vec<u8>,
    cursor: usize,
    remaining: u64,
}

/// Lazy record iterator over a container.
///
/// Blocks are read one at a time; records inside a block are decoded on
/// demand. The iterator ends at a clean block boundary and is fused after
/// the first error.
pub struct ContainerReader<R> {
    source: Counted<BufReader<R>>,
    header: Header,
    decoder: RecordDecoder,
    limit: Option<u64>,
    block: Option<Block>,
    blocks_read: u64,
    done: bool,
}

impl<R: Read> ContainerReader<R> {
    pub fn new(source: R) -> Result<Self, ReadError> {
        let mut source = Counted::new(BufReader::new(source));
        let header = Header::read_from(&mut source)?;
        let decoder = RecordDecoder::new(&header.schema)?;

        debug!(
            codec = %header.codec,
            fields = decoder.field_count(),
            header_len = source.count(),
            "Opened container"
        );

        Ok(Self::with_header(source, header, decoder, None))
    }

    /// Reader positioned at a block boundary of a container whose header is
    /// already known. Blocks starting at or beyond `limit` are not read.
    pub(crate) fn resume(
        source: R,
        header: Header,
        start: u64,
        limit: Option<u64>,
    ) -> Result<Self, ReadError> {
        let decoder = RecordDecoder::new(&header.schema)?;
        let source = Counted::starting_at(BufReader::new(source), start);
        Ok(Self::with_header(source, header, decoder, limit))
    }

    fn with_header(
        source: Counted<BufReader<R>>,
        header: Header,
        decoder: RecordDecoder,
        limit: Option<u64>,
    ) -> Self {
        Self {
            source,
            header,
            decoder,
            limit,
            block: None,
            blocks_read: 0,
            done: false,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.header.schema
    }

    pub fn sync_token(&self) -> &SyncToken {
        &self.header.sync
    }

    /// Byte offset of the next unread byte in the container.
    pub fn position(&self) -> u64 {
        self.source.count()
    }

    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    fn read_block(&mut self) -> Result<Option<Block>, ReadError> {
        let offset = self.source.count();
        if self.limit.is_some_and(|limit| offset >= limit) {
            return Ok(None);
        }

        let count = match read_long_from(&mut self.source) {
            Ok(None) => return Ok(None),
            Ok(Some((count, _))) => count,
            Err(e) => return Err(ReadError::from_io(e, offset, "block count")),
        };
        if count < 0 {
            return Err(ReadError::Corrupt {
                offset,
                detail: format!("negative record count {count}"),
            });
        }

        let size = read_varint(&mut self.source, "block size")?;
        if size < 0 || size as u64 > MAX_READ_BLOCK_BYTES as u64 {
            return Err(ReadError::Corrupt {
                offset,
                detail: format!("invalid block size {size}"),
            });
        }

        let mut compressed = vec![0u8; size as usize];
        read_exact(&mut self.source, &mut compressed, "block payload")?;

        let mut sync = [0u8; SYNC_SIZE];
        read_exact(&mut self.source, &mut sync, "sync marker")?;
        if sync != self.header.sync {
            return Err(ReadError::SyncMismatch {
                offset: self.source.count(),
            });
        }

        let payload = self
            .header
            .codec
            .decompress(&compressed, MAX_READ_BLOCK_BYTES)
            .map_err(|source| ReadError::Decompression { offset, source })?;

        if self.decoder.field_count() > 0 && count as u64 > payload.len() as u64 {
            return Err(ReadError::Corrupt {
                offset,
                detail: format!("{count} records cannot fit in {} bytes", payload.len()),
            });
        }

        self.blocks_read += 1;
        debug!(offset, records = count, bytes = payload.len(), "Read block");

        Ok(Some(Block {
            offset,
            payload,
            cursor: 0,
            remaining: count as u64,
        }))
    }

    fn next_record(&mut self) -> Result<Option<LogRecord>, ReadError> {
        loop {
            if let Some(block) = &mut self.block {
                if block.remaining > 0 {
                    let mut reader = ByteReader::at(&block.payload, block.cursor);
                    let record = self
                        .decoder
                        .decode(&mut reader)
                        .map_err(|source| ReadError::Decode {
                            offset: block.offset,
                            source,
                        })?;
                    block.cursor = reader.position();
                    block.remaining -= 1;
                    return Ok(Some(record));
                }

                if block.cursor != block.payload.len() {
                    return Err(ReadError::Decode {
                        offset: block.offset,
                        source: DecodeError::TrailingBytes {
                            remaining: block.payload.len() - block.cursor,
                        },
                    });
                }
            }

            match self.read_block()? {
                Some(block) => self.block = Some(block),
                None => return Ok(None),
            }
        }
    }
}

impl ContainerReader<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        Self::new(File::open(path)?)
    }
}

impl<'a> ContainerReader<&'a [u8]> {
    pub fn from_slice(data: &'a [u8]) -> Result<Self, ReadError> {
        Self::new(data)
    }
}

impl<R: Read> Iterator for ContainerReader<R> {
    type Item = Result<LogRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> FusedIterator for ContainerReader<R> {}
