//! Container layout.
//!
//! ```text
//! header:  "Obj\x01" | metadata map (avro.schema, avro.codec) | sync[16]
//! block:   record count | payload length | payload | sync[16]
//! ```
//!
//! Counts and lengths are zig-zag varints. The metadata map is a counted
//! block of (string key, bytes value) pairs terminated by a zero count.

use super::codec::Codec;
use super::reader::ReadError;
use crate::encoding::binary::{read_long_from, write_bytes, write_long, write_str};
use crate::schema::RecordSchema;
use std::collections::BTreeMap;
use std::io::{self, Read};

/// Container magic bytes: "Obj" followed by format version 1
pub const MAGIC: [u8; 4] = [b'O', b'b', b'j', 1];

/// Sync token size in bytes
pub const SYNC_SIZE: usize = 16;

pub const SCHEMA_KEY: &str = "avro.schema";
pub const CODEC_KEY: &str = "avro.codec";

/// Records per block unless configured otherwise
pub const DEFAULT_SYNC_INTERVAL: usize = 4096;

/// A block is cut once its encoded records reach this size, whatever the record count
pub const MAX_BLOCK_BYTES: usize = 16 * 1024 * 1024;

/// Largest block payload or metadata value a reader accepts (compressed or not)
pub const MAX_READ_BLOCK_BYTES: usize = 4 * MAX_BLOCK_BYTES;

pub type SyncToken = [u8; SYNC_SIZE];

/// Fresh random sync token for a new container.
pub fn new_sync_token() -> SyncToken {
    rand::random()
}

/// Container header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub schema: RecordSchema,
    pub codec: Codec,
    pub sync: SyncToken,
}

impl Header {
    pub fn new(schema: RecordSchema, codec: Codec) -> Self {
        Self {
            schema,
            codec,
            sync: new_sync_token(),
        }
    }

    /// Serialize the header into `out`
    pub fn write_to_buffer(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);

        let schema_json = self.schema.to_json();
        write_long(out, 2);
        write_str(out, SCHEMA_KEY);
        write_bytes(out, schema_json.as_bytes());
        write_str(out, CODEC_KEY);
        write_bytes(out, self.codec.name().as_bytes());
        write_long(out, 0);

        out.extend_from_slice(&self.sync);
    }

    /// Parse a header from the start of a container
    pub fn read_from<R: Read>(reader: &mut Counted<R>) -> Result<Self, ReadError> {
        let mut magic = [0u8; 4];
        read_exact(reader, &mut magic, "magic")?;
        if magic != MAGIC {
            return Err(ReadError::BadMagic(magic));
        }

        let metadata = read_metadata(reader)?;

        let schema_bytes = metadata
            .get(SCHEMA_KEY)
            .ok_or_else(|| ReadError::InvalidHeader(format!("missing {SCHEMA_KEY}")))?;
        let schema_json = std::str::from_utf8(schema_bytes)
            .map_err(|_| ReadError::InvalidHeader(format!("{SCHEMA_KEY} is not UTF-8")))?;
        let schema = RecordSchema::from_json(schema_json)?;

        let codec = match metadata.get(CODEC_KEY) {
            None => Codec::Null,
            Some(name) => {
                let name = String::from_utf8_lossy(name);
                Codec::from_name(&name)
                    .ok_or_else(|| ReadError::UnsupportedCodec(name.into_owned()))?
            }
        };

        let mut sync = [0u8; SYNC_SIZE];
        read_exact(reader, &mut sync, "sync token")?;

        Ok(Self {
            schema,
            codec,
            sync,
        })
    }
}

fn read_metadata<R: Read>(reader: &mut Counted<R>) -> Result<BTreeMap<String, Vec<u8>>, ReadError> {
    let mut metadata = BTreeMap::new();

    loop {
        let mut count = read_varint(reader, "metadata count")?;
        if count == 0 {
            return Ok(metadata);
        }
        if count < 0 {
            count = count
                .checked_neg()
                .ok_or_else(|| ReadError::InvalidHeader("metadata count overflow".to_string()))?;
            read_varint(reader, "metadata block size")?;
        }

        for _ in 0..count {
            let key = read_length_prefixed(reader, "metadata key")?;
            let key = String::from_utf8(key)
                .map_err(|_| ReadError::InvalidHeader("metadata key is not UTF-8".to_string()))?;
            let value = read_length_prefixed(reader, "metadata value")?;
            metadata.insert(key, value);
        }
    }
}

fn read_length_prefixed<R: Read>(
    reader: &mut Counted<R>,
    what: &str,
) -> Result<Vec<u8>, ReadError> {
    let offset = reader.count();
    let length = read_varint(reader, what)?;
    if length < 0 || length as u64 > MAX_READ_BLOCK_BYTES as u64 {
        return Err(ReadError::InvalidHeader(format!(
            "{what} has invalid length {length} at offset {offset}"
        )));
    }
    let mut buf = vec![0u8; length as usize];
    read_exact(reader, &mut buf, what)?;
    Ok(buf)
}

/// Read a varint that must be present.
pub(crate) fn read_varint<R: Read>(reader: &mut Counted<R>, what: &str) -> Result<i64, ReadError> {
    let offset = reader.count();
    match read_long_from(reader) {
        Ok(Some((value, _))) => Ok(value),
        Ok(None) => Err(ReadError::Truncated {
            offset,
            detail: format!("missing {what}"),
        }),
        Err(e) => Err(ReadError::from_io(e, offset, what)),
    }
}

pub(crate) fn read_exact<R: Read>(
    reader: &mut Counted<R>,
    buf: &mut [u8],
    what: &str,
) -> Result<(), ReadError> {
    let offset = reader.count();
    reader
        .read_exact(buf)
        .map_err(|e| ReadError::from_io(e, offset, what))
}

/// Reader adapter that tracks how many bytes have been consumed.
#[derive(Debug)]
pub struct Counted<R> {
    inner: R,
    count: u64,
}

impl<R> Counted<R> {
    pub fn new(inner: R) -> Self {
        Self::starting_at(inner, 0)
    }

    pub fn starting_at(inner: R, count: u64) -> Self {
        Self { inner, count }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Counted<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
