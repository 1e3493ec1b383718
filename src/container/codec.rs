use clap::ValueEnum;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Block compression codec, recorded in the container header as `avro.codec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Blocks stored as-is
    Null,
    /// Raw RFC 1951 deflate (no zlib header)
    #[default]
    Deflate,
}

impl Codec {
    pub fn name(self) -> &'static str {
        match self {
            Codec::Null => "null",
            Codec::Deflate => "deflate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Codec::Null),
            "deflate" => Some(Codec::Deflate),
            _ => None,
        }
    }

    pub fn compress(self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Codec::Null => Ok(data.to_vec()),
            Codec::Deflate => {
                let mut encoder =
                    DeflateEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
        }
    }

    /// Inflate `data`, refusing output larger than `limit` bytes.
    pub fn decompress(self, data: &[u8], limit: usize) -> io::Result<Vec<u8>> {
        match self {
            Codec::Null => Ok(data.to_vec()),
            Codec::Deflate => {
                let mut out = Vec::with_capacity(data.len().saturating_mul(4).min(limit));
                DeflateDecoder::new(data)
                    .take(limit as u64 + 1)
                    .read_to_end(&mut out)?;
                if out.len() > limit {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("decompressed block exceeds {limit} bytes"),
                    ));
                }
                Ok(out)
            }
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
