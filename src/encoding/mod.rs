//! Binary record encoding.
//!
//! Ints and lengths are zig-zag varints, strings are length-prefixed UTF-8,
//! the nullable field is a two-branch union and maps are counted blocks
//! terminated by a zero count.

pub mod binary;
pub mod decoder;
pub mod encoder;

pub use binary::{ByteReader, DecodeError};
pub use decoder::RecordDecoder;
pub use encoder::RecordEncoder;
