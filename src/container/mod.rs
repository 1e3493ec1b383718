//! Self-describing binary container.
//!
//! A container is a header carrying the embedded schema, the codec name and
//! a random 16-byte sync token, followed by counted blocks of encoded records,
//! each terminated by the sync token.

pub mod codec;
pub mod format;
pub mod reader;
pub mod split;
pub mod writer;

pub use codec::Codec;
pub use format::{DEFAULT_SYNC_INTERVAL, Header, MAGIC, SYNC_SIZE, SyncToken};
pub use reader::{ContainerReader, ReadError};
pub use split::SplitReader;
pub use writer::{ContainerWriter, WriteError, WriterState, WriterStats};
