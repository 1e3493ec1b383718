// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Varint and length casts stay within container limits
    clippy::cast_possible_wrap,       // Lengths never approach i64::MAX
    clippy::cast_sign_loss,           // Checked non-negative before casting
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. ContainerReader in container module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod container;
pub mod domain;
pub mod encoding;
pub mod parser;
pub mod schema;
pub mod serializer;

// Re-export main types for easy access
pub use app::{App, Config};
pub use container::{Codec, ContainerReader, ContainerWriter, ReadError, SplitReader, WriteError};
pub use domain::{Event, LogRecord};
pub use parser::{HaproxyParser, ParseOutcome, ParsedLine};
pub use schema::RecordSchema;
pub use serializer::{
    HaproxyEventSerializer, SerializerBuilder, SerializerConfig, SerializerStats, SharedSerializer,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
