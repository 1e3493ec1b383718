//! Domain layer for rask-haproxy-ingest.
//!
//! Contains the canonical types shared across all modules:
//! - `LogRecord`: one parsed HAProxy log line, the unit the container stores
//! - `Event`: a raw line as delivered by the host pipeline, with its headers

pub mod event;
pub mod record;

pub use event::Event;
pub use record::LogRecord;
