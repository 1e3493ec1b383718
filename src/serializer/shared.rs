use super::{HaproxyEventSerializer, SerializerStats};
use crate::container::WriteError;
use crate::domain::{Event, LogRecord};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Cloneable handle for hosts that deliver lines from several threads.
///
/// Every call takes the lock for its whole duration, so records from one
/// call are never interleaved with another's.
pub struct SharedSerializer<W: Write> {
    inner: Arc<Mutex<HaproxyEventSerializer<W>>>,
}

impl<W: Write> Clone for SharedSerializer<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> SharedSerializer<W> {
    pub fn new(serializer: HaproxyEventSerializer<W>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(serializer)),
        }
    }

    pub fn after_create(&self) -> Result<(), WriteError> {
        self.inner.lock().after_create()
    }

    pub fn write_event(&self, event: &Event) -> Result<(), WriteError> {
        self.inner.lock().write_event(event)
    }

    pub fn write_line(&self, line: &str) -> Result<(), WriteError> {
        self.inner.lock().write_line(line)
    }

    pub fn write_record(&self, record: &LogRecord) -> Result<(), WriteError> {
        self.inner.lock().write_record(record)
    }

    /// Write several lines while holding the lock once.
    pub fn write_lines<'a, I>(&self, lines: I) -> Result<(), WriteError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut serializer = self.inner.lock();
        for line in lines {
            serializer.write_line(line)?;
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<(), WriteError> {
        self.inner.lock().flush()
    }

    pub fn before_close(&self) -> Result<(), WriteError> {
        self.inner.lock().before_close()
    }

    pub fn close(&self) -> Result<(), WriteError> {
        self.inner.lock().close()
    }

    pub fn stats(&self) -> SerializerStats {
        self.inner.lock().stats()
    }

    /// Unwrap the serializer once every other handle is gone.
    pub fn try_into_inner(self) -> Result<HaproxyEventSerializer<W>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::{SerializerBuilder, SerializerConfig};

    #[test]
    fn test_try_into_inner_requires_last_handle() {
        let serializer = SerializerBuilder::new(SerializerConfig::new(4))
            .build(Vec::new())
            .unwrap();
        let shared = SharedSerializer::new(serializer);
        let other = shared.clone();

        let shared = match shared.try_into_inner() {
            Ok(_) => panic!("unwrapped while another handle exists"),
            Err(shared) => shared,
        };
        drop(other);

        assert!(shared.try_into_inner().is_ok());
    }

    #[test]
    fn test_write_lines_counts_every_line() {
        let serializer = SerializerBuilder::new(SerializerConfig::new(2))
            .build(Vec::new())
            .unwrap();
        let shared = SharedSerializer::new(serializer);
        shared.after_create().unwrap();

        shared.write_lines(["a", "b", "c"]).unwrap();

        let stats = shared.stats();
        assert_eq!(stats.events, 3);
        assert_eq!(stats.grammar_mismatches, 3);
        assert_eq!(stats.blocks, 1);
    }
}
