use bytes::Bytes;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A single line handed over by the host pipeline.
///
/// The body is the raw line; the headers are opaque host metadata that are
/// copied into the record unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Event {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn from_line(line: &str) -> Self {
        Self::new(Bytes::copy_from_slice(line.as_bytes()))
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Body decoded as UTF-8. The host guarantees valid text; anything else
    /// is replaced rather than rejected so a bad line cannot stall ingestion.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
