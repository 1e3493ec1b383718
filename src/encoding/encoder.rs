use super::binary::{write_int, write_long, write_str};
use crate::domain::LogRecord;
use crate::schema::{FieldRef, FieldSlot, RecordSchema, SchemaError};

/// Serializes `LogRecord`s in the field order of a schema.
///
/// The field plan is resolved once at construction, so encoding is a plain
/// walk over slots with no name lookups.
#[derive(Debug, Clone)]
pub struct RecordEncoder {
    plan: Vec<FieldSlot>,
}

impl RecordEncoder {
    pub fn new(schema: &RecordSchema) -> Result<Self, SchemaError> {
        Ok(Self {
            plan: schema.slot_plan()?,
        })
    }

    /// Encoder for the built-in HAProxy schema.
    pub fn haproxy() -> Self {
        Self {
            plan: FieldSlot::ALL.to_vec(),
        }
    }

    pub fn field_count(&self) -> usize {
        self.plan.len()
    }

    /// Append the encoding of `record` to `out`. Total for every record.
    pub fn encode(&self, record: &LogRecord, out: &mut Vec<u8>) {
        for slot in &self.plan {
            match record.field(*slot) {
                FieldRef::StringMap(map) => {
                    if !map.is_empty() {
                        write_long(out, map.len() as i64);
                        for (key, value) in map {
                            write_str(out, key);
                            write_str(out, value);
                        }
                    }
                    write_long(out, 0);
                }
                FieldRef::String(text) => write_str(out, text),
                FieldRef::Int(number) => write_int(out, number),
                FieldRef::NullableString(None) => write_long(out, 0),
                FieldRef::NullableString(Some(text)) => {
                    write_long(out, 1);
                    write_str(out, text);
                }
            }
        }
    }

    pub fn encode_to_vec(&self, record: &LogRecord) -> Vec<u8> {
        let mut out = Vec::with_capacity(record.original.len() * 2 + 64);
        self.encode(record, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_record_layout() {
        let bytes = RecordEncoder::haproxy().encode_to_vec(&LogRecord::default());

        // every field of a default record encodes to a single zero byte
        assert_eq!(bytes, vec![0u8; 29]);
    }

    #[test]
    fn test_headers_and_protocol_layout() {
        let mut headers = BTreeMap::new();
        headers.insert("b".to_string(), "2".to_string());
        headers.insert("a".to_string(), "1".to_string());
        let record = LogRecord {
            headers,
            protocol: Some("HTTP/1.1".to_string()),
            ..LogRecord::default()
        };

        let bytes = RecordEncoder::haproxy().encode_to_vec(&record);

        assert_eq!(&bytes[..10], &[0x04, 0x02, b'a', 0x02, b'1', 0x02, b'b', 0x02, b'2', 0x00]);
        let tail = &bytes[bytes.len() - 10..];
        assert_eq!(tail[0], 0x02);
        assert_eq!(tail[1], 0x10);
        assert_eq!(&tail[2..], b"HTTP/1.1");
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let record = LogRecord {
            original: "line".to_string(),
            status_code: 503,
            time_total: -1,
            ..LogRecord::default()
        };
        let encoder = RecordEncoder::haproxy();

        assert_eq!(encoder.encode_to_vec(&record), encoder.encode_to_vec(&record.clone()));
    }

    #[test]
    fn test_new_from_haproxy_schema() {
        let encoder = RecordEncoder::new(RecordSchema::haproxy()).unwrap();
        assert_eq!(encoder.field_count(), 29);
    }
}
