use super::binary::{ByteReader, DecodeError};
use crate::domain::LogRecord;
use crate::schema::{FieldSlot, FieldType, FieldValue, RecordSchema, SchemaError, check_type};
use std::collections::BTreeMap;

/// Decodes records written against an embedded schema.
///
/// Fields the record has no slot for are read and dropped; fields the
/// schema lacks keep their defaults.
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    plan: Vec<(FieldType, Option<FieldSlot>)>,
}

impl RecordDecoder {
    pub fn new(schema: &RecordSchema) -> Result<Self, SchemaError> {
        let plan = schema
            .fields()
            .iter()
            .map(|field| match FieldSlot::from_name(&field.name) {
                Some(slot) => {
                    check_type(slot, field.field_type).map(|()| (field.field_type, Some(slot)))
                }
                None => Ok((field.field_type, None)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { plan })
    }

    pub fn haproxy() -> Self {
        Self {
            plan: FieldSlot::ALL
                .iter()
                .map(|slot| (slot.field_type(), Some(*slot)))
                .collect(),
        }
    }

    pub fn field_count(&self) -> usize {
        self.plan.len()
    }

    pub fn decode(&self, reader: &mut ByteReader<'_>) -> Result<LogRecord, DecodeError> {
        let mut record = LogRecord::default();

        for (field_type, slot) in &self.plan {
            let value = read_value(reader, *field_type)?;
            if let Some(slot) = slot {
                record
                    .set_field(*slot, value)
                    .map_err(|_| DecodeError::FieldMismatch { field: slot.name() })?;
            }
        }

        Ok(record)
    }

    /// Decode exactly one record from `bytes`, rejecting leftovers.
    pub fn decode_slice(&self, bytes: &[u8]) -> Result<LogRecord, DecodeError> {
        let mut reader = ByteReader::new(bytes);
        let record = self.decode(&mut reader)?;
        if !reader.is_empty() {
            return Err(DecodeError::TrailingBytes {
                remaining: reader.remaining(),
            });
        }
        Ok(record)
    }
}

fn read_value(
    reader: &mut ByteReader<'_>,
    field_type: FieldType,
) -> Result<FieldValue, DecodeError> {
    match field_type {
        FieldType::String => Ok(FieldValue::String(reader.read_str()?.to_string())),
        FieldType::Int => Ok(FieldValue::Int(reader.read_int()?)),
        FieldType::NullableString => match reader.read_long()? {
            0 => Ok(FieldValue::NullableString(None)),
            1 => Ok(FieldValue::NullableString(Some(reader.read_str()?.to_string()))),
            index => Err(DecodeError::InvalidUnionIndex { index }),
        },
        FieldType::StringMap => read_string_map(reader).map(FieldValue::StringMap),
    }
}

fn read_string_map(reader: &mut ByteReader<'_>) -> Result<BTreeMap<String, String>, DecodeError> {
    let mut map = BTreeMap::new();

    loop {
        let offset = reader.position();
        let mut count = reader.read_long()?;
        if count == 0 {
            return Ok(map);
        }
        if count < 0 {
            // Negative block count is followed by the block's byte size.
            count = count
                .checked_neg()
                .ok_or(DecodeError::NegativeLength { length: count, offset })?;
            reader.read_long()?;
        }

        for _ in 0..count {
            let key = reader.read_str()?.to_string();
            let value = reader.read_str()?.to_string();
            map.insert(key, value);
        }
    }
}
