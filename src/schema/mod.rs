//! Record schema for the container.
//!
//! The schema is a fixed, ordered list of (name, type) pairs. It is embedded
//! in every container header as Avro-style JSON and parsed back by readers,
//! which decode records in the embedded order.

pub mod field;

pub use field::{FieldRef, FieldSlot, FieldType, FieldValue};

use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

pub const SCHEMA_NAME: &str = "HAProxyEvent";
pub const SCHEMA_NAMESPACE: &str = "nl.telegraaf.flume";

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Schema is not a record definition: {0}")]
    NotARecord(String),

    #[error("Unsupported type for field '{field}': {found}")]
    UnsupportedType { field: String, found: String },

    #[error("Type mismatch for field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Duplicate field: {0}")]
    DuplicateField(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    name: String,
    namespace: Option<String>,
    fields: Vec<FieldDef>,
}

impl RecordSchema {
    /// The canonical HAProxy event schema, built once from the slot table.
    pub fn haproxy() -> &'static RecordSchema {
        static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| RecordSchema {
            name: SCHEMA_NAME.to_string(),
            namespace: Some(SCHEMA_NAMESPACE.to_string()),
            fields: FieldSlot::ALL
                .iter()
                .map(|slot| FieldDef {
                    name: slot.name().to_string(),
                    field_type: slot.field_type(),
                })
                .collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn to_json_value(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|field| json!({"name": field.name, "type": field.field_type.to_json()}))
            .collect();

        let mut object = Map::new();
        object.insert("type".to_string(), json!("record"));
        object.insert("name".to_string(), json!(self.name));
        if let Some(namespace) = &self.namespace {
            object.insert("namespace".to_string(), json!(namespace));
        }
        object.insert("fields".to_string(), Value::Array(fields));
        Value::Object(object)
    }

    /// Compact JSON, as embedded in the container header.
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, SchemaError> {
        let object = value
            .as_object()
            .ok_or_else(|| SchemaError::NotARecord(value.to_string()))?;

        if object.get("type").and_then(Value::as_str) != Some("record") {
            return Err(SchemaError::NotARecord("type must be \"record\"".to_string()));
        }

        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::NotARecord("missing record name".to_string()))?
            .to_string();
        let namespace = object
            .get("namespace")
            .and_then(Value::as_str)
            .map(str::to_string);

        let raw_fields = object
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::NotARecord("missing fields array".to_string()))?;

        let mut seen = HashSet::with_capacity(raw_fields.len());
        let mut fields = Vec::with_capacity(raw_fields.len());
        for raw in raw_fields {
            let field_name = raw
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::NotARecord(format!("field without name: {raw}")))?;
            let field_type = raw
                .get("type")
                .ok_or_else(|| SchemaError::NotARecord(format!("field without type: {raw}")))?;

            if !seen.insert(field_name.to_string()) {
                return Err(SchemaError::DuplicateField(field_name.to_string()));
            }

            fields.push(FieldDef {
                name: field_name.to_string(),
                field_type: FieldType::from_json(field_name, field_type)?,
            });
        }

        Ok(RecordSchema {
            name,
            namespace,
            fields,
        })
    }

    /// Resolve every field to its record slot, checking the declared type.
    pub fn slot_plan(&self) -> Result<Vec<FieldSlot>, SchemaError> {
        self.fields
            .iter()
            .map(|field| {
                let slot = FieldSlot::from_name(&field.name)
                    .ok_or_else(|| SchemaError::UnknownField(field.name.clone()))?;
                check_type(slot, field.field_type)?;
                Ok(slot)
            })
            .collect()
    }
}

pub(crate) fn check_type(slot: FieldSlot, declared: FieldType) -> Result<(), SchemaError> {
    if slot.field_type() == declared {
        Ok(())
    } else {
        Err(SchemaError::TypeMismatch {
            field: slot.name().to_string(),
            expected: slot.field_type(),
            found: declared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPROXY_SCHEMA_JSON: &str = r#"
{
  "type": "record",
  "name": "HAProxyEvent",
  "namespace": "nl.telegraaf.flume",
  "fields": [
    {"name": "headers", "type": {"type": "map", "values": "string"}},
    {"name": "original", "type": "string"},
    {"name": "ip", "type": "string"},
    {"name": "time", "type": "string"},
    {"name": "frontend", "type": "string"},
    {"name": "backend", "type": "string"},
    {"name": "server", "type": "string"},
    {"name": "tq", "type": "int"},
    {"name": "tw", "type": "int"},
    {"name": "tc", "type": "int"},
    {"name": "tr", "type": "int"},
    {"name": "tt", "type": "int"},
    {"name": "statuscode", "type": "int"},
    {"name": "bytesread", "type": "string"},
    {"name": "requestcookie", "type": "string"},
    {"name": "responsecookie", "type": "string"},
    {"name": "terminationstate", "type": "string"},
    {"name": "actconn", "type": "int"},
    {"name": "feconn", "type": "int"},
    {"name": "beconn", "type": "int"},
    {"name": "srvconn", "type": "int"},
    {"name": "retries", "type": "int"},
    {"name": "srvqueue", "type": "int"},
    {"name": "backendqueue", "type": "int"},
    {"name": "requestheaders", "type": "string"},
    {"name": "responseheaders", "type": "string"},
    {"name": "method", "type": "string"},
    {"name": "uri", "type": "string"},
    {"name": "protocol", "type": ["null", "string"]}
  ]
}
"#;

    #[test]
    fn test_haproxy_schema_matches_reference_json() {
        let parsed = RecordSchema::from_json(HAPROXY_SCHEMA_JSON).unwrap();
        assert_eq!(&parsed, RecordSchema::haproxy());
        assert_eq!(parsed.fields().len(), 29);
    }

    #[test]
    fn test_to_json_parses_back() {
        let schema = RecordSchema::haproxy();
        let text = schema.to_json();

        assert!(text.starts_with('{'));
        assert!(!text.contains('\n'));
        assert_eq!(&RecordSchema::from_json(&text).unwrap(), schema);
    }

    #[test]
    fn test_slot_plan_follows_schema_order() {
        let plan = RecordSchema::haproxy().slot_plan().unwrap();
        assert_eq!(plan, FieldSlot::ALL.to_vec());
    }

    #[test]
    fn test_rejects_non_record() {
        assert!(matches!(
            RecordSchema::from_json(r#"{"type": "enum", "name": "x"}"#),
            Err(SchemaError::NotARecord(_))
        ));
        assert!(matches!(
            RecordSchema::from_json("not json"),
            Err(SchemaError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_field() {
        let text = r#"{"type": "record", "name": "x", "fields": [
            {"name": "ip", "type": "string"},
            {"name": "ip", "type": "string"}
        ]}"#;
        assert!(matches!(
            RecordSchema::from_json(text),
            Err(SchemaError::DuplicateField(name)) if name == "ip"
        ));
    }

    #[test]
    fn test_slot_plan_checks_types_and_names() {
        let wrong_type = RecordSchema::from_json(
            r#"{"type": "record", "name": "x",
                "fields": [{"name": "statuscode", "type": "string"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            wrong_type.slot_plan(),
            Err(SchemaError::TypeMismatch { .. })
        ));

        let unknown = RecordSchema::from_json(
            r#"{"type": "record", "name": "x", "fields": [{"name": "port", "type": "int"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            unknown.slot_plan(),
            Err(SchemaError::UnknownField(name)) if name == "port"
        ));
    }
}
