use super::SchemaError;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// Wire type of a schema field. Only the shapes the HAProxy record needs are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `{"type": "map", "values": "string"}`
    StringMap,
    String,
    Int,
    /// `["null", "string"]`
    NullableString,
}

impl FieldType {
    pub fn to_json(self) -> Value {
        match self {
            FieldType::StringMap => json!({"type": "map", "values": "string"}),
            FieldType::String => json!("string"),
            FieldType::Int => json!("int"),
            FieldType::NullableString => json!(["null", "string"]),
        }
    }

    pub fn from_json(field: &str, value: &Value) -> Result<Self, SchemaError> {
        let unsupported = || SchemaError::UnsupportedType {
            field: field.to_string(),
            found: value.to_string(),
        };

        match value {
            Value::String(name) => match name.as_str() {
                "string" => Ok(FieldType::String),
                "int" => Ok(FieldType::Int),
                _ => Err(unsupported()),
            },
            Value::Array(branches) => {
                let names: Vec<Option<&str>> = branches.iter().map(Value::as_str).collect();
                if names == [Some("null"), Some("string")] {
                    Ok(FieldType::NullableString)
                } else {
                    Err(unsupported())
                }
            }
            Value::Object(object) => {
                let is_map = object.get("type").and_then(Value::as_str) == Some("map");
                let values_are_strings =
                    object.get("values").and_then(Value::as_str) == Some("string");
                if is_map && values_are_strings {
                    Ok(FieldType::StringMap)
                } else {
                    Err(unsupported())
                }
            }
            _ => Err(unsupported()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::StringMap => "map<string>",
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::NullableString => "union<null,string>",
        };
        f.write_str(name)
    }
}

/// Static slot table binding schema field names to `LogRecord` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSlot {
    Headers,
    Original,
    Ip,
    Time,
    Frontend,
    Backend,
    Server,
    TimeRequest,
    TimeQueue,
    TimeBackendConnect,
    TimeBackendResponse,
    TimeTotal,
    StatusCode,
    BytesRead,
    RequestCookie,
    ResponseCookie,
    TerminationState,
    ActConn,
    FeConn,
    BeConn,
    SrvConn,
    Retries,
    ServerQueue,
    BackendQueue,
    RequestHeaders,
    ResponseHeaders,
    Method,
    Uri,
    Protocol,
}

impl FieldSlot {
    /// Every slot in canonical schema order.
    pub const ALL: [FieldSlot; 29] = [
        FieldSlot::Headers,
        FieldSlot::Original,
        FieldSlot::Ip,
        FieldSlot::Time,
        FieldSlot::Frontend,
        FieldSlot::Backend,
        FieldSlot::Server,
        FieldSlot::TimeRequest,
        FieldSlot::TimeQueue,
        FieldSlot::TimeBackendConnect,
        FieldSlot::TimeBackendResponse,
        FieldSlot::TimeTotal,
        FieldSlot::StatusCode,
        FieldSlot::BytesRead,
        FieldSlot::RequestCookie,
        FieldSlot::ResponseCookie,
        FieldSlot::TerminationState,
        FieldSlot::ActConn,
        FieldSlot::FeConn,
        FieldSlot::BeConn,
        FieldSlot::SrvConn,
        FieldSlot::Retries,
        FieldSlot::ServerQueue,
        FieldSlot::BackendQueue,
        FieldSlot::RequestHeaders,
        FieldSlot::ResponseHeaders,
        FieldSlot::Method,
        FieldSlot::Uri,
        FieldSlot::Protocol,
    ];

    /// Schema field name, which is also the grammar capture name.
    pub const fn name(self) -> &'static str {
        match self {
            FieldSlot::Headers => "headers",
            FieldSlot::Original => "original",
            FieldSlot::Ip => "ip",
            FieldSlot::Time => "time",
            FieldSlot::Frontend => "frontend",
            FieldSlot::Backend => "backend",
            FieldSlot::Server => "server",
            FieldSlot::TimeRequest => "tq",
            FieldSlot::TimeQueue => "tw",
            FieldSlot::TimeBackendConnect => "tc",
            FieldSlot::TimeBackendResponse => "tr",
            FieldSlot::TimeTotal => "tt",
            FieldSlot::StatusCode => "statuscode",
            FieldSlot::BytesRead => "bytesread",
            FieldSlot::RequestCookie => "requestcookie",
            FieldSlot::ResponseCookie => "responsecookie",
            FieldSlot::TerminationState => "terminationstate",
            FieldSlot::ActConn => "actconn",
            FieldSlot::FeConn => "feconn",
            FieldSlot::BeConn => "beconn",
            FieldSlot::SrvConn => "srvconn",
            FieldSlot::Retries => "retries",
            FieldSlot::ServerQueue => "srvqueue",
            FieldSlot::BackendQueue => "backendqueue",
            FieldSlot::RequestHeaders => "requestheaders",
            FieldSlot::ResponseHeaders => "responseheaders",
            FieldSlot::Method => "method",
            FieldSlot::Uri => "uri",
            FieldSlot::Protocol => "protocol",
        }
    }

    pub const fn field_type(self) -> FieldType {
        match self {
            FieldSlot::Headers => FieldType::StringMap,
            FieldSlot::Protocol => FieldType::NullableString,
            FieldSlot::TimeRequest
            | FieldSlot::TimeQueue
            | FieldSlot::TimeBackendConnect
            | FieldSlot::TimeBackendResponse
            | FieldSlot::TimeTotal
            | FieldSlot::StatusCode
            | FieldSlot::ActConn
            | FieldSlot::FeConn
            | FieldSlot::BeConn
            | FieldSlot::SrvConn
            | FieldSlot::Retries
            | FieldSlot::ServerQueue
            | FieldSlot::BackendQueue => FieldType::Int,
            _ => FieldType::String,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|slot| slot.name() == name)
    }

    /// Whether the grammar fills this slot. `headers` and `original` come from the event itself.
    pub const fn is_captured(self) -> bool {
        !matches!(self, FieldSlot::Headers | FieldSlot::Original)
    }
}

/// Borrowed view of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    StringMap(&'a BTreeMap<String, String>),
    String(&'a str),
    Int(i32),
    NullableString(Option<&'a str>),
}

impl FieldRef<'_> {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldRef::StringMap(_) => FieldType::StringMap,
            FieldRef::String(_) => FieldType::String,
            FieldRef::Int(_) => FieldType::Int,
            FieldRef::NullableString(_) => FieldType::NullableString,
        }
    }

    pub fn to_owned_value(&self) -> FieldValue {
        match *self {
            FieldRef::StringMap(map) => FieldValue::StringMap(map.clone()),
            FieldRef::String(text) => FieldValue::String(text.to_string()),
            FieldRef::Int(number) => FieldValue::Int(number),
            FieldRef::NullableString(text) => FieldValue::NullableString(text.map(str::to_string)),
        }
    }
}

/// Owned field value, as produced by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    StringMap(BTreeMap<String, String>),
    String(String),
    Int(i32),
    NullableString(Option<String>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::StringMap(_) => FieldType::StringMap,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::NullableString(_) => FieldType::NullableString,
        }
    }
}
