use crate::schema::{FieldRef, FieldSlot, FieldValue, SchemaError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HAProxy accept date format, e.g. `24/Nov/2014:13:59:25.582`.
const ACCEPT_DATE_FORMAT: &str = "%d/%b/%Y:%H:%M:%S%.f";

/// One HAProxy HTTP log line in structured form.
///
/// Every field defaults to an empty string, zero or `None`, so a line that
/// does not match the grammar still yields a complete, encodable record that
/// only carries `original` and `headers`.
///
/// Serde names follow the container schema, which keeps HAProxy's own timer
/// names (`tq`, `tw`, `tc`, `tr`, `tt`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub headers: BTreeMap<String, String>,
    pub original: String,

    // Client and routing
    pub ip: String,
    pub time: String,
    pub frontend: String,
    pub backend: String,
    pub server: String,

    // Timers in milliseconds
    #[serde(rename = "tq")]
    pub time_request: i32,
    #[serde(rename = "tw")]
    pub time_queue: i32,
    #[serde(rename = "tc")]
    pub time_backend_connect: i32,
    #[serde(rename = "tr")]
    pub time_backend_response: i32,
    #[serde(rename = "tt")]
    pub time_total: i32,

    #[serde(rename = "statuscode")]
    pub status_code: i32,
    #[serde(rename = "bytesread")]
    pub bytes_read: String,
    #[serde(rename = "requestcookie")]
    pub request_cookie: String,
    #[serde(rename = "responsecookie")]
    pub response_cookie: String,
    #[serde(rename = "terminationstate")]
    pub termination_state: String,

    // Connection counters
    pub actconn: i32,
    pub feconn: i32,
    pub beconn: i32,
    pub srvconn: i32,
    pub retries: i32,

    // Queues
    #[serde(rename = "srvqueue")]
    pub server_queue: i32,
    #[serde(rename = "backendqueue")]
    pub backend_queue: i32,

    // Captured headers, kept opaque
    #[serde(rename = "requestheaders")]
    pub request_headers: String,
    #[serde(rename = "responseheaders")]
    pub response_headers: String,

    // Request line
    pub method: String,
    pub uri: String,
    pub protocol: Option<String>,
}

impl LogRecord {
    /// Record for a line the grammar rejected: only the passthrough fields are set.
    pub fn unparsed(original: impl Into<String>, headers: BTreeMap<String, String>) -> Self {
        Self {
            headers,
            original: original.into(),
            ..Self::default()
        }
    }

    /// Borrow the value stored in `slot`.
    pub fn field(&self, slot: FieldSlot) -> FieldRef<'_> {
        match slot {
            FieldSlot::Headers => FieldRef::StringMap(&self.headers),
            FieldSlot::Original => FieldRef::String(&self.original),
            FieldSlot::Ip => FieldRef::String(&self.ip),
            FieldSlot::Time => FieldRef::String(&self.time),
            FieldSlot::Frontend => FieldRef::String(&self.frontend),
            FieldSlot::Backend => FieldRef::String(&self.backend),
            FieldSlot::Server => FieldRef::String(&self.server),
            FieldSlot::TimeRequest => FieldRef::Int(self.time_request),
            FieldSlot::TimeQueue => FieldRef::Int(self.time_queue),
            FieldSlot::TimeBackendConnect => FieldRef::Int(self.time_backend_connect),
            FieldSlot::TimeBackendResponse => FieldRef::Int(self.time_backend_response),
            FieldSlot::TimeTotal => FieldRef::Int(self.time_total),
            FieldSlot::StatusCode => FieldRef::Int(self.status_code),
            FieldSlot::BytesRead => FieldRef::String(&self.bytes_read),
            FieldSlot::RequestCookie => FieldRef::String(&self.request_cookie),
            FieldSlot::ResponseCookie => FieldRef::String(&self.response_cookie),
            FieldSlot::TerminationState => FieldRef::String(&self.termination_state),
            FieldSlot::ActConn => FieldRef::Int(self.actconn),
            FieldSlot::FeConn => FieldRef::Int(self.feconn),
            FieldSlot::BeConn => FieldRef::Int(self.beconn),
            FieldSlot::SrvConn => FieldRef::Int(self.srvconn),
            FieldSlot::Retries => FieldRef::Int(self.retries),
            FieldSlot::ServerQueue => FieldRef::Int(self.server_queue),
            FieldSlot::BackendQueue => FieldRef::Int(self.backend_queue),
            FieldSlot::RequestHeaders => FieldRef::String(&self.request_headers),
            FieldSlot::ResponseHeaders => FieldRef::String(&self.response_headers),
            FieldSlot::Method => FieldRef::String(&self.method),
            FieldSlot::Uri => FieldRef::String(&self.uri),
            FieldSlot::Protocol => FieldRef::NullableString(self.protocol.as_deref()),
        }
    }

    /// Store `value` in `slot`. The value's shape must match the slot's schema type.
    pub fn set_field(&mut self, slot: FieldSlot, value: FieldValue) -> Result<(), SchemaError> {
        let found = value.field_type();
        match (slot, value) {
            (FieldSlot::Headers, FieldValue::StringMap(map)) => self.headers = map,
            (FieldSlot::Protocol, FieldValue::NullableString(text)) => self.protocol = text,
            (slot, FieldValue::String(text)) if slot.field_type() == found => {
                *self.string_slot(slot) = text;
            }
            (slot, FieldValue::Int(number)) if slot.field_type() == found => {
                *self.int_slot(slot) = number;
            }
            (slot, _) => {
                return Err(SchemaError::TypeMismatch {
                    field: slot.name().to_string(),
                    expected: slot.field_type(),
                    found,
                });
            }
        }
        Ok(())
    }

    fn string_slot(&mut self, slot: FieldSlot) -> &mut String {
        match slot {
            FieldSlot::Ip => &mut self.ip,
            FieldSlot::Time => &mut self.time,
            FieldSlot::Frontend => &mut self.frontend,
            FieldSlot::Backend => &mut self.backend,
            FieldSlot::Server => &mut self.server,
            FieldSlot::BytesRead => &mut self.bytes_read,
            FieldSlot::RequestCookie => &mut self.request_cookie,
            FieldSlot::ResponseCookie => &mut self.response_cookie,
            FieldSlot::TerminationState => &mut self.termination_state,
            FieldSlot::RequestHeaders => &mut self.request_headers,
            FieldSlot::ResponseHeaders => &mut self.response_headers,
            FieldSlot::Method => &mut self.method,
            FieldSlot::Uri => &mut self.uri,
            // Only reachable for `Original`; callers check the slot type first.
            _ => &mut self.original,
        }
    }

    fn int_slot(&mut self, slot: FieldSlot) -> &mut i32 {
        match slot {
            FieldSlot::TimeRequest => &mut self.time_request,
            FieldSlot::TimeQueue => &mut self.time_queue,
            FieldSlot::TimeBackendConnect => &mut self.time_backend_connect,
            FieldSlot::TimeBackendResponse => &mut self.time_backend_response,
            FieldSlot::TimeTotal => &mut self.time_total,
            FieldSlot::StatusCode => &mut self.status_code,
            FieldSlot::ActConn => &mut self.actconn,
            FieldSlot::FeConn => &mut self.feconn,
            FieldSlot::BeConn => &mut self.beconn,
            FieldSlot::SrvConn => &mut self.srvconn,
            FieldSlot::Retries => &mut self.retries,
            FieldSlot::ServerQueue => &mut self.server_queue,
            _ => &mut self.backend_queue,
        }
    }

    /// Accept date parsed on demand; the stored `time` stays textual.
    pub fn accepted_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.time, ACCEPT_DATE_FORMAT).ok()
    }

    /// Short one-line description for diagnostics.
    pub fn summary(&self) -> String {
        if self.frontend.is_empty() && self.method.is_empty() {
            return format!("unparsed ({} bytes)", self.original.len());
        }
        format!(
            "{} [{}] {} {}/{} {} {} {} tt={}ms",
            self.ip,
            self.time,
            self.frontend,
            self.backend,
            self.server,
            self.status_code,
            self.method,
            self.uri,
            self.time_total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_unparsed_keeps_only_passthrough_fields() {
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "lb-01".to_string());

        let record = LogRecord::unparsed("garbage", headers.clone());

        assert_eq!(record.original, "garbage");
        assert_eq!(record.headers, headers);
        assert_eq!(record.ip, "");
        assert_eq!(record.status_code, 0);
        assert_eq!(record.protocol, None);
    }

    #[test]
    fn test_field_and_set_field_agree_for_every_slot() {
        let mut record = LogRecord::default();

        for (i, slot) in FieldSlot::ALL.iter().enumerate() {
            let value = match slot.field_type() {
                FieldType::StringMap => {
                    let mut map = BTreeMap::new();
                    map.insert("k".to_string(), format!("v{i}"));
                    FieldValue::StringMap(map)
                }
                FieldType::String => FieldValue::String(format!("s{i}")),
                FieldType::Int => FieldValue::Int(i as i32),
                FieldType::NullableString => FieldValue::NullableString(Some(format!("n{i}"))),
            };
            record.set_field(*slot, value.clone()).unwrap();
            assert_eq!(record.field(*slot).to_owned_value(), value, "slot {slot:?}");
        }
    }

    #[test]
    fn test_set_field_rejects_wrong_type() {
        let mut record = LogRecord::default();

        let result = record.set_field(FieldSlot::StatusCode, FieldValue::String("200".into()));
        assert!(matches!(result, Err(SchemaError::TypeMismatch { .. })));

        let result = record.set_field(FieldSlot::Original, FieldValue::NullableString(None));
        assert!(result.is_err());
    }

    #[test]
    fn test_accepted_at() {
        let record = LogRecord {
            time: "24/Nov/2014:13:59:25.582".to_string(),
            ..LogRecord::default()
        };

        let accepted = record.accepted_at().unwrap();
        assert_eq!(accepted.year(), 2014);
        assert_eq!(accepted.month(), 11);
        assert_eq!(accepted.hour(), 13);
        assert_eq!(accepted.nanosecond(), 582_000_000);

        assert!(LogRecord::default().accepted_at().is_none());
    }

    #[test]
    fn test_summary() {
        assert_eq!(LogRecord::unparsed("abc", BTreeMap::new()).summary(), "unparsed (3 bytes)");

        let record = LogRecord {
            ip: "10.0.0.1".into(),
            frontend: "http".into(),
            backend: "nginx".into(),
            server: "web1".into(),
            status_code: 200,
            method: "GET".into(),
            uri: "/".into(),
            time_total: 24,
            ..LogRecord::default()
        };
        assert!(record.summary().contains("http nginx/web1 200 GET / tt=24ms"));
    }
}
