//! HAProxy HTTP log line parser.

use super::generated::HAPROXY_HTTP;
use super::grammar::Grammar;
use super::regex_error::RegexError;
use crate::domain::{Event, LogRecord};
use crate::schema::{FieldSlot, FieldType, FieldValue};
use regex::Captures;
use std::collections::BTreeMap;
use tracing::{error, warn};

/// Longest line prefix included in diagnostics.
const LOGGED_LINE_CHARS: usize = 256;

/// How a line was turned into a record.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Matched,
    /// The line does not follow the grammar; only passthrough fields are set.
    GrammarMismatch,
    /// The grammar itself failed to compile; every line takes the mismatch path.
    GrammarUnavailable(RegexError),
}

impl ParseOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, ParseOutcome::Matched)
    }
}

#[derive(Debug, Clone)]
pub struct ParsedLine {
    pub record: LogRecord,
    pub outcome: ParseOutcome,
}

/// Parser for HAProxy `option httplog` lines.
///
/// Never fails: a line that does not match still yields a record carrying
/// the raw text and the host headers.
#[derive(Clone, Copy)]
pub struct HaproxyParser {
    grammar: &'static Grammar,
}

impl Default for HaproxyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HaproxyParser {
    pub fn new() -> Self {
        Self::with_grammar(&HAPROXY_HTTP)
    }

    pub fn with_grammar(grammar: &'static Grammar) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &'static Grammar {
        self.grammar
    }

    pub fn parse(&self, line: &str) -> ParsedLine {
        self.parse_with_headers(line, BTreeMap::new())
    }

    pub fn parse_event(&self, event: &Event) -> ParsedLine {
        self.parse_with_headers(&event.body_text(), event.headers.clone())
    }

    pub fn parse_with_headers(&self, line: &str, headers: BTreeMap<String, String>) -> ParsedLine {
        let mut record = LogRecord::unparsed(line, headers);
        let text = line.trim_end_matches(['\r', '\n']);

        let outcome = match self.grammar.captures(text) {
            Ok(Some(captures)) => {
                fill_record(&mut record, &captures);
                ParseOutcome::Matched
            }
            Ok(None) => {
                warn!(
                    grammar = self.grammar.name(),
                    line = %loggable(text),
                    "Line does not match HAProxy grammar, storing it unparsed"
                );
                ParseOutcome::GrammarMismatch
            }
            Err(e) => {
                error!(
                    grammar = self.grammar.name(),
                    error = %e,
                    "HAProxy grammar unavailable, storing line unparsed"
                );
                ParseOutcome::GrammarUnavailable(e)
            }
        };

        ParsedLine { record, outcome }
    }
}

fn fill_record(record: &mut LogRecord, captures: &Captures<'_>) {
    for slot in FieldSlot::ALL.into_iter().filter(|slot| slot.is_captured()) {
        let text = captures.name(slot.name()).map(|m| m.as_str());

        let value = match slot.field_type() {
            FieldType::Int => FieldValue::Int(parse_int(slot, text)),
            FieldType::NullableString => FieldValue::NullableString(text.map(str::to_string)),
            FieldType::String => FieldValue::String(text.unwrap_or_default().to_string()),
            FieldType::StringMap => continue,
        };

        if let Err(e) = record.set_field(slot, value) {
            warn!(field = slot.name(), error = %e, "Could not store captured field");
        }
    }
}

/// Base-10 integer capture. Absent or empty is 0; anything unparsable
/// (overflow, in practice) is 0 with a warning.
fn parse_int(slot: FieldSlot, text: Option<&str>) -> i32 {
    match text {
        None | Some("") => 0,
        Some(digits) => digits.parse::<i32>().unwrap_or_else(|e| {
            warn!(
                field = slot.name(),
                value = digits,
                error = %e,
                "Integer field not representable, using 0"
            );
            0
        }),
    }
}

fn loggable(line: &str) -> &str {
    match line.char_indices().nth(LOGGED_LINE_CHARS) {
        Some((index, _)) => &line[..index],
        None => line,
    }
}
