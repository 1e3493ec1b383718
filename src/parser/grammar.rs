// Lazily compiled line grammar
use super::regex_error::RegexError;
use crate::schema::FieldSlot;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// A named line pattern, compiled on first use and shared afterwards.
///
/// Compilation also checks that the pattern exposes a capture for every
/// record field the grammar is expected to fill.
pub struct Grammar {
    pattern: &'static str,
    name: &'static str,
    compiled: OnceLock<Result<Regex, RegexError>>,
}

impl Grammar {
    pub const fn new(pattern: &'static str, name: &'static str) -> Self {
        Self {
            pattern,
            name,
            compiled: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pattern(&self) -> &'static str {
        self.pattern
    }

    pub fn regex(&self) -> Result<&Regex, RegexError> {
        match self.compiled.get_or_init(|| self.compile()) {
            Ok(regex) => Ok(regex),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn captures<'t>(&self, line: &'t str) -> Result<Option<Captures<'t>>, RegexError> {
        Ok(self.regex()?.captures(line))
    }

    fn compile(&self) -> Result<Regex, RegexError> {
        let regex = Regex::new(self.pattern).map_err(|source| RegexError::CompilationFailed {
            pattern: self.pattern.to_string(),
            name: self.name.to_string(),
            source,
        })?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if let Some(slot) = FieldSlot::ALL
            .iter()
            .find(|slot| slot.is_captured() && !names.contains(&slot.name()))
        {
            return Err(RegexError::MissingCapture {
                name: self.name.to_string(),
                capture: slot.name(),
            });
        }

        Ok(regex)
    }
}
