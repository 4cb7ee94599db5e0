//! The canonical filename grammar.
//!
//! ```text
//! [PP<sep>][<PREFIX><sep>]<DATE8>[(<SS>)][<sep><EVENT>]
//! ```
//!
//! [`compose`] and [`FilenameGrammar`] are both derived from the field
//! constants below, so what is written can always be read back.

use regex::Regex;
use std::fmt::Write;
use once_cell::sync::Lazy;

use crate::error::{Error, Result};

/// Minimum width of the period field
pub const PERIOD_DIGITS: usize = 2;
/// Exact width of the rendered date
pub const DATE_DIGITS: usize = 8;
/// Minimum width of the sequence field
pub const SEQUENCE_DIGITS: usize = 2;
pub const SEQUENCE_OPEN: char = '(';
pub const SEQUENCE_CLOSE: char = ')';

/// Fixed prefix and separator of names written by early releases
pub const LEGACY_PREFIX: &str = "IMG";
pub const LEGACY_SEPARATOR: &str = " - ";

/// `PP - IMG DATE8(SS)` and `PP - IMG - DATE8(SS)`, with optional event
static LEGACY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let sep = regex::escape(LEGACY_SEPARATOR);
    Regex::new(&format!(
        r"(?s)^(?P<period>\d{{{PERIOD_DIGITS}}}){sep}(?P<prefix>{prefix})(?:{sep}| )(?P<date>\d{{{DATE_DIGITS}}}){seq}(?:{sep}(?P<event>.+))?$",
        prefix = regex::escape(LEGACY_PREFIX),
        seq = sequence_fragment(),
    ))
    .expect("Failed to create regex pattern for legacy filenames")
});

fn sequence_fragment() -> String {
    format!(
        r"{open}(?P<sequence>\d{{{SEQUENCE_DIGITS},}}){close}",
        open = regex::escape(&SEQUENCE_OPEN.to_string()),
        close = regex::escape(&SEQUENCE_CLOSE.to_string()),
    )
}

/// Whether `text` can sit inside a single file name: no path separators,
/// NUL or control characters
pub fn is_file_name_safe(text: &str) -> bool {
    !text
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control())
}

/// Fields of a filename stem, before joining
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts<'a> {
    pub period: Option<u32>,
    pub prefix: Option<&'a str>,
    pub date: String,
    pub sequence: Option<u32>,
    pub event: Option<&'a str>,
}

/// Join name fields into a stem
pub fn compose(separator: &str, parts: &NameParts<'_>) -> String {
    let mut fields = Vec::with_capacity(3);
    if let Some(period) = parts.period {
        fields.push(format!("{period:0PERIOD_DIGITS$}"));
    }
    if let Some(prefix) = parts.prefix {
        fields.push(prefix.to_string());
    }
    fields.push(parts.date.clone());

    let mut name = fields.join(separator);
    if let Some(sequence) = parts.sequence {
        let _ = write!(
            name,
            "{SEQUENCE_OPEN}{sequence:0SEQUENCE_DIGITS$}{SEQUENCE_CLOSE}"
        );
    }
    // An event that would split the name into directories is left out
    if let Some(event) = parts.event.filter(|event| is_file_name_safe(event)) {
        name.push_str(separator);
        name.push_str(event);
    }
    name
}

/// Fields recovered from a recognized stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub period: Option<u32>,
    pub prefix: Option<String>,
    pub date: String,
    pub sequence: Option<u32>,
    pub event: Option<String>,
}

/// Recognizer for stems written with one separator
#[derive(Debug, Clone)]
pub struct FilenameGrammar {
    separator: String,
    canonical: Regex,
    loose: Regex,
}

impl FilenameGrammar {
    pub fn new(separator: &str) -> Result<Self> {
        if separator.is_empty() {
            return Err(Error::Configuration("separator must not be empty".to_string()));
        }
        let sep = regex::escape(separator);
        let seq = sequence_fragment();

        let canonical = Regex::new(&format!(
            r"(?s)^(?:(?P<period>\d{{{PERIOD_DIGITS},}}){sep})?(?:(?P<prefix>.*?){sep})?(?P<date>\d{{{DATE_DIGITS}}})(?:{seq})?(?:{sep}(?P<event>.+))?$"
        ))
        .map_err(|e| Error::Configuration(format!("Failed to build filename pattern: {e}")))?;

        // Anything ending in DATE8(SS), as written by other naming schemes
        let loose = Regex::new(&format!(
            r"(?s)^.*?(?P<date>\d{{{DATE_DIGITS}}}){seq}(?:{sep}(?P<event>.+))?$"
        ))
        .map_err(|e| Error::Configuration(format!("Failed to build filename pattern: {e}")))?;

        Ok(Self {
            separator: separator.to_string(),
            canonical,
            loose,
        })
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Parse a stem (no extension)
    pub fn parse(&self, stem: &str) -> Option<ParsedName> {
        [&*LEGACY_PATTERN, &self.canonical, &self.loose]
            .into_iter()
            .find_map(|pattern| pattern.captures(stem))
            .map(|caps| ParsedName {
                period: caps.name("period").and_then(|m| m.as_str().parse().ok()),
                prefix: caps.name("prefix").map(|m| m.as_str().to_string()),
                date: caps["date"].to_string(),
                sequence: caps.name("sequence").and_then(|m| m.as_str().parse().ok()),
                event: caps.name("event").map(|m| m.as_str().to_string()),
            })
    }

    pub fn matches(&self, stem: &str) -> bool {
        self.parse(stem).is_some()
    }
}
