//! Canonical filenames: generation from records and recognition of names
//! already produced.

pub mod grammar;

use std::path::Path;

use crate::error::Result;
use crate::period::{PeriodConfiguration, DEFAULT_SEPARATOR};
use crate::types::{EventMap, ImageRecord};
use grammar::{FilenameGrammar, NameParts, ParsedName};

/// Produces and recognizes canonical filenames for one separator
#[derive(Debug, Clone)]
pub struct FilenamePatternGenerator {
    grammar: FilenameGrammar,
}

impl FilenamePatternGenerator {
    pub fn new(separator: &str) -> Result<Self> {
        Ok(Self {
            grammar: FilenameGrammar::new(separator)?,
        })
    }

    /// Generator speaking the separator of `config`
    pub fn for_configuration(config: &PeriodConfiguration) -> Result<Self> {
        Self::new(config.separator())
    }

    /// Generator for the default `" - "` separator
    pub fn with_default_separator() -> Result<Self> {
        Self::new(DEFAULT_SEPARATOR)
    }

    pub fn grammar(&self) -> &FilenameGrammar {
        &self.grammar
    }

    /// New file name (with the original extension) for `record`.
    ///
    /// Records dated outside the configuration's range get the reduced
    /// `DATE8[(SS)]` form, with no period number or prefix.
    pub fn generate_filename(
        &self,
        config: &PeriodConfiguration,
        record: &ImageRecord,
        sequential_index: u32,
        events: Option<&EventMap>,
    ) -> String {
        debug_assert_eq!(config.separator(), self.grammar.separator());

        let date = record.preferred_date();
        let stem = if config.is_date_in_range(date) {
            let event = events.and_then(|events| events.event_for(date));
            config.generate_filename_pattern(date, sequential_index, event)
        } else {
            let parts = NameParts {
                period: None,
                prefix: None,
                date: config.format_date(date),
                sequence: config.includes_sequential().then_some(sequential_index),
                event: None,
            };
            grammar::compose(config.separator(), &parts)
        };

        format!("{stem}{}", record.extension())
    }

    /// Parse a file name, extension stripped first
    pub fn parse(&self, filename: &str) -> Option<ParsedName> {
        let stem = Path::new(filename).file_stem()?.to_str()?;
        self.grammar.parse(stem)
    }

    /// Whether `filename` was produced by this naming scheme
    pub fn is_organized(&self, filename: &str) -> bool {
        self.parse(filename).is_some()
    }

    /// Event text carried by an organized file name
    pub fn event_of(&self, filename: &str) -> Option<String> {
        self.parse(filename)?
            .event
            .map(|event| event.trim().to_string())
            .filter(|event| !event.is_empty())
    }
}
