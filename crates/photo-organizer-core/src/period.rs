//! Period calendar: a named date range and the arithmetic that numbers
//! months and years inside it.

use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Months, NaiveDate};

use crate::error::{Error, Result};
use crate::naming::grammar::{self, NameParts};

pub const DEFAULT_PREFIX: &str = "IMG";
pub const DEFAULT_SEPARATOR: &str = " - ";
pub const DEFAULT_DATE_FORMAT: &str = "%d%m%Y";

/// Input format for dates typed by the user
pub const DATE_INPUT_FORMAT: &str = "%d/%m/%Y";

/// Parse a `DD/MM/YYYY` date typed by the user
pub fn parse_date_input(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_INPUT_FORMAT)
        .map_err(|_| Error::InvalidDateInput(input.trim().to_string()))
}

/// Parse an event typed as `DD/MM/YYYY=Description`
pub fn parse_event(input: &str) -> Result<(NaiveDate, String)> {
    let (date, description) = input
        .split_once('=')
        .ok_or_else(|| Error::InvalidDateInput(input.trim().to_string()))?;
    let description = description.trim();
    if description.is_empty() {
        return Err(Error::Configuration(format!(
            "Event '{}' has no description",
            input.trim()
        )));
    }
    if !grammar::is_file_name_safe(description) {
        return Err(Error::Configuration(format!(
            "Event '{}' cannot be used in a file name",
            description.escape_debug()
        )));
    }
    Ok((parse_date_input(date)?, description.to_string()))
}

/// Last day of the one-year span that begins on `start`.
///
/// A span starting on Feb 29 ends on Feb 28 of the following year.
pub fn one_year_span_end(start: NaiveDate) -> Option<NaiveDate> {
    if start.month() == 2 && start.day() == 29 {
        return NaiveDate::from_ymd_opt(start.year() + 1, 2, 28);
    }
    start.checked_add_months(Months::new(12))?.pred_opt()
}

/// A namable date range plus the naming options applied to files inside it.
///
/// Immutable once built; the only way to move forward in time is
/// [`PeriodConfiguration::derive_successor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodConfiguration {
    start: NaiveDate,
    end: Option<NaiveDate>,
    prefix: String,
    separator: String,
    include_period: bool,
    include_sequential: bool,
    date_format: String,
}

/// Builder for [`PeriodConfiguration`]
#[derive(Debug, Clone)]
pub struct PeriodConfigurationBuilder {
    start: NaiveDate,
    end: Option<NaiveDate>,
    open_ended: bool,
    prefix: String,
    separator: String,
    include_period: bool,
    include_sequential: bool,
    date_format: String,
}

impl PeriodConfigurationBuilder {
    /// Explicit last day of the period
    pub fn end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self.open_ended = false;
        self
    }

    /// Leave the end date unset instead of deriving one
    pub fn open_ended(mut self) -> Self {
        self.end = None;
        self.open_ended = true;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn include_period(mut self, include: bool) -> Self {
        self.include_period = include;
        self
    }

    pub fn include_sequential(mut self, include: bool) -> Self {
        self.include_sequential = include;
        self
    }

    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<PeriodConfiguration> {
        let end = match (self.end, self.open_ended) {
            (Some(end), _) => Some(end),
            (None, true) => None,
            (None, false) => Some(one_year_span_end(self.start).ok_or_else(|| {
                Error::Configuration(format!("no end date can follow {}", self.start))
            })?),
        };

        if let Some(end) = end {
            if end < self.start {
                return Err(Error::Configuration(format!(
                    "end date {} precedes start date {}",
                    end.format(DATE_INPUT_FORMAT),
                    self.start.format(DATE_INPUT_FORMAT)
                )));
            }
        }

        if self.separator.is_empty() {
            return Err(Error::Configuration("separator must not be empty".to_string()));
        }
        for (field, value) in [("prefix", &self.prefix), ("separator", &self.separator)] {
            if !grammar::is_file_name_safe(value) {
                return Err(Error::Configuration(format!(
                    "{field} '{value}' cannot be used in a file name"
                )));
            }
        }

        validate_date_format(&self.date_format)?;

        Ok(PeriodConfiguration {
            start: self.start,
            end,
            prefix: self.prefix,
            separator: self.separator,
            include_period: self.include_period,
            include_sequential: self.include_sequential,
            date_format: self.date_format,
        })
    }
}

/// The date template must be valid strftime and render exactly eight digits,
/// otherwise generated names could not be recognized again.
fn validate_date_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::Configuration(format!(
            "invalid date format '{format}'"
        )));
    }

    // Two-digit and single-digit day and month, so unpadded fields show up
    for (y, m, d) in [(2024, 12, 31), (2024, 1, 5)] {
        let sample = NaiveDate::from_ymd_opt(y, m, d)
            .map(|date| date.format(format).to_string())
            .unwrap_or_default();

        if sample.len() != grammar::DATE_DIGITS || !sample.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Configuration(format!(
                "date format '{format}' must render exactly {} digits, got '{sample}'",
                grammar::DATE_DIGITS
            )));
        }
    }

    Ok(())
}

impl PeriodConfiguration {
    /// Start building a configuration beginning on `start`
    pub fn builder(start: NaiveDate) -> PeriodConfigurationBuilder {
        PeriodConfigurationBuilder {
            start,
            end: None,
            open_ended: false,
            prefix: DEFAULT_PREFIX.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            include_period: true,
            include_sequential: true,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn includes_period(&self) -> bool {
        self.include_period
    }

    pub fn includes_sequential(&self) -> bool {
        self.include_sequential
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// Date rendered with the configured template
    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }

    /// Whole calendar months elapsed since the start date.
    ///
    /// Counts `(Δyears × 12) + Δmonths`, minus one while the day of month of
    /// `date` has not yet reached the start's day. Returns 0 when periods are
    /// disabled or `date` precedes the start.
    pub fn calculate_period_number(&self, date: NaiveDate) -> u32 {
        if !self.include_period || date < self.start {
            return 0;
        }

        let mut months = (date.year() - self.start.year()) * 12 + date.month() as i32
            - self.start.month() as i32;
        if date.day() < self.start.day() {
            months -= 1;
        }

        months.max(0) as u32
    }

    /// One-based year count since the start date; 0 before the start.
    pub fn calculate_year_number(&self, date: NaiveDate) -> u32 {
        if date < self.start {
            return 0;
        }

        let elapsed = (date.year() - self.start.year()) as u32;
        let anniversary = NaiveDate::from_ymd_opt(date.year(), self.start.month(), self.start.day())
            .or_else(|| NaiveDate::from_ymd_opt(date.year(), self.start.month(), 28));

        match anniversary {
            Some(anniversary) if anniversary <= date => elapsed + 1,
            _ => elapsed,
        }
    }

    pub fn is_date_in_range(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.map_or(true, |end| date <= end)
    }

    pub fn should_create_new_period(&self, date: NaiveDate) -> bool {
        self.end.is_some_and(|end| date > end)
    }

    /// Configuration for the period that follows this one, with the same
    /// naming options.
    pub fn derive_successor(&self) -> Result<Self> {
        let end = self.end.ok_or(Error::SuccessorUndefined)?;
        let start = end.succ_opt().ok_or_else(|| {
            Error::Configuration(format!("no date follows {end}"))
        })?;
        let successor_end = one_year_span_end(start).ok_or_else(|| {
            Error::Configuration(format!("no end date can follow {start}"))
        })?;

        Ok(Self {
            start,
            end: Some(successor_end),
            ..self.clone()
        })
    }

    /// Canonical base name (no extension) for a file dated `date`
    pub fn generate_filename_pattern(
        &self,
        date: NaiveDate,
        sequential: u32,
        event: Option<&str>,
    ) -> String {
        let parts = NameParts {
            period: self
                .include_period
                .then(|| self.calculate_period_number(date)),
            prefix: Some(self.prefix.as_str()).filter(|prefix| !prefix.is_empty()),
            date: self.format_date(date),
            sequence: self.include_sequential.then_some(sequential),
            event: event.filter(|event| !event.is_empty() && grammar::is_file_name_safe(event)),
        };
        grammar::compose(&self.separator, &parts)
    }

    /// Name of the folder holding this period's files
    pub fn folder_name(&self) -> String {
        let parts = NameParts {
            period: self
                .include_period
                .then(|| self.calculate_period_number(self.start)),
            prefix: Some(self.prefix.as_str()).filter(|prefix| !prefix.is_empty()),
            date: self.format_date(self.start),
            sequence: None,
            event: None,
        };
        grammar::compose(&self.separator, &parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(start: NaiveDate) -> PeriodConfiguration {
        PeriodConfiguration::builder(start).build().unwrap()
    }

    #[test]
    fn test_period_number_is_zero_at_and_before_start() {
        for start in [date(2024, 3, 1), date(2024, 1, 31), date(2024, 2, 29)] {
            let cfg = config(start);
            assert_eq!(cfg.calculate_period_number(start), 0);
            assert_eq!(cfg.calculate_period_number(start - chrono::Days::new(1)), 0);
            assert!(!cfg.is_date_in_range(start - chrono::Days::new(1)));
        }
    }

    #[test]
    fn test_period_number_adjusts_for_day_of_month() {
        let cfg = config(date(2024, 3, 15));
        assert_eq!(cfg.calculate_period_number(date(2024, 4, 14)), 0);
        assert_eq!(cfg.calculate_period_number(date(2024, 4, 15)), 1);
        assert_eq!(cfg.calculate_period_number(date(2025, 3, 14)), 11);
        assert_eq!(cfg.calculate_period_number(date(2025, 3, 15)), 12);
    }

    #[test]
    fn test_period_number_disabled() {
        let cfg = PeriodConfiguration::builder(date(2024, 1, 1))
            .include_period(false)
            .build()
            .unwrap();
        assert_eq!(cfg.calculate_period_number(date(2024, 6, 1)), 0);
    }

    #[test]
    fn test_year_number() {
        let cfg = config(date(2022, 6, 10));
        assert_eq!(cfg.calculate_year_number(date(2022, 6, 9)), 0);
        assert_eq!(cfg.calculate_year_number(date(2022, 6, 10)), 1);
        assert_eq!(cfg.calculate_year_number(date(2023, 6, 9)), 1);
        assert_eq!(cfg.calculate_year_number(date(2023, 6, 10)), 2);
    }

    #[test]
    fn test_derived_end_date() {
        assert_eq!(config(date(2024, 3, 1)).end(), Some(date(2025, 2, 28)));
        assert_eq!(config(date(2023, 3, 1)).end(), Some(date(2024, 2, 29)));
        assert_eq!(config(date(2024, 2, 29)).end(), Some(date(2025, 2, 28)));
        assert_eq!(config(date(2024, 1, 1)).end(), Some(date(2024, 12, 31)));
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let result = PeriodConfiguration::builder(date(2024, 3, 1))
            .end(date(2024, 2, 1))
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_date_format_must_render_eight_digits() {
        let result = PeriodConfiguration::builder(date(2024, 3, 1))
            .date_format("%d-%m-%Y")
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));

        let result = PeriodConfiguration::builder(date(2024, 3, 1))
            .date_format("%Y%m%d")
            .build();
        assert!(result.is_ok());

        for unpadded in ["%-d%m%Y", "%e%m%Y", "%d%-m%Y"] {
            let result = PeriodConfiguration::builder(date(2024, 3, 1))
                .date_format(unpadded)
                .build();
            assert!(
                matches!(result, Err(Error::Configuration(_))),
                "{unpadded} accepted"
            );
        }
    }

    #[test]
    fn test_prefix_must_be_file_name_safe() {
        let result = PeriodConfiguration::builder(date(2024, 3, 1))
            .prefix("IMG/2024")
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_range_and_rollover() {
        let cfg = PeriodConfiguration::builder(date(2024, 1, 1))
            .end(date(2024, 12, 31))
            .build()
            .unwrap();
        assert!(cfg.is_date_in_range(date(2024, 12, 31)));
        assert!(!cfg.should_create_new_period(date(2024, 12, 31)));
        assert!(cfg.should_create_new_period(date(2025, 1, 15)));

        let next = cfg.derive_successor().unwrap();
        assert_eq!(next.start(), date(2025, 1, 1));
        assert_eq!(next.end(), Some(date(2025, 12, 31)));
        assert_eq!(next.prefix(), cfg.prefix());
    }

    #[test]
    fn test_open_ended_configuration() {
        let cfg = PeriodConfiguration::builder(date(2024, 1, 1))
            .open_ended()
            .build()
            .unwrap();
        assert!(cfg.is_date_in_range(date(2099, 1, 1)));
        assert!(!cfg.should_create_new_period(date(2099, 1, 1)));
        assert!(matches!(cfg.derive_successor(), Err(Error::SuccessorUndefined)));
    }

    #[test]
    fn test_generate_filename_pattern() {
        let cfg = config(date(2024, 3, 1));
        assert_eq!(
            cfg.generate_filename_pattern(date(2024, 3, 5), 0, None),
            "00 - IMG - 05032024(00)"
        );
        assert_eq!(
            cfg.generate_filename_pattern(date(2024, 5, 2), 3, Some("Beach")),
            "02 - IMG - 02052024(03) - Beach"
        );

        let bare = PeriodConfiguration::builder(date(2024, 3, 1))
            .prefix("")
            .include_period(false)
            .include_sequential(false)
            .build()
            .unwrap();
        assert_eq!(bare.generate_filename_pattern(date(2024, 3, 5), 7, None), "05032024");
    }

    #[test]
    fn test_folder_name() {
        let cfg = config(date(2024, 3, 1));
        assert_eq!(cfg.folder_name(), "00 - IMG - 01032024");
    }

    #[test]
    fn test_parse_date_input() {
        assert_eq!(parse_date_input(" 01/03/2024 ").unwrap(), date(2024, 3, 1));
        assert!(matches!(
            parse_date_input("2024-03-01"),
            Err(Error::InvalidDateInput(_))
        ));
        assert!(parse_date_input("31/02/2024").is_err());
    }

    #[test]
    fn test_parse_event() {
        let (day, text) = parse_event("05/03/2024=Birthday party").unwrap();
        assert_eq!(day, date(2024, 3, 5));
        assert_eq!(text, "Birthday party");

        assert!(matches!(parse_event("05/03/2024"), Err(Error::InvalidDateInput(_))));
        assert!(matches!(parse_event("05/03/2024= "), Err(Error::Configuration(_))));
        assert!(parse_event("2024-03-05=Trip").is_err());
        assert!(matches!(parse_event("05/03/2024=Trip 1/2"), Err(Error::Configuration(_))));
        assert!(matches!(parse_event("05/03/2024=a\\b"), Err(Error::Configuration(_))));
    }
}
