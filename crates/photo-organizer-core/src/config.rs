use chrono::NaiveDate;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::deduplication::DEFAULT_DUPLICATES_FOLDER;
use crate::error::{Error, Result};
use crate::organize::DEFAULT_YEAR_LABEL;
use crate::period::{
    PeriodConfiguration, DEFAULT_DATE_FORMAT, DEFAULT_PREFIX, DEFAULT_SEPARATOR,
};

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// Naming options used when a period configuration is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingDefaults {
    /// Prefix placed after the period number
    pub prefix: String,

    /// Separator between name components
    pub separator: String,

    /// Whether names start with a period number
    pub include_period: bool,

    /// Whether names carry a same-day sequence number
    pub include_sequential: bool,

    /// strftime template rendering the eight-digit date
    pub date_format: String,
}

impl Default for NamingDefaults {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            include_period: true,
            include_sequential: true,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

/// Configuration for the photo organizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Subfolder of the scanned directory receiving duplicates
    pub duplicates_dir: String,

    /// Subfolder of the scanned directory receiving backup manifests
    pub backup_dir: String,

    /// Whether to write a backup manifest before every commit
    pub backup_before_commit: bool,

    /// Maximum directory depth for scanning (1 = the folder itself)
    pub max_depth: usize,

    /// Whether to process unsupported image formats
    pub process_unsupported_formats: bool,

    /// Whether to draw a progress bar while scanning
    pub show_progress: bool,

    /// Label of year folders, e.g. `Year` for `Year 2024`
    pub year_folder_label: String,

    /// Naming options for new period configurations
    pub naming: NamingDefaults,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duplicates_dir: DEFAULT_DUPLICATES_FOLDER.to_string(),
            backup_dir: "backups".to_string(),
            backup_before_commit: true,
            max_depth: 1,
            process_unsupported_formats: false,
            show_progress: true,
            year_folder_label: DEFAULT_YEAR_LABEL.to_string(),
            naming: NamingDefaults::default(),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("duplicates_dir", &self.duplicates_dir),
            ("backup_dir", &self.backup_dir),
        ] {
            if value.trim().is_empty() || value.contains(['/', '\\']) {
                return Err(Error::Configuration(format!(
                    "{name} must be a plain folder name, got '{value}'"
                )));
            }
        }

        if self.duplicates_dir == self.backup_dir {
            return Err(Error::Configuration(
                "Duplicates and backups cannot share a folder".to_string(),
            ));
        }

        if self.max_depth == 0 {
            return Err(Error::Configuration(
                "Scan depth must be at least 1".to_string(),
            ));
        }

        // Surfaces separator and date template problems early
        self.period_configuration(NaiveDate::default(), None).map(|_| ())
    }

    /// Build a period configuration from the naming defaults.
    /// Without `end`, the period spans one year.
    pub fn period_configuration(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<PeriodConfiguration> {
        let mut builder = PeriodConfiguration::builder(start)
            .prefix(self.naming.prefix.clone())
            .separator(self.naming.separator.clone())
            .include_period(self.naming.include_period)
            .include_sequential(self.naming.include_sequential)
            .date_format(self.naming.date_format.clone());
        if let Some(end) = end {
            builder = builder.end(end);
        }
        builder.build()
    }

    /// Folders inside the scanned directory that the organizer owns
    pub fn reserved_folders(&self) -> [&str; 2] {
        [self.duplicates_dir.as_str(), self.backup_dir.as_str()]
    }
}
