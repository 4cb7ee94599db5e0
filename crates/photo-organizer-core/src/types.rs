use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::naming::grammar::is_file_name_safe;

/// Day-month-year key used to look up events, e.g. `05032024`
pub const EVENT_KEY_FORMAT: &str = "%d%m%Y";

/// Supported image formats
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
    Tiff,
    Heic,
    Other(String),
}

impl ImageFormat {
    /// Determine format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "webp" => Self::Webp,
            "tif" | "tiff" => Self::Tiff,
            "heic" => Self::Heic,
            other => Self::Other(other.to_string()),
        }
    }

    /// Determine format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
    }

    /// Check if format is supported
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<image::ImageFormat> for ImageFormat {
    fn from(format: image::ImageFormat) -> Self {
        match format {
            image::ImageFormat::Jpeg => Self::Jpeg,
            image::ImageFormat::Png => Self::Png,
            image::ImageFormat::Gif => Self::Gif,
            image::ImageFormat::Bmp => Self::Bmp,
            image::ImageFormat::WebP => Self::Webp,
            image::ImageFormat::Tiff => Self::Tiff,
            other => Self::Other(format!("{other:?}").to_lowercase()),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "JPEG"),
            Self::Png => write!(f, "PNG"),
            Self::Gif => write!(f, "GIF"),
            Self::Bmp => write!(f, "BMP"),
            Self::Webp => write!(f, "WEBP"),
            Self::Tiff => write!(f, "TIFF"),
            Self::Heic => write!(f, "HEIC"),
            Self::Other(name) => write!(f, "{}", name.to_uppercase()),
        }
    }
}

/// Metadata for one image file in the organized directory.
///
/// Two records are equal when both carry the same non-empty content hash;
/// the file name takes no part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Path relative to the scanned directory
    pub file: PathBuf,

    /// Image format
    pub format: ImageFormat,

    /// Pixel dimensions (width, height)
    pub dimensions: (u32, u32),

    /// Color mode reported by the decoder, e.g. `Rgb8`
    pub color_mode: String,

    /// File size in bytes
    pub size: u64,

    /// Filesystem modification timestamp
    pub modified: NaiveDateTime,

    /// Embedded capture timestamp, if the file carries one
    pub captured: Option<NaiveDateTime>,

    /// Digest of the pixel content; absent when hashing failed
    pub content_hash: Option<String>,
}

impl ImageRecord {
    /// Create a record with only the fields every file has
    pub fn new(file: impl Into<PathBuf>, modified: NaiveDateTime) -> Self {
        let file = file.into();
        let format = ImageFormat::from_path(&file)
            .unwrap_or_else(|| ImageFormat::Other("unknown".to_string()));
        Self {
            file,
            format,
            dimensions: (0, 0),
            color_mode: "unknown".to_string(),
            size: 0,
            modified,
            captured: None,
            content_hash: None,
        }
    }

    pub fn with_capture_time(mut self, captured: NaiveDateTime) -> Self {
        self.captured = Some(captured);
        self
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = (width, height);
        self
    }

    pub fn with_format(mut self, format: ImageFormat, color_mode: impl Into<String>) -> Self {
        self.format = format;
        self.color_mode = color_mode.into();
        self
    }

    /// Capture time if present, else modification time
    pub fn preferred_timestamp(&self) -> NaiveDateTime {
        self.captured.unwrap_or(self.modified)
    }

    /// Calendar day of the preferred timestamp
    pub fn preferred_date(&self) -> NaiveDate {
        self.preferred_timestamp().date()
    }

    /// Final path component as a string
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension including the leading dot, or an empty string
    pub fn extension(&self) -> String {
        self.file
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }

    /// Returns a non-empty content hash
    pub fn hash(&self) -> Option<&str> {
        self.content_hash.as_deref().filter(|hash| !hash.is_empty())
    }

    /// Copy of this record living at a new relative path
    pub fn relocated(&self, file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ..self.clone()
        }
    }
}

impl PartialEq for ImageRecord {
    fn eq(&self, other: &Self) -> bool {
        match (self.hash(), other.hash()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Sort records ascending by preferred timestamp, keeping input order for ties
pub fn sort_by_preferred_timestamp(records: &mut [ImageRecord]) {
    records.sort_by_key(|record| record.preferred_timestamp());
}

/// Records sharing one content hash; always holds at least two records
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub hash: String,
    pub records: Vec<ImageRecord>,
}

impl DuplicateGroup {
    /// The record that stays in place
    pub fn retained(&self) -> &ImageRecord {
        &self.records[0]
    }

    /// Every record after the first
    pub fn redundant(&self) -> &[ImageRecord] {
        &self.records[1..]
    }
}

/// Free-text event descriptions keyed by day (`DDMMYYYY`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMap {
    events: BTreeMap<String, String>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key used for a calendar day
    pub fn key_for(date: NaiveDate) -> String {
        date.format(EVENT_KEY_FORMAT).to_string()
    }

    /// Register an event for a calendar day, replacing any previous one.
    /// Blank descriptions are ignored; text that cannot be part of a file
    /// name is rejected.
    pub fn insert_date(&mut self, date: NaiveDate, description: impl Into<String>) -> Result<()> {
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Ok(());
        }
        if !is_file_name_safe(&description) {
            return Err(Error::Configuration(format!(
                "event '{}' cannot be used in a file name",
                description.escape_debug()
            )));
        }
        self.events.insert(Self::key_for(date), description);
        Ok(())
    }

    pub fn event_for(&self, date: NaiveDate) -> Option<&str> {
        self.events.get(&Self::key_for(date)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.events.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
