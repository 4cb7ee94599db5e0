//! Library statistics over scanned records.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::types::ImageRecord;

/// How many resolutions the report lists
pub const TOP_RESOLUTIONS: usize = 5;

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatStats {
    pub count: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryReport {
    pub total_images: usize,
    pub total_bytes: u64,
    /// Keyed by the format's display name
    pub formats: BTreeMap<String, FormatStats>,
    /// Most common (width, height) pairs with their counts, most common first
    pub top_resolutions: Vec<((u32, u32), usize)>,
    pub oldest: Option<NaiveDateTime>,
    pub newest: Option<NaiveDateTime>,
    /// Whole days between oldest and newest
    pub span_days: i64,
    /// Only defined when the span is at least one day
    pub photos_per_day: Option<f64>,
}

impl LibraryReport {
    pub fn generate(records: &[ImageRecord]) -> Self {
        let mut formats: BTreeMap<String, FormatStats> = BTreeMap::new();
        let mut resolutions: HashMap<(u32, u32), usize> = HashMap::new();

        for record in records {
            let stats = formats.entry(record.format.to_string()).or_default();
            stats.count += 1;
            stats.bytes += record.size;
            *resolutions.entry(record.dimensions).or_default() += 1;
        }

        let mut top_resolutions: Vec<_> = resolutions.into_iter().collect();
        // Ties fall back to the smaller resolution so the order is stable
        top_resolutions.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        top_resolutions.truncate(TOP_RESOLUTIONS);

        let oldest = records.iter().map(|r| r.preferred_timestamp()).min();
        let newest = records.iter().map(|r| r.preferred_timestamp()).max();
        let span_days = match (oldest, newest) {
            (Some(oldest), Some(newest)) => (newest - oldest).num_days(),
            _ => 0,
        };
        let photos_per_day = (span_days > 0).then(|| records.len() as f64 / span_days as f64);

        Self {
            total_images: records.len(),
            total_bytes: records.iter().map(|r| r.size).sum(),
            formats,
            top_resolutions,
            oldest,
            newest,
            span_days,
            photos_per_day,
        }
    }

    pub fn average_bytes(&self) -> Option<u64> {
        (self.total_images > 0).then(|| self.total_bytes / self.total_images as u64)
    }

    fn percentage(&self, count: usize) -> f64 {
        if self.total_images == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total_images as f64
        }
    }
}

impl fmt::Display for LibraryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_images == 0 {
            return writeln!(f, "No images to report on.");
        }

        writeln!(f, "Formats:")?;
        for (format, stats) in &self.formats {
            writeln!(
                f,
                "  {format}: {} files ({:.1}%) - {:.2} MB",
                stats.count,
                self.percentage(stats.count),
                stats.bytes as f64 / MB
            )?;
        }

        writeln!(f, "Most common resolutions:")?;
        for ((width, height), count) in &self.top_resolutions {
            writeln!(
                f,
                "  {width}x{height}: {count} images ({:.1}%)",
                self.percentage(*count)
            )?;
        }

        writeln!(f, "Totals:")?;
        writeln!(f, "  Images: {}", self.total_images)?;
        writeln!(f, "  Size: {:.2} MB", self.total_bytes as f64 / MB)?;
        if let Some(average) = self.average_bytes() {
            writeln!(f, "  Average size: {:.1} KB", average as f64 / 1024.0)?;
        }

        if let (Some(oldest), Some(newest)) = (self.oldest, self.newest) {
            writeln!(f, "Timeline:")?;
            writeln!(f, "  Oldest: {}", oldest.format("%d/%m/%Y %H:%M"))?;
            writeln!(f, "  Newest: {}", newest.format("%d/%m/%Y %H:%M"))?;
            writeln!(f, "  Span: {} days", self.span_days)?;
            if let Some(rate) = self.photos_per_day {
                writeln!(f, "  Average: {rate:.2} photos/day")?;
            }
        }
        Ok(())
    }
}

/// Records whose preferred timestamp falls on a day in `from..=to`
pub fn search_by_period(records: &[ImageRecord], from: NaiveDate, to: NaiveDate) -> Vec<ImageRecord> {
    records
        .iter()
        .filter(|record| {
            let day = record.preferred_date();
            from <= day && day <= to
        })
        .cloned()
        .collect()
}
