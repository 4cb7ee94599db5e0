#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

use photo_organizer_core::{Config, ImageRecord, PeriodConfiguration};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
}

/// Record named `name` last modified at `timestamp`
pub fn record(name: &str, timestamp: NaiveDateTime) -> ImageRecord {
    ImageRecord::new(name, timestamp)
}

/// One-year period starting on the given day with default naming
pub fn period(start: NaiveDate) -> PeriodConfiguration {
    PeriodConfiguration::builder(start).build().unwrap()
}

/// Default configuration without a progress bar
pub fn quiet_config() -> Config {
    Config {
        show_progress: false,
        ..Default::default()
    }
}

/// Write a small solid-color PNG
pub fn write_png(dir: &Path, name: &str, rgb: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_pixel(8, 6, image::Rgb(rgb))
        .save(&path)
        .unwrap();
    path
}

/// Names of the regular files directly inside `dir`, sorted
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
