use chrono::{DateTime, Local, NaiveDateTime};
use exif::{In, Reader as ExifReader, Tag, Value};
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::log_scan_error;
use crate::types::{sort_by_preferred_timestamp, ImageFormat, ImageRecord};

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// What an inspector learns about one image file
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    pub format: ImageFormat,
    pub dimensions: (u32, u32),
    pub color_mode: String,
    pub captured: Option<NaiveDateTime>,
    /// Pixel digest, when the inspector computed it from its own decode
    pub content_hash: Option<String>,
}

/// Reads format, dimensions and capture time of an image file.
/// An error means the file is not a readable image and is skipped.
pub trait ImageInspector {
    fn inspect(&self, path: &Path) -> Result<ImageMetadata>;
}

/// Digests the pixel content of an image file
pub trait ContentHasher {
    fn content_hash(&self, path: &Path) -> Result<String>;
}

/// Inspector backed by the `image` decoder and embedded EXIF data
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodedImageInspector {
    hash_pixels: bool,
}

impl DecodedImageInspector {
    /// Inspector that also digests the pixels it decoded, so the scan does
    /// not decode each file a second time for hashing
    pub fn hashing_pixels() -> Self {
        Self { hash_pixels: true }
    }
}

impl ImageInspector for DecodedImageInspector {
    fn inspect(&self, path: &Path) -> Result<ImageMetadata> {
        let reader = image::io::Reader::open(path)?.with_guessed_format()?;
        let format = match reader.format() {
            Some(format) => ImageFormat::from(format),
            None => ImageFormat::from_path(path)
                .unwrap_or_else(|| ImageFormat::Other("unknown".to_string())),
        };
        let image = reader.decode()?;

        Ok(ImageMetadata {
            format,
            dimensions: (image.width(), image.height()),
            color_mode: format!("{:?}", image.color()),
            captured: read_capture_time(path),
            content_hash: self.hash_pixels.then(|| pixel_digest(&image)),
        })
    }
}

/// Blake3 digest of the decoded RGB8 pixels, so re-encoded copies of the
/// same picture hash alike
#[derive(Debug, Default, Clone, Copy)]
pub struct PixelHasher;

impl ContentHasher for PixelHasher {
    fn content_hash(&self, path: &Path) -> Result<String> {
        Ok(pixel_digest(&image::open(path)?))
    }
}

fn pixel_digest(image: &DynamicImage) -> String {
    let pixels = image.to_rgb8();
    let mut hasher = blake3::Hasher::new();
    hasher.update(&pixels.width().to_le_bytes());
    hasher.update(&pixels.height().to_le_bytes());
    hasher.update(pixels.as_raw());
    hasher.finalize().to_hex().to_string()
}

/// Read the EXIF `DateTimeOriginal` tag, falling back to `DateTime`
pub fn read_capture_time(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = ExifReader::new().read_from_container(&mut reader).ok()?;

    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))?;

    match &field.value {
        Value::Ascii(values) => {
            let raw = values.first()?;
            let text = String::from_utf8_lossy(raw);
            NaiveDateTime::parse_from_str(text.trim(), EXIF_DATETIME_FORMAT).ok()
        }
        _ => None,
    }
}

/// Scan `directory` for images and build one record per readable file.
///
/// File paths in the records are relative to `directory`. The duplicates
/// and backups folders are never entered. Files the inspector rejects are
/// skipped. A digest from the inspector is used as is; otherwise `hasher`
/// runs, and files it cannot hash keep `content_hash: None`. The result is
/// sorted by preferred timestamp, oldest first.
pub fn scan_directory(
    directory: &Path,
    config: &Config,
    inspector: &dyn ImageInspector,
    hasher: &dyn ContentHasher,
) -> Result<Vec<ImageRecord>> {
    if !directory.is_dir() {
        return Err(Error::FileNotFound(directory.to_path_buf()));
    }

    let candidates = discover_image_paths(directory, config);
    info!(
        "Found {} candidate images in {}",
        candidates.len(),
        directory.display()
    );

    let progress = if config.show_progress {
        let bar = ProgressBar::new(candidates.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{wide_bar} {pos}/{len} ({percent}%) | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░ "),
        );
        bar.set_message("Scanning");
        Some(bar)
    } else {
        None
    };

    let mut records = Vec::with_capacity(candidates.len());
    for path in candidates {
        if let Some(bar) = &progress {
            bar.inc(1);
        }
        match build_record(directory, &path, inspector, hasher) {
            Ok(record) => records.push(record),
            Err(e) => log_scan_error(&path, &e),
        }
    }

    if let Some(bar) = progress {
        bar.finish_with_message(format!("Scanned {} images", records.len()));
    }

    sort_by_preferred_timestamp(&mut records);
    Ok(records)
}

/// Image paths under `directory`, honoring scan depth, reserved folders
/// and the unsupported-format switch
pub fn discover_image_paths(directory: &Path, config: &Config) -> Vec<PathBuf> {
    let reserved = config.reserved_folders();
    let mut paths: Vec<PathBuf> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(config.max_depth)
        .into_iter()
        .filter_entry(|entry| !is_reserved(entry, &reserved))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            is_image_path(path) || (config.process_unsupported_formats && has_extension(path))
        })
        .collect();
    paths.sort();
    paths
}

fn is_reserved(entry: &DirEntry, reserved: &[&str]) -> bool {
    entry.depth() == 1
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| reserved.contains(&name))
            .unwrap_or(false)
}

fn has_extension(path: &Path) -> bool {
    path.extension().map(|ext| !ext.is_empty()).unwrap_or(false)
}

fn build_record(
    directory: &Path,
    path: &Path,
    inspector: &dyn ImageInspector,
    hasher: &dyn ContentHasher,
) -> Result<ImageRecord> {
    let metadata = fs::metadata(path)?;
    let modified: DateTime<Local> = metadata.modified()?.into();
    let mut inspected = inspector.inspect(path)?;
    let hash = match inspected.content_hash.take() {
        Some(hash) => Ok(hash),
        None => hasher.content_hash(path),
    };

    let relative = path.strip_prefix(directory).unwrap_or(path);
    let mut record = ImageRecord::new(relative, modified.naive_local())
        .with_size(metadata.len())
        .with_dimensions(inspected.dimensions.0, inspected.dimensions.1)
        .with_format(inspected.format, inspected.color_mode);
    if let Some(captured) = inspected.captured {
        record = record.with_capture_time(captured);
    }

    match hash {
        Ok(hash) => record = record.with_content_hash(hash),
        Err(e) => {
            debug!("No content hash for {}", path.display());
            log_scan_error(path, &e);
        }
    }
    Ok(record)
}

/// Returns if the given path has a supported image extension
pub fn is_image_path(path: &Path) -> bool {
    match ImageFormat::from_path(path) {
        Some(format) => format.is_supported(),
        None => false,
    }
}

// -- Tests --
