//! Pre-commit snapshots of a directory's contents.
//!
//! A manifest lists every regular file of the directory (name, size and
//! modification time) so an interrupted batch can be untangled by hand.

use chrono::{DateTime, Local};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::logging::log_fs_modification;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Operation name used for backups requested directly by the user
pub const MANUAL_BACKUP: &str = "manual";

/// One file as it was when the manifest was taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub size: u64,
    /// RFC 3339 modification time
    pub modified: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub operation: String,
    /// RFC 3339 time the manifest was taken
    pub timestamp: String,
    pub directory: PathBuf,
    pub files: Vec<ManifestEntry>,
}

impl BackupManifest {
    /// Snapshot the regular files directly inside `directory`.
    /// Manifest files themselves (`.json`) are left out.
    pub fn capture(directory: &Path, operation: &str) -> Result<Self> {
        if !directory.is_dir() {
            return Err(Error::FileNotFound(directory.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || has_json_extension(&path) {
                continue;
            }

            match entry.metadata().and_then(|m| Ok((m.len(), m.modified()?))) {
                Ok((size, modified)) => files.push(ManifestEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    size,
                    modified: DateTime::<Local>::from(modified).to_rfc3339(),
                }),
                Err(e) => warn!("Leaving {} out of the manifest: {}", path.display(), e),
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            operation: operation.to_string(),
            timestamp: Local::now().to_rfc3339(),
            directory: directory.to_path_buf(),
            files,
        })
    }
}

/// Writes a snapshot of a directory before it is modified
pub trait ManifestWriter {
    /// Returns the path of the written manifest
    fn write_manifest(&self, directory: &Path, operation: &str) -> Result<PathBuf>;
}

/// Writes pretty-printed JSON manifests into a subfolder of the directory
#[derive(Debug, Clone)]
pub struct JsonManifestWriter {
    folder: String,
}

impl JsonManifestWriter {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
        }
    }
}

impl ManifestWriter for JsonManifestWriter {
    fn write_manifest(&self, directory: &Path, operation: &str) -> Result<PathBuf> {
        let manifest = BackupManifest::capture(directory, operation)?;

        let backup_dir = directory.join(&self.folder);
        fs::create_dir_all(&backup_dir)?;

        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let mut path = backup_dir.join(format!("backup_{operation}_{stamp}.json"));
        let mut attempt = 1;
        while path.exists() {
            path = backup_dir.join(format!("backup_{operation}_{stamp}_{attempt}.json"));
            attempt += 1;
        }

        let file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, &manifest)?;

        log_fs_modification(
            "backup",
            &path,
            Some(format!("{} files listed", manifest.files.len()).as_str()),
        );
        info!("Backup manifest written to {}", path.display());
        Ok(path)
    }
}

/// Read a manifest back from disk
pub fn load_manifest(path: &Path) -> Result<BackupManifest> {
    let file = fs::File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
