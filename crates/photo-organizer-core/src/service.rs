//! Orchestration of scanning, classification and the organizing batches.

use log::info;
use std::path::{Path, PathBuf};

use crate::backup::{JsonManifestWriter, ManifestWriter, MANUAL_BACKUP};
use crate::config::Config;
use crate::deduplication::DuplicateDetector;
use crate::discovery::{scan_directory, ContentHasher, DecodedImageInspector, ImageInspector, PixelHasher};
use crate::error::{Error, Result};
use crate::naming::FilenamePatternGenerator;
use crate::organize::{BatchReport, FolderOrganizer, PendingBatch, PreviewedBatch};
use crate::period::PeriodConfiguration;
use crate::rename::plan_renames;
use crate::report::LibraryReport;
use crate::types::{sort_by_preferred_timestamp, EventMap, ImageRecord};

/// A scan split by whether file names already follow the naming scheme
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub unorganized: Vec<ImageRecord>,
    pub organized: Vec<ImageRecord>,
}

impl Analysis {
    pub fn total(&self) -> usize {
        self.unorganized.len() + self.organized.len()
    }

    /// Every record, oldest first
    pub fn all(&self) -> Vec<ImageRecord> {
        let mut records: Vec<_> = self
            .unorganized
            .iter()
            .chain(&self.organized)
            .cloned()
            .collect();
        sort_by_preferred_timestamp(&mut records);
        records
    }
}

/// Result of a committed batch
#[derive(Debug, Clone)]
pub struct CommitResult {
    pub report: BatchReport,
    /// Manifest written before the moves, if any
    pub manifest: Option<PathBuf>,
}

pub struct OrganizationService {
    config: Config,
    detector: DuplicateDetector,
    organizer: FolderOrganizer,
    inspector: Box<dyn ImageInspector>,
    hasher: Box<dyn ContentHasher>,
    manifests: Box<dyn ManifestWriter>,
}

impl OrganizationService {
    /// Service with the decoding inspector, pixel hasher and JSON manifests
    pub fn new(config: Config) -> Result<Self> {
        let manifests = JsonManifestWriter::new(config.backup_dir.clone());
        Self::with_collaborators(
            config,
            Box::new(DecodedImageInspector::hashing_pixels()),
            Box::new(PixelHasher),
            Box::new(manifests),
        )
    }

    pub fn with_collaborators(
        config: Config,
        inspector: Box<dyn ImageInspector>,
        hasher: Box<dyn ContentHasher>,
        manifests: Box<dyn ManifestWriter>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: DuplicateDetector::new(config.duplicates_dir.clone()),
            organizer: FolderOrganizer::new(config.year_folder_label.clone()),
            config,
            inspector,
            hasher,
            manifests,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn detector(&self) -> &DuplicateDetector {
        &self.detector
    }

    pub fn organizer(&self) -> &FolderOrganizer {
        &self.organizer
    }

    /// Records for every readable image in `dir`, oldest first
    pub fn scan(&self, dir: &Path) -> Result<Vec<ImageRecord>> {
        scan_directory(dir, &self.config, self.inspector.as_ref(), self.hasher.as_ref())
    }

    /// Generator for the period's separator, or the configured default
    pub fn generator(&self, period: Option<&PeriodConfiguration>) -> Result<FilenamePatternGenerator> {
        match period {
            Some(period) => FilenamePatternGenerator::for_configuration(period),
            None => FilenamePatternGenerator::new(&self.config.naming.separator),
        }
    }

    /// Split records into organized and unorganized, each oldest first
    pub fn classify(&self, records: Vec<ImageRecord>, generator: &FilenamePatternGenerator) -> Analysis {
        let (mut organized, mut unorganized): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|record| generator.is_organized(&record.file_name()));
        sort_by_preferred_timestamp(&mut organized);
        sort_by_preferred_timestamp(&mut unorganized);
        Analysis {
            unorganized,
            organized,
        }
    }

    pub fn analyze(&self, dir: &Path, period: Option<&PeriodConfiguration>) -> Result<Analysis> {
        let generator = self.generator(period)?;
        let analysis = self.classify(self.scan(dir)?, &generator);
        info!(
            "Analyzed {}: {} images, {} already organized",
            dir.display(),
            analysis.total(),
            analysis.organized.len()
        );
        Ok(analysis)
    }

    pub fn plan_duplicates(&self, records: &[ImageRecord], dir: &Path) -> PendingBatch {
        let groups = self.detector.find_duplicates(records);
        PendingBatch::new(self.detector.plan_moves(&groups, dir))
    }

    /// Rename `records`; `organized` are names already in the scheme whose
    /// sequence numbers must not be reused
    pub fn plan_rename(
        &self,
        period: Option<&PeriodConfiguration>,
        records: &[ImageRecord],
        organized: &[ImageRecord],
        events: Option<&EventMap>,
        dir: &Path,
    ) -> Result<PendingBatch> {
        let period = require(period, "renaming needs a period start date")?;
        let generator = FilenamePatternGenerator::for_configuration(period)?;
        Ok(PendingBatch::new(plan_renames(
            &generator, period, records, organized, events, dir,
        )))
    }

    pub fn plan_by_year(&self, records: &[ImageRecord], dir: &Path) -> PendingBatch {
        PendingBatch::new(self.organizer.plan_by_year(records, dir))
    }

    pub fn plan_by_event(
        &self,
        period: Option<&PeriodConfiguration>,
        records: &[ImageRecord],
        dir: &Path,
    ) -> Result<PendingBatch> {
        let generator = self.generator(period)?;
        Ok(PendingBatch::new(
            self.organizer.plan_by_event(&generator, records, dir),
        ))
    }

    pub fn plan_by_period(
        &self,
        period: Option<&PeriodConfiguration>,
        records: &[ImageRecord],
        dir: &Path,
    ) -> Result<PendingBatch> {
        let period = require(period, "organizing by period needs a period start date")?;
        Ok(PendingBatch::new(
            self.organizer.plan_by_period(period, records, dir)?,
        ))
    }

    /// Commit a previewed batch, writing the backup manifest first when
    /// configured. A failed manifest leaves the directory untouched.
    pub fn commit(&self, batch: PreviewedBatch) -> Result<CommitResult> {
        let plan = batch.plan();
        let manifest = if self.config.backup_before_commit && !plan.is_empty() {
            Some(
                self.manifests
                    .write_manifest(&plan.source_dir, plan.operation.name())?,
            )
        } else {
            None
        };

        let report = batch.commit();
        info!(
            "{} committed: {} moved, {} skipped, {} failed",
            report.operation,
            report.moved(),
            report.skipped(),
            report.failed()
        );
        Ok(CommitResult { report, manifest })
    }

    pub fn create_manual_backup(&self, dir: &Path) -> Result<PathBuf> {
        self.manifests.write_manifest(dir, MANUAL_BACKUP)
    }

    pub fn report(&self, records: &[ImageRecord]) -> LibraryReport {
        LibraryReport::generate(records)
    }
}

fn require<'a>(
    period: Option<&'a PeriodConfiguration>,
    what: &str,
) -> Result<&'a PeriodConfiguration> {
    period.ok_or_else(|| Error::MissingConfiguration(what.to_string()))
}
