//! Batches of file moves and the single primitive that carries them out.
//!
//! Every organizing operation first builds a [`BatchPlan`]. The plan is
//! executed either as a simulation, which touches nothing, or as a commit.
//! Both run the same code path and only differ in whether filesystem calls
//! are made, so a preview predicts the commit exactly.

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{log_file_error, log_fs_modification};
use crate::types::ImageRecord;

/// Which organizing operation a batch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operation {
    MoveDuplicates,
    Rename,
    OrganizeByYear,
    OrganizeByEvent,
    OrganizeByPeriod,
}

impl Operation {
    /// Short name used in backup manifests
    pub fn name(&self) -> &'static str {
        match self {
            Self::MoveDuplicates => "move_duplicates",
            Self::Rename => "rename_images",
            Self::OrganizeByYear => "organize_years",
            Self::OrganizeByEvent => "organize_events",
            Self::OrganizeByPeriod => "organize_periods",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether filesystem effects are performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionMode {
    Simulate,
    Commit,
}

impl ExecutionMode {
    pub fn from_simulate(simulate: bool) -> Self {
        if simulate {
            Self::Simulate
        } else {
            Self::Commit
        }
    }
}

/// One planned move, target relative to the batch's source directory
#[derive(Debug, Clone)]
pub struct Relocation {
    pub record: ImageRecord,
    pub target: PathBuf,
}

/// Moves sharing a destination label (folder, hash or day)
#[derive(Debug, Clone)]
pub struct PlanGroup {
    pub label: String,
    pub relocations: Vec<Relocation>,
}

/// Grouping computed for an operation, not yet executed
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub operation: Operation,
    pub source_dir: PathBuf,
    pub groups: Vec<PlanGroup>,
    /// Records the strategy left where they are
    pub unassigned: Vec<ImageRecord>,
}

impl BatchPlan {
    pub fn new(operation: Operation, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            operation,
            source_dir: source_dir.into(),
            groups: Vec::new(),
            unassigned: Vec::new(),
        }
    }

    /// Total number of planned moves
    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.relocations.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn relocations(&self) -> impl Iterator<Item = &Relocation> {
        self.groups.iter().flat_map(|group| group.relocations.iter())
    }

    /// Execute the plan. Individual failures are recorded, never raised.
    pub fn execute(&self, mode: ExecutionMode) -> BatchReport {
        info!(
            "{} {}: {} moves in {} groups",
            match mode {
                ExecutionMode::Simulate => "Simulating",
                ExecutionMode::Commit => "Executing",
            },
            self.operation,
            self.len(),
            self.groups.len()
        );

        let mut view = Occupancy::default();
        let mut report = BatchReport {
            operation: self.operation,
            mode,
            folders_created: Vec::new(),
            moves: Vec::with_capacity(self.len()),
            records: Vec::with_capacity(self.len() + self.unassigned.len()),
        };

        for group in &self.groups {
            debug!("Group '{}': {} files", group.label, group.relocations.len());
            for relocation in &group.relocations {
                let (outcome, record) = self.relocate(relocation, mode, &mut view, &mut report);
                report.moves.push(MoveRecord {
                    source: relocation.record.file.clone(),
                    target: relocation.target.clone(),
                    outcome,
                });
                report.records.push(record);
            }
        }
        report.records.extend(self.unassigned.iter().cloned());

        info!(
            "{} finished: {} moved, {} skipped, {} failed",
            self.operation,
            report.moved(),
            report.skipped(),
            report.failed()
        );
        report
    }

    fn relocate(
        &self,
        relocation: &Relocation,
        mode: ExecutionMode,
        view: &mut Occupancy,
        report: &mut BatchReport,
    ) -> (MoveOutcome, ImageRecord) {
        let record = &relocation.record;
        let source = self.source_dir.join(&record.file);
        let target = self.source_dir.join(&relocation.target);

        if view.occupied(&target) {
            warn!(
                "Skipping {}: {} already exists",
                record.file.display(),
                target.display()
            );
            return (MoveOutcome::SkippedExisting, record.clone());
        }

        if !view.present(&source) {
            let reason = format!("source file {} not found", source.display());
            warn!("Cannot move {}: {}", record.file.display(), reason);
            return (MoveOutcome::Failed(reason), record.clone());
        }

        if let Some(folder) = target.parent() {
            if !view.is_dir(folder) {
                if mode == ExecutionMode::Commit {
                    if let Err(e) = fs::create_dir_all(folder) {
                        log_file_error(folder, "create_dir", &e);
                        return (MoveOutcome::Failed(e.to_string()), record.clone());
                    }
                    log_fs_modification("create_dir", folder, None);
                }
                view.created_dirs.insert(folder.to_path_buf());
                report.folders_created.push(relative_to(&self.source_dir, folder));
            }
        }

        if mode == ExecutionMode::Commit {
            if let Err(e) = fs::rename(&source, &target) {
                log_file_error(&source, "move", &e);
                return (MoveOutcome::Failed(e.to_string()), record.clone());
            }
            log_fs_modification(
                "move",
                &source,
                Some(format!("to {}", target.display()).as_str()),
            );
        } else {
            debug!("Would move {} -> {}", source.display(), target.display());
        }

        view.vacated.insert(source.clone());
        view.vacated.remove(&target);
        view.claimed.insert(target);
        view.claimed.remove(&source);

        let updated = match mode {
            ExecutionMode::Commit => record.relocated(&relocation.target),
            ExecutionMode::Simulate => record.clone(),
        };
        (MoveOutcome::Moved, updated)
    }
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}

/// The directory as it will look after the moves made so far in this batch.
/// Keeps simulated runs in step with what a commit would find on disk.
#[derive(Debug, Default)]
struct Occupancy {
    claimed: HashSet<PathBuf>,
    vacated: HashSet<PathBuf>,
    created_dirs: HashSet<PathBuf>,
}

impl Occupancy {
    fn occupied(&self, path: &Path) -> bool {
        self.claimed.contains(path) || (!self.vacated.contains(path) && path.exists())
    }

    fn present(&self, path: &Path) -> bool {
        self.claimed.contains(path) || (!self.vacated.contains(path) && path.is_file())
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.created_dirs.contains(path) || path.is_dir()
    }
}

/// Result of a single planned move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MoveOutcome {
    /// Moved, or would be moved when simulating
    Moved,
    /// A file with the target name already exists
    SkippedExisting,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveRecord {
    pub source: PathBuf,
    pub target: PathBuf,
    pub outcome: MoveOutcome,
}

/// Structured result of executing a plan
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub operation: Operation,
    pub mode: ExecutionMode,
    /// Folders created (or that would be created), relative to the source directory
    pub folders_created: Vec<PathBuf>,
    pub moves: Vec<MoveRecord>,
    /// Every record of the plan; moved ones carry their new path after a commit
    pub records: Vec<ImageRecord>,
}

impl BatchReport {
    pub fn moved(&self) -> usize {
        self.count(|outcome| matches!(outcome, MoveOutcome::Moved))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, MoveOutcome::SkippedExisting))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, MoveOutcome::Failed(_)))
    }

    pub fn is_simulation(&self) -> bool {
        self.mode == ExecutionMode::Simulate
    }

    fn count(&self, predicate: impl Fn(&MoveOutcome) -> bool) -> usize {
        self.moves.iter().filter(|m| predicate(&m.outcome)).count()
    }
}

/// A planned batch that has not been previewed yet
#[derive(Debug, Clone)]
pub struct PendingBatch {
    plan: BatchPlan,
}

impl PendingBatch {
    pub fn new(plan: BatchPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    /// Run the batch as a simulation; the only way to reach a commit
    pub fn preview(self) -> PreviewedBatch {
        let report = self.plan.execute(ExecutionMode::Simulate);
        PreviewedBatch {
            plan: self.plan,
            report,
        }
    }
}

/// A batch whose simulation has been produced and can now be committed
#[derive(Debug, Clone)]
pub struct PreviewedBatch {
    plan: BatchPlan,
    report: BatchReport,
}

impl PreviewedBatch {
    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    /// The simulation report
    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    /// Perform the moves
    pub fn commit(self) -> BatchReport {
        self.plan.execute(ExecutionMode::Commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn record(name: &str) -> ImageRecord {
        let modified = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ImageRecord::new(name, modified)
    }

    fn touch(dir: &Path, name: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        file.write_all(b"DUMMY IMAGE DATA").unwrap();
    }

    fn plan_into(dir: &Path, folder: &str, names: &[&str]) -> BatchPlan {
        let mut plan = BatchPlan::new(Operation::OrganizeByYear, dir);
        plan.groups.push(PlanGroup {
            label: folder.to_string(),
            relocations: names
                .iter()
                .map(|name| Relocation {
                    record: record(name),
                    target: Path::new(folder).join(name),
                })
                .collect(),
        });
        plan
    }

    #[test]
    fn test_simulation_touches_nothing() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "b.jpg");

        let report = plan_into(dir.path(), "Year 2024", &["a.jpg", "b.jpg"])
            .execute(ExecutionMode::Simulate);

        assert_eq!(report.moved(), 2);
        assert_eq!(report.folders_created, vec![PathBuf::from("Year 2024")]);
        assert!(!dir.path().join("Year 2024").exists());
        assert!(dir.path().join("a.jpg").exists());
        assert_eq!(report.records[0].file, PathBuf::from("a.jpg"));
    }

    #[test]
    fn test_commit_moves_and_updates_records() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.jpg");

        let report = plan_into(dir.path(), "Year 2024", &["a.jpg"]).execute(ExecutionMode::Commit);

        assert_eq!(report.moved(), 1);
        assert!(dir.path().join("Year 2024/a.jpg").exists());
        assert!(!dir.path().join("a.jpg").exists());
        assert_eq!(report.records[0].file, Path::new("Year 2024").join("a.jpg"));
    }

    #[test]
    fn test_collision_is_skipped_not_failed() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        fs::create_dir(dir.path().join("Year 2024")).unwrap();
        touch(&dir.path().join("Year 2024"), "a.jpg");

        let plan = plan_into(dir.path(), "Year 2024", &["a.jpg"]);
        let preview = plan.execute(ExecutionMode::Simulate);
        let commit = plan.execute(ExecutionMode::Commit);

        for report in [&preview, &commit] {
            assert_eq!(report.moved(), 0);
            assert_eq!(report.skipped(), 1);
            assert_eq!(report.failed(), 0);
            assert!(report.folders_created.is_empty());
        }
        assert!(dir.path().join("a.jpg").exists());
    }

    #[test]
    fn test_missing_source_fails_without_aborting() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.jpg");

        let plan = plan_into(dir.path(), "out", &["missing.jpg", "b.jpg"]);
        let preview = plan.execute(ExecutionMode::Simulate);
        let commit = plan.execute(ExecutionMode::Commit);

        for report in [&preview, &commit] {
            assert_eq!(report.failed(), 1);
            assert_eq!(report.moved(), 1);
        }
        assert!(dir.path().join("out/b.jpg").exists());
    }

    #[test]
    fn test_preview_then_commit() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.jpg");

        let previewed = PendingBatch::new(plan_into(dir.path(), "x", &["a.jpg"])).preview();
        assert!(previewed.report().is_simulation());
        assert_eq!(previewed.report().moved(), 1);

        let committed = previewed.commit();
        assert!(!committed.is_simulation());
        assert_eq!(committed.moved(), 1);
        assert!(dir.path().join("x/a.jpg").exists());
    }
}
