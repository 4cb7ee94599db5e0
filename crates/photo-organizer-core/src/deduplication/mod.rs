use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::organize::{BatchPlan, BatchReport, ExecutionMode, Operation, PlanGroup, Relocation};
use crate::types::{DuplicateGroup, ImageRecord};

pub const DEFAULT_DUPLICATES_FOLDER: &str = "duplicates";

/// Finds exact duplicates by content hash and sets the extra copies aside
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    folder: String,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATES_FOLDER)
    }
}

impl DuplicateDetector {
    /// `folder` is the subfolder of the source directory receiving duplicates
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Group records by content hash.
    ///
    /// Records without a hash are ignored and only groups of two or more are
    /// returned. Groups appear in the order their first record appears in
    /// `records`, and each group keeps input order, so with records sorted
    /// oldest first the first entry of a group is the oldest copy.
    pub fn find_duplicates(&self, records: &[ImageRecord]) -> Vec<DuplicateGroup> {
        let mut order: Vec<&str> = Vec::new();
        let mut by_hash: HashMap<&str, Vec<ImageRecord>> = HashMap::new();

        for record in records {
            let Some(hash) = record.hash() else {
                continue;
            };
            by_hash
                .entry(hash)
                .or_insert_with(|| {
                    order.push(hash);
                    Vec::new()
                })
                .push(record.clone());
        }

        let groups: Vec<DuplicateGroup> = order
            .into_iter()
            .filter_map(|hash| {
                let group = by_hash.remove(hash)?;
                (group.len() > 1).then(|| DuplicateGroup {
                    hash: hash.to_string(),
                    records: group,
                })
            })
            .collect();

        info!(
            "Found {} duplicate groups ({} redundant files)",
            groups.len(),
            groups.iter().map(|g| g.redundant().len()).sum::<usize>()
        );
        groups
    }

    /// Plan moving every record but the first of each group into the
    /// duplicates folder
    pub fn plan_moves(&self, groups: &[DuplicateGroup], source_dir: &Path) -> BatchPlan {
        let mut plan = BatchPlan::new(Operation::MoveDuplicates, source_dir);
        for group in groups {
            plan.unassigned.push(group.retained().clone());
            plan.groups.push(PlanGroup {
                label: group.hash.clone(),
                relocations: group
                    .redundant()
                    .iter()
                    .map(|record| Relocation {
                        record: record.clone(),
                        target: PathBuf::from(&self.folder).join(record.file_name()),
                    })
                    .collect(),
            });
        }
        plan
    }

    pub fn move_duplicates(
        &self,
        groups: &[DuplicateGroup],
        source_dir: &Path,
        simulate: bool,
    ) -> BatchReport {
        self.plan_moves(groups, source_dir)
            .execute(ExecutionMode::from_simulate(simulate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn record(name: &str, day: u32, hash: Option<&str>) -> ImageRecord {
        let modified = NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let record = ImageRecord::new(name, modified);
        match hash {
            Some(hash) => record.with_content_hash(hash),
            None => record,
        }
    }

    #[test]
    fn test_find_duplicates_groups_by_hash() {
        let records = vec![
            record("a.jpg", 1, Some("abc123")),
            record("b.jpg", 2, Some("abc123")),
            record("c.jpg", 3, Some("zzz")),
            record("d.jpg", 4, None),
            record("e.jpg", 5, None),
            record("f.jpg", 6, Some("")),
            record("g.jpg", 7, Some("")),
        ];
        let detector = DuplicateDetector::default();
        let groups = detector.find_duplicates(&records);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].hash, "abc123");
        let names: Vec<_> = groups[0].records.iter().map(|r| r.file_name()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_find_duplicates_is_deterministic() {
        let records: Vec<_> = (1..=9)
            .map(|i| record(&format!("{i}.jpg"), i, Some(["x", "y", "z"][(i % 3) as usize])))
            .collect();
        let detector = DuplicateDetector::default();
        let first = detector.find_duplicates(&records);

        for _ in 0..5 {
            let again = detector.find_duplicates(&records);
            assert_eq!(first.len(), again.len());
            for (a, b) in first.iter().zip(&again) {
                assert_eq!(a.hash, b.hash);
                assert!(a.records.len() >= 2);
                let names_a: Vec<_> = a.records.iter().map(|r| r.file_name()).collect();
                let names_b: Vec<_> = b.records.iter().map(|r| r.file_name()).collect();
                assert_eq!(names_a, names_b);
            }
        }
    }

    #[test]
    fn test_move_duplicates_simulate_and_commit() {
        let dir = tempdir().unwrap();
        for name in ["a.jpg", "b.jpg"] {
            let mut file = File::create(dir.path().join(name)).unwrap();
            file.write_all(b"SAME PIXELS").unwrap();
        }
        let records = vec![
            record("a.jpg", 1, Some("abc123")),
            record("b.jpg", 2, Some("abc123")),
        ];
        let detector = DuplicateDetector::default();
        let groups = detector.find_duplicates(&records);

        let preview = detector.move_duplicates(&groups, dir.path(), true);
        assert_eq!(preview.moved(), 1);
        assert_eq!(preview.moves[0].source, PathBuf::from("b.jpg"));
        assert!(!dir.path().join("duplicates").exists());

        let report = detector.move_duplicates(&groups, dir.path(), false);
        assert_eq!(report.moved(), 1);
        assert!(dir.path().join("a.jpg").exists());
        assert!(dir.path().join("duplicates/b.jpg").exists());
        assert_eq!(fs::read_dir(dir.path().join("duplicates")).unwrap().count(), 1);
    }
}
