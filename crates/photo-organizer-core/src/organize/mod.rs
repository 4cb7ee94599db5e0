//! Folder assignment: by calendar year, by event, and by custom period.

pub mod batch;

use chrono::Datelike;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::error::Result;
use crate::naming::grammar::is_file_name_safe;
use crate::naming::FilenamePatternGenerator;
use crate::period::PeriodConfiguration;
use crate::types::ImageRecord;
pub use batch::{
    BatchPlan, BatchReport, ExecutionMode, MoveOutcome, MoveRecord, Operation, PendingBatch,
    PlanGroup, PreviewedBatch, Relocation,
};

pub const DEFAULT_YEAR_LABEL: &str = "Year";

/// Assigns records to destination folders and executes the moves
#[derive(Debug, Clone)]
pub struct FolderOrganizer {
    year_label: String,
}

impl Default for FolderOrganizer {
    fn default() -> Self {
        Self::new(DEFAULT_YEAR_LABEL)
    }
}

impl FolderOrganizer {
    /// `year_label` names year folders, e.g. `Year 2024`
    pub fn new(year_label: impl Into<String>) -> Self {
        Self {
            year_label: year_label.into(),
        }
    }

    pub fn year_folder(&self, year: i32) -> String {
        format!("{} {year}", self.year_label)
    }

    /// One folder per calendar year of the preferred timestamp
    pub fn plan_by_year(&self, records: &[ImageRecord], source_dir: &Path) -> BatchPlan {
        let mut by_year: BTreeMap<i32, Vec<&ImageRecord>> = BTreeMap::new();
        for record in records {
            by_year
                .entry(record.preferred_timestamp().year())
                .or_default()
                .push(record);
        }

        let mut plan = BatchPlan::new(Operation::OrganizeByYear, source_dir);
        for (year, group) in by_year {
            plan.groups.push(folder_group(self.year_folder(year), group));
        }
        info!("Planned {} year folders", plan.groups.len());
        plan
    }

    /// Group organized file names by the event text they carry.
    /// Names without an event are left out.
    pub fn detect_events<'a>(
        &self,
        generator: &FilenamePatternGenerator,
        filenames: impl IntoIterator<Item = &'a str>,
    ) -> BTreeMap<String, Vec<String>> {
        let mut events: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for filename in filenames {
            if let Some(event) = event_folder(generator, filename) {
                events.entry(event).or_default().push(filename.to_string());
            }
        }
        events
    }

    /// One folder per event found in the records' file names
    pub fn plan_by_event(
        &self,
        generator: &FilenamePatternGenerator,
        records: &[ImageRecord],
        source_dir: &Path,
    ) -> BatchPlan {
        let mut plan = BatchPlan::new(Operation::OrganizeByEvent, source_dir);
        let mut by_event: BTreeMap<String, Vec<&ImageRecord>> = BTreeMap::new();

        for record in records {
            match event_folder(generator, &record.file_name()) {
                Some(event) => by_event.entry(event).or_default().push(record),
                None => plan.unassigned.push(record.clone()),
            }
        }

        for (event, group) in by_event {
            plan.groups.push(folder_group(event, group));
        }
        info!(
            "Planned {} event folders, {} files without event",
            plan.groups.len(),
            plan.unassigned.len()
        );
        plan
    }

    /// Split records between the active period and the one after it.
    ///
    /// Records past the active period's end all go to the single successor
    /// period, however far past it they fall. Records dated before the
    /// start stay where they are.
    pub fn plan_by_period(
        &self,
        config: &PeriodConfiguration,
        records: &[ImageRecord],
        source_dir: &Path,
    ) -> Result<BatchPlan> {
        let mut plan = BatchPlan::new(Operation::OrganizeByPeriod, source_dir);
        let mut current = Vec::new();
        let mut overflow = Vec::new();

        for record in records {
            let date = record.preferred_date();
            if config.is_date_in_range(date) {
                current.push(record);
            } else if config.should_create_new_period(date) {
                overflow.push(record);
            } else {
                debug!("{} predates the period", record.file.display());
                plan.unassigned.push(record.clone());
            }
        }

        if !current.is_empty() {
            plan.groups.push(folder_group(config.folder_name(), current));
        }
        if !overflow.is_empty() {
            let successor = config.derive_successor()?;
            info!(
                "{} files fall after {}, rolling over to the period starting {}",
                overflow.len(),
                config.end().map(|d| d.to_string()).unwrap_or_default(),
                successor.start()
            );
            plan.groups.push(folder_group(successor.folder_name(), overflow));
        }
        Ok(plan)
    }

    pub fn organize_by_years(
        &self,
        records: &[ImageRecord],
        source_dir: &Path,
        simulate: bool,
    ) -> BatchReport {
        self.plan_by_year(records, source_dir)
            .execute(ExecutionMode::from_simulate(simulate))
    }

    pub fn organize_by_events(
        &self,
        generator: &FilenamePatternGenerator,
        records: &[ImageRecord],
        source_dir: &Path,
        simulate: bool,
    ) -> BatchReport {
        self.plan_by_event(generator, records, source_dir)
            .execute(ExecutionMode::from_simulate(simulate))
    }

    pub fn organize_by_periods(
        &self,
        config: &PeriodConfiguration,
        records: &[ImageRecord],
        source_dir: &Path,
        simulate: bool,
    ) -> Result<BatchReport> {
        Ok(self
            .plan_by_period(config, records, source_dir)?
            .execute(ExecutionMode::from_simulate(simulate)))
    }
}

/// Event of `filename` when it names exactly one folder directly below the
/// source directory
fn event_folder(generator: &FilenamePatternGenerator, filename: &str) -> Option<String> {
    let event = generator.event_of(filename)?;
    let mut components = Path::new(&event).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if is_file_name_safe(&event) => Some(event),
        _ => {
            debug!("{filename}: event '{event}' is not a folder name");
            None
        }
    }
}

fn folder_group(folder: String, records: Vec<&ImageRecord>) -> PlanGroup {
    let relocations = records
        .into_iter()
        .map(|record| Relocation {
            record: record.clone(),
            target: PathBuf::from(&folder).join(record.file_name()),
        })
        .collect();
    PlanGroup {
        label: folder,
        relocations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::fs;
    use tempfile::tempdir;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plan_by_year() {
        let records = vec![
            ImageRecord::new("a.jpg", at(2023, 5, 1)),
            ImageRecord::new("b.jpg", at(2024, 5, 1)),
            ImageRecord::new("c.jpg", at(2024, 1, 1)).with_capture_time(at(2023, 12, 31)),
        ];
        let plan = FolderOrganizer::default().plan_by_year(&records, Path::new("/photos"));

        let labels: Vec<_> = plan.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Year 2023", "Year 2024"]);
        assert_eq!(plan.groups[0].relocations.len(), 2);
        assert_eq!(
            plan.groups[0].relocations[1].target,
            Path::new("Year 2023").join("c.jpg")
        );
    }

    #[test]
    fn test_detect_events() {
        let generator = FilenamePatternGenerator::with_default_separator().unwrap();
        let names = [
            "00 - IMG - 05032024(00) - Birthday.jpg",
            "00 - IMG - 05032024(01) - Birthday.jpg",
            "01 - IMG - 06042024(00) - Beach.jpg",
            "01 - IMG - 07042024(00).jpg",
            "random.jpg",
        ];
        let events = FolderOrganizer::default().detect_events(&generator, names);

        assert_eq!(events.len(), 2);
        assert_eq!(events["Birthday"].len(), 2);
        assert_eq!(events["Beach"], vec!["01 - IMG - 06042024(00) - Beach.jpg"]);
    }

    #[test]
    fn test_dot_events_stay_in_source_dir() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("photos");
        fs::create_dir(&source).unwrap();
        let names = [
            "00 - IMG - 05032024(00) - ...jpg",
            "00 - IMG - 05032024(01) - ..jpg",
            "00 - IMG - 05032024(02) - Party.jpg",
        ];
        for name in names {
            fs::write(source.join(name), name).unwrap();
        }
        let records: Vec<_> = names
            .iter()
            .map(|name| ImageRecord::new(*name, at(2024, 3, 5)))
            .collect();

        let generator = FilenamePatternGenerator::with_default_separator().unwrap();
        let organizer = FolderOrganizer::default();
        assert_eq!(generator.event_of(names[0]).as_deref(), Some(".."));
        assert_eq!(
            organizer.detect_events(&generator, names).keys().collect::<Vec<_>>(),
            vec!["Party"]
        );

        let plan = organizer.plan_by_event(&generator, &records, &source);
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].label, "Party");
        assert_eq!(plan.unassigned.len(), 2);

        let report = plan.execute(ExecutionMode::Commit);
        assert_eq!(report.moved(), 1);
        assert!(source.join(names[0]).exists());
        assert!(source.join(names[1]).exists());
        assert!(source.join("Party").join(names[2]).exists());
        assert!(!dir.path().join(names[0]).exists());
    }

    #[test]
    fn test_plan_by_period_with_rollover() {
        let config = PeriodConfiguration::builder(date(2024, 1, 1))
            .end(date(2024, 12, 31))
            .build()
            .unwrap();
        let records = vec![
            ImageRecord::new("before.jpg", at(2023, 6, 1)),
            ImageRecord::new("inside.jpg", at(2024, 6, 1)),
            ImageRecord::new("after.jpg", at(2025, 1, 15)),
            ImageRecord::new("far.jpg", at(2027, 3, 1)),
        ];

        let plan = FolderOrganizer::default()
            .plan_by_period(&config, &records, Path::new("/photos"))
            .unwrap();

        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0].label, "00 - IMG - 01012024");
        assert_eq!(plan.groups[1].label, "00 - IMG - 01012025");
        assert_eq!(plan.groups[1].relocations.len(), 2);
        assert_eq!(plan.unassigned.len(), 1);
        assert_eq!(plan.unassigned[0].file_name(), "before.jpg");
    }

    #[test]
    fn test_plan_by_period_open_ended_never_rolls_over() {
        let config = PeriodConfiguration::builder(date(2024, 1, 1))
            .open_ended()
            .build()
            .unwrap();
        let records = vec![ImageRecord::new("late.jpg", at(2030, 1, 1))];

        let plan = FolderOrganizer::default()
            .plan_by_period(&config, &records, Path::new("/photos"))
            .unwrap();
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].label, "00 - IMG - 01012024");
    }
}
