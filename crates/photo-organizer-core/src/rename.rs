//! Renaming records into the canonical naming scheme.

use chrono::NaiveDate;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::naming::FilenamePatternGenerator;
use crate::organize::{BatchPlan, Operation, PlanGroup, Relocation};
use crate::period::PeriodConfiguration;
use crate::types::{EventMap, ImageRecord};

/// Plan renaming `records` in place.
///
/// Records are grouped by calendar day and numbered within the day, oldest
/// first. Numbering starts after the highest sequence number any of the
/// `existing` organized names already uses for that day, so a second run
/// never aims at names taken by the first. Records already carrying their
/// target name are left alone.
pub fn plan_renames(
    generator: &FilenamePatternGenerator,
    config: &PeriodConfiguration,
    records: &[ImageRecord],
    existing: &[ImageRecord],
    events: Option<&EventMap>,
    source_dir: &Path,
) -> BatchPlan {
    let next_free = next_free_sequences(generator, records, existing);

    let mut by_day: BTreeMap<NaiveDate, Vec<&ImageRecord>> = BTreeMap::new();
    for record in records {
        by_day.entry(record.preferred_date()).or_default().push(record);
    }

    let mut plan = BatchPlan::new(Operation::Rename, source_dir);
    for (day, mut daily) in by_day {
        daily.sort_by_key(|record| record.preferred_timestamp());

        let first = next_free
            .get(&config.format_date(day))
            .copied()
            .unwrap_or(0);
        if first > 0 {
            debug!("{day}: numbering continues at {first}");
        }

        let mut relocations = Vec::with_capacity(daily.len());
        for (index, record) in (first..).zip(daily) {
            let new_name = generator.generate_filename(config, record, index, events);
            let target = match record.file.parent() {
                Some(parent) => parent.join(&new_name),
                None => new_name.clone().into(),
            };

            if target == record.file {
                debug!("{} already carries its name", record.file.display());
                plan.unassigned.push(record.clone());
                continue;
            }
            relocations.push(Relocation {
                record: record.clone(),
                target,
            });
        }

        if !relocations.is_empty() {
            plan.groups.push(PlanGroup {
                label: EventMap::key_for(day),
                relocations,
            });
        }
    }

    info!("Planned {} renames over {} days", plan.len(), plan.groups.len());
    plan
}

/// First unused sequence number per date field, from organized names that
/// are not themselves being renamed
fn next_free_sequences(
    generator: &FilenamePatternGenerator,
    records: &[ImageRecord],
    existing: &[ImageRecord],
) -> HashMap<String, u32> {
    let mut next: HashMap<String, u32> = HashMap::new();
    for record in existing {
        if records.iter().any(|renamed| renamed.file == record.file) {
            continue;
        }
        let Some(parsed) = generator.parse(&record.file_name()) else {
            continue;
        };
        if let Some(sequence) = parsed.sequence {
            let slot = next.entry(parsed.date).or_default();
            *slot = (*slot).max(sequence.saturating_add(1));
        }
    }
    next
}
