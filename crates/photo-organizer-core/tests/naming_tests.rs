mod common;

use common::{at, date, period, record};
use photo_organizer_core::{parse_event, EventMap, FilenamePatternGenerator, PeriodConfiguration};

fn configurations() -> Vec<PeriodConfiguration> {
    let mut configs = Vec::new();
    for separator in [" - ", "_", "-", " "] {
        for prefix in ["IMG", "", "Baby Year"] {
            for (include_period, include_sequential) in
                [(true, true), (true, false), (false, true), (false, false)]
            {
                configs.push(
                    PeriodConfiguration::builder(date(2024, 1, 31))
                        .separator(separator)
                        .prefix(prefix)
                        .include_period(include_period)
                        .include_sequential(include_sequential)
                        .build()
                        .unwrap(),
                );
            }
        }
    }
    configs
}

#[test]
fn generated_names_are_always_recognized() {
    let mut events = EventMap::new();
    events.insert_date(date(2024, 7, 14), "Beach - day two").unwrap();

    let records = [
        record("IMG_0001.JPG", at(2024, 1, 31, 8)),
        record("scan.png", at(2024, 7, 14, 12)),
        record("old.jpg", at(2019, 5, 5, 5)),
        record("no_extension", at(2025, 6, 1, 20)),
    ];

    for config in configurations() {
        let generator = FilenamePatternGenerator::for_configuration(&config).unwrap();
        for record in &records {
            for index in [0, 7, 123] {
                let name = generator.generate_filename(&config, record, index, Some(&events));
                assert!(
                    generator.is_organized(&name),
                    "{name:?} not recognized with separator {:?}",
                    config.separator()
                );
            }
        }
    }
}

#[test]
fn event_survives_round_trip() {
    let config = period(date(2024, 3, 1));
    let generator = FilenamePatternGenerator::for_configuration(&config).unwrap();
    let mut events = EventMap::new();
    events.insert_date(date(2024, 3, 5), "Birthday").unwrap();

    let name = generator.generate_filename(
        &config,
        &record("DSC_1.jpg", at(2024, 3, 5, 15)),
        3,
        Some(&events),
    );
    assert_eq!(name, "00 - IMG - 05032024(03) - Birthday.jpg");
    assert_eq!(generator.event_of(&name).as_deref(), Some("Birthday"));

    let parsed = generator.parse(&name).unwrap();
    assert_eq!(parsed.period, Some(0));
    assert_eq!(parsed.sequence, Some(3));
    assert_eq!(parsed.date, "05032024");
}

#[test]
fn event_with_slash_never_reaches_a_name() {
    assert!(EventMap::new().insert_date(date(2024, 3, 5), "Trip 1/2").is_err());
    assert!(parse_event("05/03/2024=Trip 1/2").is_err());

    // A map loaded from elsewhere can still carry one; the name stays a single component
    let mut events: EventMap =
        serde_json::from_str(r#"{"events":{"05032024":"Trip 1/2"}}"#).unwrap();
    assert_eq!(events.event_for(date(2024, 3, 5)), Some("Trip 1/2"));
    events.insert_date(date(2024, 3, 6), "Trip 2 of 2").unwrap();

    let config = period(date(2024, 3, 1));
    let generator = FilenamePatternGenerator::for_configuration(&config).unwrap();
    let name = generator.generate_filename(&config, &record("a.jpg", at(2024, 3, 5, 9)), 0, Some(&events));
    assert_eq!(name, "00 - IMG - 05032024(00).jpg");
    assert_eq!(std::path::Path::new(&name).components().count(), 1);
    assert!(generator.is_organized(&name));
    assert_eq!(generator.event_of(&name), None);

    let name = generator.generate_filename(&config, &record("b.jpg", at(2024, 3, 6, 9)), 0, Some(&events));
    assert_eq!(generator.event_of(&name).as_deref(), Some("Trip 2 of 2"));
}

#[test]
fn arbitrary_names_are_rejected() {
    let generator = FilenamePatternGenerator::with_default_separator().unwrap();
    for name in [
        "IMG_20240305.jpg",
        "holiday.png",
        "2024-03-05 12.00.00.jpg",
        "0503202.jpg",
        "",
    ] {
        assert!(!generator.is_organized(name), "{name:?} accepted");
    }
}

#[test]
fn legacy_names_are_recognized() {
    let generator = FilenamePatternGenerator::with_default_separator().unwrap();
    assert!(generator.is_organized("03 - IMG 05062024(01).jpg"));
    assert!(generator.is_organized("03 - IMG - 05062024(01) - Party.jpg"));
}

#[test]
fn scenario_first_day_name() {
    let config = period(date(2024, 3, 1));
    let generator = FilenamePatternGenerator::for_configuration(&config).unwrap();
    let name = generator.generate_filename(&config, &record("a.jpg", at(2024, 3, 5, 10)), 0, None);
    assert!(name.starts_with("00 - IMG - 05032024(00)"));
}

#[test]
fn scenario_rollover_to_successor() {
    let config = PeriodConfiguration::builder(date(2024, 1, 1))
        .end(date(2024, 12, 31))
        .build()
        .unwrap();
    assert!(config.should_create_new_period(date(2025, 1, 15)));

    let successor = config.derive_successor().unwrap();
    assert_eq!(successor.start(), date(2025, 1, 1));
    assert_eq!(successor.end(), Some(date(2025, 12, 31)));
    assert_eq!(successor.prefix(), config.prefix());
}

#[test]
fn leap_day_start() {
    let config = period(date(2024, 2, 29));
    assert_eq!(config.end(), Some(date(2025, 2, 28)));
    assert_eq!(config.calculate_period_number(date(2024, 2, 29)), 0);
    assert_eq!(config.calculate_period_number(date(2024, 2, 28)), 0);
    assert!(!config.is_date_in_range(date(2024, 2, 28)));
}
