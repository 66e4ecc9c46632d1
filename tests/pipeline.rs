use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use std::path::PathBuf;
use tkbcal::aggregate::{attach_lessons, registered_classes};
use tkbcal::compile::{CompileOptions, compile_class};
use tkbcal::config::Config;
use tkbcal::loader::{load_grid, load_html};
use tkbcal::model::{Recurrence, Reminder};
use tkbcal::period::PeriodTable;
use tkbcal::request::{CalendarRequest, handle_calendar, handle_lessons};
use tkbcal::table::{LayoutStrategy, SniffingLayout};
use tkbcal::{Calendar, Error};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn periods() -> PeriodTable {
    PeriodTable::load(fixture("periods.csv")).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn request() -> CalendarRequest {
    CalendarRequest::from_json(&format!(
        r#"{{"registered_file": {:?}, "schedule_file": {:?}, "start_date": "2024-02-19",
            "repeat": 5, "remind_before": [15], "practical_delay": 1,
            "practical_groups": ["1", "2"]}}"#,
        fixture("registration.html"),
        fixture("timetable.csv"),
    ))
    .unwrap()
}

#[test]
fn stages_over_fixture_documents() {
    let config = Config::default();
    let layout = SniffingLayout;

    let html = std::fs::read(fixture("registration.html")).unwrap();
    let registration = layout
        .extract(&load_html(&html).unwrap(), &config.registration.class_id)
        .unwrap();
    let universe = registered_classes(&registration, &config.registration).unwrap();
    let ids: Vec<&str> = universe.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["INT1001 1", "MAT1093 3", "PHY1100 2"]);

    let csv = std::fs::read(fixture("timetable.csv")).unwrap();
    let timetable = layout
        .extract(&load_grid(&csv).unwrap(), &config.timetable.class_id)
        .unwrap();
    // the stray "Ghi chú" column after the blank header is cut
    assert_eq!(timetable.width(), 9);
    assert_eq!(timetable.len(), 5);

    let classes = attach_lessons(&timetable, &universe, &periods(), &config.timetable).unwrap();
    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0].id, "INT1001 1");
    assert_eq!(classes[0].teacher, "T. An");
    assert_eq!(classes[0].lessons.len(), 2);
    assert_eq!(classes[1].id, "MAT1093 3");
    // first row fixes the teacher even when blank
    assert_eq!(classes[1].teacher, "");
    assert_eq!(classes[1].lessons[0].weekday, 6);
    assert_eq!(classes[1].lessons[1].weekday, 4);

    let mut options = CompileOptions::new(
        NaiveDate::from_ymd_opt(2024, 2, 19).unwrap(),
        Recurrence::Count(5),
    );
    options.practical_groups.insert("1".to_string());
    options.practical_delay_weeks = 1;
    let events = compile_class(&classes[0], &options).unwrap();
    assert_eq!(events[0].start, at(2024, 2, 19, 7, 0));
    assert_eq!(events[0].end, at(2024, 2, 19, 9, 30));
    assert_eq!(events[1].start, at(2024, 2, 28, 9, 35));
}

#[test]
fn workbook_timetable_matches_the_csv_one() {
    let config = Config::default();
    let layout = SniffingLayout;

    let html = std::fs::read(fixture("registration.html")).unwrap();
    let registration = layout
        .extract(&load_html(&html).unwrap(), &config.registration.class_id)
        .unwrap();
    let universe = registered_classes(&registration, &config.registration).unwrap();

    let xlsx = std::fs::read(fixture("timetable.xlsx")).unwrap();
    let timetable = layout
        .extract(&load_grid(&xlsx).unwrap(), &config.timetable.class_id)
        .unwrap();
    assert_eq!(timetable.width(), 9);
    assert_eq!(timetable.len(), 5);
    // numeric cells come back as plain integers
    assert_eq!(timetable.rows()[0][0].as_deref(), Some("1"));
    assert_eq!(timetable.rows()[0][5].as_deref(), Some("2"));

    let classes = attach_lessons(&timetable, &universe, &periods(), &config.timetable).unwrap();
    let ids: Vec<&str> = classes.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["INT1001 1", "MAT1093 3"]);
    assert_eq!(classes[0].lessons[0].weekday, 0);
    assert_eq!(classes[0].lessons[1].group, "1");
    assert_eq!(classes[1].lessons[0].weekday, 6);

    let from_csv = handle_calendar(&request(), &config, &periods()).unwrap();
    let mut request = request();
    request.schedule_file = Some(fixture("timetable.xlsx"));
    let from_xlsx = handle_calendar(&request, &config, &periods()).unwrap();
    assert_eq!(from_xlsx.events(), from_csv.events());
}

#[test]
fn request_compiles_full_calendar() {
    let calendar = handle_calendar(&request(), &Config::default(), &periods()).unwrap();
    assert_eq!(calendar.name(), "Timetable");

    let starts: Vec<NaiveDateTime> = calendar.events().iter().map(|e| e.start).collect();
    assert_eq!(
        starts,
        vec![
            at(2024, 2, 19, 7, 0),
            at(2024, 2, 28, 9, 35),
            at(2024, 2, 25, 13, 20),
            at(2024, 3, 1, 15, 5),
        ]
    );
    assert_eq!(calendar.events()[2].start.weekday(), Weekday::Sun);
    for event in calendar.events() {
        assert_eq!(event.recurrence, Recurrence::Count(5));
        assert_eq!(event.alarms, vec![Reminder { minutes_before: 15 }]);
    }
    assert_eq!(calendar.events()[0].summary, "Nhập môn lập trình");
    assert_eq!(calendar.events()[1].location, "PM 201");
}

#[test]
fn ics_output_parses_back() {
    let calendar = handle_calendar(&request(), &Config::default(), &periods()).unwrap();
    let ics = calendar.to_ics();
    assert!(ics.contains("FREQ=WEEKLY"));
    assert!(ics.contains("COUNT=5"));
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 4);
    assert_eq!(ics.matches("BEGIN:VALARM").count(), 4);

    let parsed = Calendar::from_ics(&ics).unwrap();
    assert_eq!(parsed.events(), calendar.events());

    let occurrences = parsed.events()[0].occurrences(10).unwrap();
    assert_eq!(occurrences.len(), 5);
    assert_eq!(occurrences[4], at(2024, 3, 18, 7, 0));
}

#[test]
fn rerun_yields_identical_events() {
    let config = Config::default();
    let first = handle_calendar(&request(), &config, &periods()).unwrap();
    let second = handle_calendar(&request(), &config, &periods()).unwrap();
    assert_eq!(first.events(), second.events());

    let uids = |ics: String| -> Vec<String> {
        ics.lines()
            .filter(|l| l.starts_with("UID:"))
            .map(str::to_string)
            .collect()
    };
    let first_uids = uids(first.to_ics());
    // one per event and one per alarm
    assert_eq!(first_uids.len(), 8);
    assert_eq!(first_uids, uids(second.to_ics()));
}

#[test]
fn until_date_repeats_through_the_end_date() {
    let mut request = request();
    request.repeat = Some(tkbcal::request::Repeat::Until("2024-03-18".to_string()));
    let calendar = handle_calendar(&request, &Config::default(), &periods()).unwrap();
    let first = &calendar.events()[0];
    assert_eq!(
        first.recurrence,
        Recurrence::Until(NaiveDate::from_ymd_opt(2024, 3, 18).unwrap())
    );
    let occurrences = first.occurrences(50).unwrap();
    assert_eq!(occurrences.last(), Some(&at(2024, 3, 18, 7, 0)));
    assert_eq!(occurrences.len(), 5);
}

#[test]
fn lessons_listing_flags_practical_groups() {
    let mut config = Config::default();
    config.defaults.practical_keywords = vec!["1".to_string(), "2".to_string()];
    let response = handle_lessons(&request(), &config, &periods()).unwrap();
    assert_eq!(response.classes.len(), 2);
    let lessons = &response.classes[0].lessons;
    assert_eq!(lessons[0].period, "07:00 -> 09:30");
    assert!(!lessons[0].is_practical);
    assert!(lessons[1].is_practical);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["classes"][1]["subject"]["name"], "Đại số");
}

#[test]
fn wrong_header_label_is_header_not_found() {
    let mut config = Config::default();
    config.timetable.class_id = "Mã LHP".to_string();
    let err = handle_calendar(&request(), &config, &periods()).unwrap_err();
    assert!(matches!(err, Error::HeaderNotFound { label } if label == "Mã LHP"));
}

#[test]
fn missing_period_is_a_lookup_error() {
    let short = PeriodTable::from_reader(
        "period,start,end\n1,07:00,07:50\n2,07:50,08:40\n3,08:40,09:30\n".as_bytes(),
    )
    .unwrap();
    let err = handle_calendar(&request(), &Config::default(), &short).unwrap_err();
    assert!(matches!(err, Error::Lookup(4)));
}

#[test]
fn start_date_at_the_edge_of_the_calendar_is_a_range_error() {
    let mut request = request();
    request.start_date = Some("-262143-01-01".to_string());
    let err = handle_calendar(&request, &Config::default(), &periods()).unwrap_err();
    assert!(matches!(err, Error::Range { .. }));
}

#[test]
fn missing_document_is_an_io_error() {
    let mut request = request();
    request.schedule_file = Some(fixture("nope.xlsx"));
    let err = handle_calendar(&request, &Config::default(), &periods()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(err.to_string().contains("nope.xlsx"));
}

#[test]
fn export_writes_named_file() {
    let calendar = handle_calendar(&request(), &Config::default(), &periods()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = calendar.export(dir.path(), "hk2").unwrap();
    assert_eq!(path, dir.path().join("hk2.ics"));
    let written = std::fs::read_to_string(path).unwrap();
    assert_eq!(Calendar::from_ics(&written).unwrap().len(), 4);
}
