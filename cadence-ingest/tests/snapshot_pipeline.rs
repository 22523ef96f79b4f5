use cadence_core::{
    AdherenceStatus, Protocol, ScheduleRule, analyze, analyze_in_tz, last_site_used, next_site,
    preview,
};
use cadence_ingest::{
    find_protocol, load_events_json, load_protocols, parse_event_log_csv, parse_event_log_reader,
};
use chrono::NaiveDate;
use std::io::Write;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Weekly injection: adherence, streaks and site rotation from a real-shaped export.
#[test]
fn test_weekly_injection_from_snapshot() {
    let records = load_protocols(fixture("protocols.json")).unwrap();
    assert_eq!(records.len(), 3, "soft-deleted protocol should be dropped");

    let protocol = find_protocol(&records, Some("proto-testo")).unwrap();
    assert_eq!(protocol.rule, ScheduleRule::every_n_days(7));

    let log = parse_event_log_csv(fixture("doses.csv"), "America/Chicago").unwrap();
    assert_eq!(log.skipped, 1);

    let report = analyze_in_tz(
        &protocol,
        &log.events,
        d(2024, 1, 1),
        d(2024, 2, 11),
        chrono_tz::America::Chicago,
    );
    assert_eq!(report.status, AdherenceStatus::Computed);
    assert_eq!(report.expected_count, Some(6));
    assert_eq!(report.actual_count, 5);
    assert_eq!(report.adherence_percent, Some(83));
    // local dates: 02-05, 01-29, 01-15, 01-08, 01-01; the 14 day gap breaks the run
    assert_eq!(report.current_streak, 2);
    assert_eq!(report.longest_streak, 3);
    assert_eq!(report.last_event_date, Some(d(2024, 2, 5)));

    let last = last_site_used(&log.events, &protocol.id);
    assert_eq!(last, Some("left glute"));
    let rotation = protocol.site_rotation.as_deref().unwrap();
    assert_eq!(next_site(rotation, last).map(String::as_str), Some("right glute"));

    assert_eq!(preview(&protocol, d(2024, 2, 6), 14), vec![d(2024, 2, 12), d(2024, 2, 19)]);
}

/// Cycled M/W/F protocol: off week is skipped in preview.
#[test]
fn test_cycled_weekday_protocol() {
    let records = load_protocols(fixture("protocols.json")).unwrap();
    let protocol = find_protocol(&records, Some("proto-tb500")).unwrap();
    assert_eq!(protocol.end_date, Some(d(2024, 3, 31)));

    let dates = preview(&protocol, d(2024, 1, 22), 14);
    assert_eq!(dates, vec![d(2024, 1, 22), d(2024, 1, 24), d(2024, 1, 26), d(2024, 2, 5)]);

    let log = parse_event_log_csv(fixture("doses.csv"), "America/Chicago").unwrap();
    let report = analyze(&protocol, &log.events, d(2024, 1, 1), d(2024, 1, 14));
    assert_eq!(report.expected_count, Some(6));
    assert_eq!(report.actual_count, 2);
    assert_eq!(report.adherence_percent, Some(33));
    assert_eq!((report.current_streak, report.longest_streak), (1, 1));
}

/// Evening doses logged in local time count on their local date, including
/// one on the last day of the window.
#[test]
fn test_evening_doses_counted_on_local_date() {
    let protocol = Protocol::new("p1", "med-1", ScheduleRule::daily(), d(2024, 1, 1));
    let csv = "protocol_id,occurred_at,site\np1,2024-01-09 20:00,\np1,2024-01-10 20:00,\n";
    let log = parse_event_log_reader(csv.as_bytes(), "America/Chicago").unwrap();
    assert_eq!(log.events.len(), 2);

    let report = analyze_in_tz(
        &protocol,
        &log.events,
        d(2024, 1, 9),
        d(2024, 1, 10),
        chrono_tz::America::Chicago,
    );
    assert_eq!(report.expected_count, Some(2));
    assert_eq!(report.actual_count, 2);
    assert_eq!(report.adherence_percent, Some(100));
    assert_eq!(report.last_event_date, Some(d(2024, 1, 10)));
}

#[test]
fn test_custom_protocol_reports_unknown_adherence() {
    let records = load_protocols(fixture("protocols.json")).unwrap();
    let protocol = find_protocol(&records, Some("proto-taper")).unwrap();
    let log = parse_event_log_csv(fixture("doses.csv"), "UTC").unwrap();

    let report = analyze(&protocol, &log.events, d(2024, 1, 1), d(2024, 1, 31));
    assert_eq!(report.status, AdherenceStatus::Unsupported);
    assert_eq!(report.expected_count, None);
    assert_eq!(report.actual_count, 1);
    assert!(preview(&protocol, d(2024, 1, 1), 30).is_empty());
}

#[test]
fn test_events_json_round_trip_through_file() {
    let log = parse_event_log_csv(fixture("doses.csv"), "America/Chicago").unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    let json = serde_json::to_string_pretty(&log.events).unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let loaded = load_events_json(file.path()).unwrap();
    assert_eq!(loaded, log.events);
}
