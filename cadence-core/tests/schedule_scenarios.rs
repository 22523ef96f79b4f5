use cadence_core::{
    AdministrationEvent, MAX_PREVIEW_ITERATIONS, Protocol, ProtocolDraft, ScheduleRule, analyze,
    is_active_phase, next_occurrence, next_site, preview, validate, weekday_index,
};
use chrono::{Days, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn base_date() -> NaiveDate {
    d(2020, 1, 1)
}

#[test]
fn weekly_interval_next_from_start() {
    let rule = ScheduleRule::every_n_days(7);
    assert_eq!(next_occurrence(&rule, d(2024, 1, 1)), Some(d(2024, 1, 8)));
}

#[test]
fn mon_wed_fri_from_monday_is_wednesday() {
    let rule = ScheduleRule::weekly_on([1, 3, 5]);
    assert_eq!(weekday_index(d(2024, 1, 1)), 1);
    assert_eq!(next_occurrence(&rule, d(2024, 1, 1)), Some(d(2024, 1, 3)));
}

#[test]
fn four_on_one_off_day_28_is_off() {
    let p = Protocol::new("p1", "med-1", ScheduleRule::daily(), d(2024, 1, 1)).with_cycle(4, 1);
    assert!(!is_active_phase(&p, d(2024, 1, 29)));
    assert!(is_active_phase(&p, d(2024, 1, 28)));
}

#[test]
fn daily_ten_day_window_eight_doses() {
    let p = Protocol::new("p1", "med-1", ScheduleRule::daily(), d(2024, 1, 1));
    let events: Vec<AdministrationEvent> = [1, 2, 3, 5, 6, 7, 9, 10]
        .iter()
        .map(|day| {
            AdministrationEvent::new("p1", Utc.with_ymd_and_hms(2024, 1, *day, 20, 0, 0).unwrap())
        })
        .collect();

    let report = analyze(&p, &events, d(2024, 1, 1), d(2024, 1, 10));
    assert_eq!(report.expected_count, Some(10));
    assert_eq!(report.actual_count, 8);
    assert_eq!(report.adherence_percent, Some(80));
}

#[test]
fn site_rotation_wraps_and_resets() {
    let rotation = ["A", "B", "C"];
    assert_eq!(next_site(&rotation, Some("C")), Some(&"A"));
    assert_eq!(next_site(&rotation, Some("Z")), Some(&"A"));
}

#[test]
fn empty_weekday_selection_is_rejected() {
    let draft = ProtocolDraft::new("p1", "med-1")
        .with_rule(ScheduleRule::weekly_on([]))
        .with_start_date("2024-01-01");
    let report = validate(&draft);
    assert!(!report.valid);
    assert!(report
        .errors()
        .iter()
        .any(|e| e == "at least one day must be selected"));
}

fn weekday_set() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..=6, 1..=7)
}

proptest! {
    #[test]
    fn prop_interval_iterates_linearly(n in 1u32..=60, offset in 0u64..3000, k in 1u64..20) {
        let start = base_date() + Days::new(offset);
        let rule = ScheduleRule::every_n_days(n);

        prop_assert_eq!(next_occurrence(&rule, start), Some(start + Days::new(u64::from(n))));

        let mut cur = start;
        for _ in 0..k {
            cur = next_occurrence(&rule, cur).unwrap();
        }
        prop_assert_eq!(cur, start + Days::new(k * u64::from(n)));
    }

    #[test]
    fn prop_weekly_next_is_nearest_match(days in weekday_set(), offset in 0u64..3000) {
        let reference = base_date() + Days::new(offset);
        let rule = ScheduleRule::weekly_on(days.clone());
        let next = next_occurrence(&rule, reference).unwrap();

        prop_assert!(next > reference);
        prop_assert!(days.contains(&weekday_index(next)));

        let mut between = reference + Days::new(1);
        while between < next {
            prop_assert!(!days.contains(&weekday_index(between)));
            between = between + Days::new(1);
        }
    }

    #[test]
    fn prop_preview_is_sorted_and_bounded(
        n in 1u32..=14,
        start_offset in 0u64..400,
        today_offset in 0u64..400,
        horizon in 0u32..2000,
        end_after in prop::option::of(0u64..500),
    ) {
        let start = base_date() + Days::new(start_offset);
        let today = base_date() + Days::new(today_offset);
        let mut p = Protocol::new("p1", "med-1", ScheduleRule::every_n_days(n), start);
        if let Some(extra) = end_after {
            p = p.with_end_date(start + Days::new(extra));
        }

        let dates = preview(&p, today, horizon);
        prop_assert!(dates.len() <= MAX_PREVIEW_ITERATIONS);
        prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));

        let horizon_end = today + Days::new(u64::from(horizon));
        let upper = p.end_date.map_or(horizon_end, |end| end.min(horizon_end));
        for date in &dates {
            prop_assert!(*date >= start);
            prop_assert!(*date <= upper);
        }
    }

    #[test]
    fn prop_cycle_is_periodic(active in 1u32..8, off in 0u32..8, offset in 0i64..1000) {
        let p = Protocol::new("p1", "med-1", ScheduleRule::daily(), base_date()).with_cycle(active, off);
        let period = i64::from(active + off) * 7;
        let date = base_date() + chrono::Duration::days(offset);
        let later = date + chrono::Duration::days(period);
        prop_assert_eq!(is_active_phase(&p, date), is_active_phase(&p, later));
    }

    #[test]
    fn prop_adherence_percent_in_range(
        n in 1u32..=10,
        event_days in prop::collection::vec(0i64..90, 0..120),
        window_len in 0i64..90,
    ) {
        let p = Protocol::new("p1", "med-1", ScheduleRule::every_n_days(n), base_date());
        let events: Vec<AdministrationEvent> = event_days
            .iter()
            .map(|off| {
                let at = Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::days(*off);
                AdministrationEvent::new("p1", at)
            })
            .collect();

        let window_end = base_date() + chrono::Duration::days(window_len);
        let report = analyze(&p, &events, base_date(), window_end);
        let pct = report.adherence_percent.unwrap();
        prop_assert!(pct <= 100);
        prop_assert!(report.longest_streak >= report.current_streak);
    }

    #[test]
    fn prop_rotation_returns_to_start(len in 1usize..12, start in 0usize..12) {
        let rotation: Vec<String> = (0..len).map(|i| format!("site-{i}")).collect();
        let first = rotation[start % len].clone();

        let mut cur = first.clone();
        for _ in 0..len {
            cur = next_site(&rotation, Some(cur.as_str())).unwrap().clone();
        }
        prop_assert_eq!(cur, first);
    }
}
