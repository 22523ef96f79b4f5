//! Adherence analyzer: recorded doses against the theoretical schedule.
//!
//! Expected counts are derived from the rule over the part of the window the
//! protocol actually covers. Custom rules cannot be expanded, so their reports
//! carry `None` for expected count and percent ("unknown", never "0%").

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::{AdministrationEvent, Protocol};
use crate::rule::ScheduleRule;

/// Allowed drift, in days, between consecutive doses of an interval rule
/// before the streak breaks.
pub const STREAK_TOLERANCE_DAYS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceStatus {
    /// Expected count derived from the rule.
    Computed,
    /// No dose falls due in the window: the protocol starts after it or
    /// ended before it. Vacuously compliant.
    NotDue,
    /// Rule cannot be expanded; adherence is unknown.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceReport {
    pub protocol_id: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub status: AdherenceStatus,
    pub expected_count: Option<u32>,
    pub actual_count: u32,
    /// 0-100, capped at 100 when extra doses were logged.
    pub adherence_percent: Option<u8>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_event_date: Option<NaiveDate>,
}

impl AdherenceReport {
    /// False when adherence could not be computed for this rule.
    pub fn is_known(&self) -> bool {
        self.status != AdherenceStatus::Unsupported
    }

    /// Doses still owed in the window. Zero when unknown or over-logged.
    pub fn missed_count(&self) -> u32 {
        self.expected_count
            .map(|expected| expected.saturating_sub(self.actual_count))
            .unwrap_or(0)
    }
}

/// Compute adherence for `protocol` over `[window_start, window_end]`, with
/// event timestamps bucketed by UTC calendar date.
///
/// Events belonging to other protocols or falling outside the window are
/// ignored.
pub fn analyze(
    protocol: &Protocol,
    events: &[AdministrationEvent],
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> AdherenceReport {
    analyze_in_tz(protocol, events, window_start, window_end, Tz::UTC)
}

/// [`analyze`], with each dose dated on the patient's wall clock in `tz`.
///
/// A 20:00 dose in Chicago counts for that evening's date, not the next UTC
/// day.
pub fn analyze_in_tz(
    protocol: &Protocol,
    events: &[AdministrationEvent],
    window_start: NaiveDate,
    window_end: NaiveDate,
    tz: Tz,
) -> AdherenceReport {
    let mut doses: Vec<&AdministrationEvent> = events
        .iter()
        .filter(|e| e.protocol_id == protocol.id)
        .filter(|e| {
            let date = e.date_in(tz);
            date >= window_start && date <= window_end
        })
        .collect();
    // most recent first
    doses.sort_unstable_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

    let actual_count = u32::try_from(doses.len()).unwrap_or(u32::MAX);
    let dates: Vec<NaiveDate> = doses.iter().map(|e| e.date_in(tz)).collect();
    let last_event_date = dates.first().copied();
    let (current_streak, longest_streak) = streaks(&protocol.rule, &dates);

    let (status, expected_count) = expected(protocol, window_start, window_end);
    let adherence_percent = match status {
        AdherenceStatus::Unsupported => None,
        _ => Some(percent(actual_count, expected_count.unwrap_or(0))),
    };

    AdherenceReport {
        protocol_id: protocol.id.clone(),
        window_start,
        window_end,
        status,
        expected_count,
        actual_count,
        adherence_percent,
        current_streak,
        longest_streak,
        last_event_date,
    }
}

fn expected(
    protocol: &Protocol,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> (AdherenceStatus, Option<u32>) {
    if let ScheduleRule::Custom { payload } = &protocol.rule {
        debug!(protocol = %protocol.id, payload = %payload, "adherence unknown for custom rule");
        return (AdherenceStatus::Unsupported, None);
    }

    let effective_start = window_start.max(protocol.start_date);
    let effective_end = match protocol.end_date {
        Some(end) => window_end.min(end),
        None => window_end,
    };
    if effective_start > effective_end {
        return (AdherenceStatus::NotDue, Some(0));
    }

    let days_in_range = (effective_end - effective_start).num_days() + 1;
    let count = match &protocol.rule {
        ScheduleRule::EveryNDays { n } => days_in_range / i64::from((*n).max(1)),
        ScheduleRule::WeeklyOnDays { days } => {
            let per_week = days.iter().filter(|d| **d <= 6).count() as i64;
            (days_in_range / 7) * per_week
        }
        ScheduleRule::Custom { .. } => 0,
    };

    (
        AdherenceStatus::Computed,
        Some(u32::try_from(count).unwrap_or(u32::MAX)),
    )
}

fn percent(actual: u32, expected: u32) -> u8 {
    if expected == 0 {
        return 100;
    }
    let raw = (f64::from(actual) / f64::from(expected) * 100.0).round();
    raw.min(100.0) as u8
}

/// (current, longest) streaks over dates sorted most recent first.
///
/// Only interval rules define a streak; other rules report 1 when any dose
/// was recorded.
fn streaks(rule: &ScheduleRule, dates_desc: &[NaiveDate]) -> (u32, u32) {
    if dates_desc.is_empty() {
        return (0, 0);
    }
    let Some(n) = rule.interval_days() else {
        return (1, 1);
    };
    let n = i64::from(n);

    let mut current = 1u32;
    let mut current_open = true;
    let mut run = 1u32;
    let mut longest = 1u32;

    for pair in dates_desc.windows(2) {
        let gap = (pair[0] - pair[1]).num_days();
        if (gap - n).abs() <= STREAK_TOLERANCE_DAYS {
            run += 1;
        } else {
            current_open = false;
            run = 1;
        }
        if current_open {
            current = run;
        }
        longest = longest.max(run);
    }

    (current, longest)
}
