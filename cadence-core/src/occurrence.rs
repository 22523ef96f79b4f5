//! Occurrence calculator: the next dose date after a reference date.

use chrono::{Days, NaiveDate};
use std::collections::BTreeSet;
use tracing::debug;

use crate::rule::{ScheduleRule, weekday_index};

/// Next occurrence strictly after `reference`.
///
/// Returns `None` for `Custom` rules (no deterministic next date), for an empty
/// weekday set, and when the result would leave chrono's date range.
pub fn next_occurrence(rule: &ScheduleRule, reference: NaiveDate) -> Option<NaiveDate> {
    match rule {
        ScheduleRule::EveryNDays { n } => reference.checked_add_days(Days::new(u64::from(*n))),
        ScheduleRule::WeeklyOnDays { days } => next_weekly(days, reference),
        ScheduleRule::Custom { payload } => {
            debug!(payload = %payload, "custom schedule rule has no computable next occurrence");
            None
        }
    }
}

fn next_weekly(days: &BTreeSet<u8>, reference: NaiveDate) -> Option<NaiveDate> {
    let current = weekday_index(reference);
    let mut valid = days.iter().copied().filter(|d| *d <= 6);

    let days_to_add = match days.iter().copied().find(|d| *d > current && *d <= 6) {
        Some(later_this_week) => later_this_week - current,
        // Wrap to the earliest selected weekday of the following week.
        None => (7 - current) + valid.next()?,
    };

    reference.checked_add_days(Days::new(u64::from(days_to_add)))
}

/// First scheduled date on or after `from` for a schedule anchored at `anchor`.
///
/// Interval rules recur at `anchor + k * n`; weekly rules on any selected
/// weekday. Nothing is scheduled before `anchor`.
pub fn first_occurrence_on_or_after(
    rule: &ScheduleRule,
    anchor: NaiveDate,
    from: NaiveDate,
) -> Option<NaiveDate> {
    let start = anchor.max(from);
    match rule {
        ScheduleRule::EveryNDays { n } => {
            if start == anchor {
                return Some(anchor);
            }
            if *n == 0 {
                return None;
            }
            let n = i64::from(*n);
            let elapsed = (start - anchor).num_days();
            let periods = (elapsed + n - 1) / n;
            u64::try_from(periods * n)
                .ok()
                .and_then(|offset| anchor.checked_add_days(Days::new(offset)))
        }
        ScheduleRule::WeeklyOnDays { .. } => {
            if rule.matches_weekday(start) {
                Some(start)
            } else {
                next_occurrence(rule, start)
            }
        }
        ScheduleRule::Custom { .. } => None,
    }
}
