//! Schedule rules: how often a protocol recurs.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Recurrence definition for a protocol.
///
/// Weekdays are numbered 0 (Sunday) through 6 (Saturday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleRule {
    /// Fixed interval: one dose every `n` days.
    EveryNDays { n: u32 },
    /// One dose on each listed weekday.
    WeeklyOnDays { days: BTreeSet<u8> },
    /// Opaque rule owned by the caller. The engine cannot expand it.
    Custom { payload: String },
}

impl ScheduleRule {
    pub fn every_n_days(n: u32) -> Self {
        ScheduleRule::EveryNDays { n }
    }

    pub fn daily() -> Self {
        ScheduleRule::EveryNDays { n: 1 }
    }

    pub fn weekly_on(days: impl IntoIterator<Item = u8>) -> Self {
        ScheduleRule::WeeklyOnDays {
            days: days.into_iter().collect(),
        }
    }

    pub fn custom(payload: impl Into<String>) -> Self {
        ScheduleRule::Custom {
            payload: payload.into(),
        }
    }

    /// False for rules the calculator cannot expand into dates.
    pub fn is_supported(&self) -> bool {
        !matches!(self, ScheduleRule::Custom { .. })
    }

    /// Interval length for fixed-interval rules.
    pub fn interval_days(&self) -> Option<u32> {
        match self {
            ScheduleRule::EveryNDays { n } => Some(*n),
            _ => None,
        }
    }

    /// True when `date` is a dosing weekday for a weekly rule.
    ///
    /// Interval rules are anchored to a start date, so this is only meaningful
    /// for `WeeklyOnDays`; other variants return false.
    pub fn matches_weekday(&self, date: NaiveDate) -> bool {
        match self {
            ScheduleRule::WeeklyOnDays { days } => days.contains(&weekday_index(date)),
            _ => false,
        }
    }
}

impl fmt::Display for ScheduleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleRule::EveryNDays { n: 1 } => write!(f, "daily"),
            ScheduleRule::EveryNDays { n } => write!(f, "every {n} days"),
            ScheduleRule::WeeklyOnDays { days } => {
                let names: Vec<&str> = days
                    .iter()
                    .map(|d| WEEKDAY_NAMES.get(usize::from(*d)).copied().unwrap_or("?"))
                    .collect();
                write!(f, "weekly on {}", names.join(", "))
            }
            ScheduleRule::Custom { payload } => write!(f, "custom: {payload}"),
        }
    }
}

/// Weekday of `date` as 0 (Sunday) ..= 6 (Saturday).
pub fn weekday_index(date: NaiveDate) -> u8 {
    // num_days_from_sunday is always < 7
    date.weekday().num_days_from_sunday() as u8
}
