//! Protocol and administration-event models.
//!
//! Both are snapshots handed in by the persistence layer. The engine never
//! mutates them; storage, soft-delete and ownership live elsewhere.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::rule::ScheduleRule;

/// On/off cycling in whole weeks, counted from the protocol start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    pub active_weeks: u32,
    pub off_weeks: u32,
}

impl CycleConfig {
    pub fn new(active_weeks: u32, off_weeks: u32) -> Self {
        Self {
            active_weeks,
            off_weeks,
        }
    }

    /// Length of the active phase in days.
    pub fn active_days(&self) -> i64 {
        i64::from(self.active_weeks) * 7
    }

    /// Length of one full on+off cycle in days.
    pub fn total_days(&self) -> i64 {
        (i64::from(self.active_weeks) + i64::from(self.off_weeks)) * 7
    }
}

/// A schedulable medication protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
    /// Opaque key of the medication record, owned externally.
    pub medication_ref: String,
    pub rule: ScheduleRule,
    /// No occurrence precedes this date.
    pub start_date: NaiveDate,
    /// No occurrence follows this date.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub cycle: Option<CycleConfig>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Ordered body sites to rotate through (injectables, patches).
    #[serde(default)]
    pub site_rotation: Option<Vec<String>>,
}

fn default_active() -> bool {
    true
}

impl Protocol {
    pub fn new(
        id: impl Into<String>,
        medication_ref: impl Into<String>,
        rule: ScheduleRule,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            medication_ref: medication_ref.into(),
            rule,
            start_date,
            end_date: None,
            cycle: None,
            is_active: true,
            site_rotation: None,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_cycle(mut self, active_weeks: u32, off_weeks: u32) -> Self {
        self.cycle = Some(CycleConfig::new(active_weeks, off_weeks));
        self
    }

    pub fn with_site_rotation<I, S>(mut self, sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.site_rotation = Some(sites.into_iter().map(Into::into).collect());
        self
    }

    pub fn paused(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// True when `date` lies within `[start_date, end_date]`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.is_none_or(|end| date <= end)
    }
}

/// A recorded dose. Immutable fact supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrationEvent {
    pub protocol_id: String,
    pub occurred_at: DateTime<Utc>,
    /// Body site used, when the caller records one.
    #[serde(default)]
    pub site: Option<String>,
}

impl AdministrationEvent {
    pub fn new(protocol_id: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            protocol_id: protocol_id.into(),
            occurred_at,
            site: None,
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    /// Calendar date of the event in UTC.
    pub fn date(&self) -> NaiveDate {
        self.occurred_at.date_naive()
    }

    /// Calendar date of the event on the wall clock of `tz`.
    pub fn date_in(&self, tz: Tz) -> NaiveDate {
        self.occurred_at.with_timezone(&tz).date_naive()
    }
}

/// Site recorded on the most recent event for `protocol_id`, if any.
pub fn last_site_used<'a>(
    events: &'a [AdministrationEvent],
    protocol_id: &str,
) -> Option<&'a str> {
    events
        .iter()
        .filter(|e| e.protocol_id == protocol_id && e.site.is_some())
        .max_by_key(|e| e.occurred_at)
        .and_then(|e| e.site.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_covers_respects_bounds() {
        let p = Protocol::new("p1", "med-1", ScheduleRule::daily(), d(2024, 1, 1))
            .with_end_date(d(2024, 1, 31));
        assert!(!p.covers(d(2023, 12, 31)));
        assert!(p.covers(d(2024, 1, 1)));
        assert!(p.covers(d(2024, 1, 31)));
        assert!(!p.covers(d(2024, 2, 1)));
    }

    #[test]
    fn test_protocol_defaults_from_json() {
        let json = r#"{
            "id": "p1",
            "medication_ref": "med-9",
            "rule": {"type": "every_n_days", "n": 7},
            "start_date": "2024-01-01"
        }"#;
        let p: Protocol = serde_json::from_str(json).unwrap();
        assert!(p.is_active);
        assert_eq!(p.end_date, None);
        assert_eq!(p.rule, ScheduleRule::every_n_days(7));
    }

    #[test]
    fn test_event_date_in_timezone() {
        let e = AdministrationEvent::new("p1", Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap());
        assert_eq!(e.date(), d(2024, 1, 16));
        assert_eq!(e.date_in(chrono_tz::America::Chicago), d(2024, 1, 15));
        assert_eq!(e.date_in(Tz::UTC), e.date());
    }

    #[test]
    fn test_last_site_used_picks_latest() {
        let events = vec![
            AdministrationEvent::new("p1", Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap())
                .with_site("left thigh"),
            AdministrationEvent::new("p1", Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap())
                .with_site("right thigh"),
            AdministrationEvent::new("p2", Utc.with_ymd_and_hms(2024, 1, 9, 9, 0, 0).unwrap())
                .with_site("abdomen"),
            AdministrationEvent::new("p1", Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()),
        ];
        assert_eq!(last_site_used(&events, "p1"), Some("right thigh"));
        assert_eq!(last_site_used(&events, "p3"), None);
    }
}
