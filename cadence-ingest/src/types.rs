use cadence_core::{AdministrationEvent, CycleConfig, ProtocolDraft, ScheduleRule};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Protocol row as the persistence layer stores it: a string discriminator
/// plus optional per-type fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolRecord {
    pub id: String,
    #[serde(default)]
    pub medication_id: String,
    /// "every_n_days" | "interval" | "daily" | "weekly" | "specific_days" | "custom"
    pub schedule_type: String,
    #[serde(default)]
    pub frequency_days: Option<i64>,
    #[serde(default)]
    pub days_of_week: Option<Vec<i64>>,
    #[serde(default)]
    pub custom_rule: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub cycle_active_weeks: Option<i64>,
    #[serde(default)]
    pub cycle_off_weeks: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub site_rotation: Option<Vec<String>>,
    /// Soft-delete marker owned by the store.
    #[serde(default)]
    pub deleted_at: Option<String>,
}

fn default_active() -> bool {
    true
}

impl ProtocolRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The engine-side schedule rule for this row.
    ///
    /// Out-of-range numbers are carried through in a form validation rejects
    /// (zero interval, day 255) rather than being silently corrected.
    /// [`to_draft`](Self::to_draft) keeps the stored weekday values so the
    /// error quotes them.
    pub fn schedule_rule(&self) -> ScheduleRule {
        match self.schedule_type.trim().to_lowercase().as_str() {
            "every_n_days" | "interval" => {
                ScheduleRule::every_n_days(to_u32(self.frequency_days.unwrap_or(0)))
            }
            "daily" => ScheduleRule::every_n_days(to_u32(self.frequency_days.unwrap_or(1))),
            "weekly" | "specific_days" => ScheduleRule::weekly_on(
                self.days_of_week
                    .iter()
                    .flatten()
                    .map(|d| u8::try_from(*d).unwrap_or(u8::MAX)),
            ),
            "custom" => ScheduleRule::custom(self.custom_rule.clone().unwrap_or_default()),
            other => {
                warn!(protocol = %self.id, schedule_type = other, "unknown schedule type; treating as custom");
                ScheduleRule::custom(other)
            }
        }
    }

    /// Map into an unvalidated draft. Run `validate` / `into_protocol` next.
    pub fn to_draft(&self) -> ProtocolDraft {
        let cycle = match (self.cycle_active_weeks, self.cycle_off_weeks) {
            (None, None) => None,
            (active, off) => {
                if off.is_some_and(|o| o < 0) {
                    warn!(protocol = %self.id, "negative cycleOffWeeks clamped to 0");
                }
                Some(CycleConfig::new(
                    to_u32(active.unwrap_or(0)),
                    to_u32(off.unwrap_or(0)),
                ))
            }
        };

        let rule = self.schedule_rule();
        let entered_days = match &rule {
            ScheduleRule::WeeklyOnDays { .. } => self.days_of_week.clone(),
            _ => None,
        };

        ProtocolDraft {
            id: self.id.clone(),
            medication_ref: self.medication_id.clone(),
            rule: Some(rule),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            cycle,
            is_active: self.is_active,
            site_rotation: self.site_rotation.clone(),
            entered_days,
        }
    }
}

fn to_u32(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}

/// Events read from a dose log, plus how many rows could not be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    pub events: Vec<AdministrationEvent>,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> ProtocolRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_interval_record_to_rule() {
        let r = record(r#"{"id":"p1","medicationId":"m1","scheduleType":"every_n_days","frequencyDays":7,"startDate":"2024-01-01"}"#);
        assert_eq!(r.schedule_rule(), ScheduleRule::every_n_days(7));
        let p = r.to_draft().into_protocol().unwrap();
        assert_eq!(p.medication_ref, "m1");
    }

    #[test]
    fn test_weekly_record_with_bad_day_fails_validation() {
        let r = record(r#"{"id":"p1","scheduleType":"specific_days","daysOfWeek":[1,-3],"startDate":"2024-01-01"}"#);
        let report = cadence_core::validate(&r.to_draft());
        assert!(!report.valid);
        assert_eq!(report.errors(), vec!["day of week must be between 0 and 6 (got -3)"]);
    }

    #[test]
    fn test_oversized_day_quoted_as_stored() {
        let r = record(r#"{"id":"p1","scheduleType":"weekly","daysOfWeek":[7,300],"startDate":"2024-01-01"}"#);
        let report = cadence_core::validate(&r.to_draft());
        assert_eq!(
            report.errors(),
            vec![
                "day of week must be between 0 and 6 (got 7)",
                "day of week must be between 0 and 6 (got 300)",
            ]
        );
    }

    #[test]
    fn test_missing_frequency_is_reported() {
        let r = record(r#"{"id":"p1","scheduleType":"interval","startDate":"2024-01-01"}"#);
        let report = cadence_core::validate(&r.to_draft());
        assert_eq!(report.errors(), vec!["frequency must be at least 1 day"]);
    }

    #[test]
    fn test_unknown_type_becomes_custom() {
        let r = record(r#"{"id":"p1","scheduleType":"Monthly","startDate":"2024-01-01"}"#);
        assert_eq!(r.schedule_rule(), ScheduleRule::custom("monthly"));
    }

    #[test]
    fn test_cycle_fields() {
        let r = record(r#"{"id":"p1","scheduleType":"daily","startDate":"2024-01-01","cycleActiveWeeks":4,"cycleOffWeeks":1}"#);
        assert_eq!(r.to_draft().cycle, Some(CycleConfig::new(4, 1)));

        let no_active = record(r#"{"id":"p1","scheduleType":"daily","startDate":"2024-01-01","cycleOffWeeks":2}"#);
        let report = cadence_core::validate(&no_active.to_draft());
        assert_eq!(report.errors(), vec!["cycle must have at least 1 active week"]);
    }
}
