//! Reminder projection: turns previewed dose dates into reminder intents.
//!
//! Delivery is someone else's job. Intents are handed to the reminder
//! persistence layer, which dedupes on `dedupe_key`.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::protocol::Protocol;
use crate::rotation::next_site;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderIntent {
    pub intent_id: String,
    pub protocol_id: String,
    pub medication_ref: String,
    pub scheduled_for: NaiveDate,
    pub title: String,
    pub body: String,
    /// Suggested body site for this dose, when the protocol rotates sites.
    pub site: Option<String>,
    pub send_at_utc: DateTime<Utc>,
    pub dedupe_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReminderPolicy {
    pub max_reminders: usize,
    /// Minutes before the dose time to send.
    pub lead_minutes: i64,
    /// Local time of day doses are taken.
    pub dose_time: NaiveTime,
    pub timezone: Tz,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            max_reminders: 14,
            lead_minutes: 30,
            dose_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            timezone: Tz::UTC,
        }
    }
}

impl ReminderPolicy {
    /// UTC send instant for a dose on `date`.
    ///
    /// Ambiguous local times take the earlier instant. Times skipped by a DST
    /// jump, and leads that push the instant out of range, have no send instant.
    pub fn send_instant(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = self
            .timezone
            .from_local_datetime(&date.and_time(self.dose_time))
            .earliest()?;
        let lead = TimeDelta::try_minutes(self.lead_minutes)?;
        local.with_timezone(&Utc).checked_sub_signed(lead)
    }
}

/// Deterministically project occurrence dates into reminder intents.
///
/// Sends already in the past are dropped. Sites advance once per emitted
/// reminder, starting after `last_site`.
pub fn project_dose_reminders(
    protocol: &Protocol,
    occurrences: &[NaiveDate],
    last_site: Option<&str>,
    now: DateTime<Utc>,
    policy: &ReminderPolicy,
) -> Vec<ReminderIntent> {
    if !protocol.is_active {
        return vec![];
    }

    let rotation = protocol.site_rotation.as_deref().unwrap_or_default();
    let mut site_cursor = last_site.map(str::to_string);
    let title = format!("Dose due: {}", protocol.medication_ref);

    let mut out = Vec::new();
    for date in occurrences {
        if out.len() >= policy.max_reminders {
            break;
        }
        let Some(send_at) = policy.send_instant(*date) else {
            warn!(protocol = %protocol.id, date = %date, "no send instant for dose time; skipping reminder");
            continue;
        };
        if send_at <= now {
            continue;
        }

        let site = next_site(rotation, site_cursor.as_deref()).cloned();
        site_cursor = site.clone();

        let body = match &site {
            Some(s) => format!(
                "{} is scheduled for {} ({}). Suggested site: {}.",
                protocol.medication_ref, date, protocol.rule, s
            ),
            None => format!(
                "{} is scheduled for {} ({}).",
                protocol.medication_ref, date, protocol.rule
            ),
        };

        out.push(ReminderIntent {
            intent_id: format!("ri-{}-{}", protocol.id, date.format("%Y%m%d")),
            protocol_id: protocol.id.clone(),
            medication_ref: protocol.medication_ref.clone(),
            scheduled_for: *date,
            title: title.clone(),
            body,
            site,
            send_at_utc: send_at,
            // One reminder per occurrence, no matter how often we re-plan.
            dedupe_key: format!("{}:{}", protocol.id, date),
        });
    }

    out
}
