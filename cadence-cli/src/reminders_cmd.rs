use anyhow::Result;
use cadence_core::{
    AdministrationEvent, Protocol, ReminderIntent, last_site_used, preview, project_dose_reminders,
};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use crate::config::Config;

/// Project reminders for the upcoming horizon and print them as JSON lines,
/// ready for the reminder store to ingest.
pub fn run(
    protocol: &Protocol,
    events: &[AdministrationEvent],
    last_site: Option<String>,
    today: NaiveDate,
    horizon: u32,
    cfg: &Config,
) -> Result<()> {
    let intents = plan(protocol, events, last_site, today, Utc::now(), horizon, cfg)?;
    for intent in &intents {
        println!("{}", serde_json::to_string(intent)?);
    }
    info!(protocol = %protocol.id, count = intents.len(), "projected reminders");
    Ok(())
}

fn plan(
    protocol: &Protocol,
    events: &[AdministrationEvent],
    last_site: Option<String>,
    today: NaiveDate,
    now: DateTime<Utc>,
    horizon: u32,
    cfg: &Config,
) -> Result<Vec<ReminderIntent>> {
    let policy = cfg.reminder_policy()?;
    let dates = preview(protocol, today, horizon);

    // An explicit --last-site wins over what the dose log says.
    let last = last_site
        .as_deref()
        .or_else(|| last_site_used(events, &protocol.id));

    Ok(project_dose_reminders(protocol, &dates, last, now, &policy))
}
