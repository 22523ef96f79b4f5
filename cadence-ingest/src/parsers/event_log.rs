//! Dose log parsers.
//!
//! CSV exports look like:
//!   protocol_id,occurred_at,site
//!   p1,2024-01-01T08:30:00Z,left thigh
//!   p1,2024-01-08 08:45,right thigh
//!
//! `occurred_at` is RFC-3339, or a local "YYYY-MM-DD HH:MM" read in the
//! caller's timezone. `site` is optional.

use anyhow::{Context, Result};
use cadence_core::AdministrationEvent;
use cadence_core::time::parse_local_timestamp_to_utc;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::warn;

use crate::types::EventLog;

#[derive(Debug, Deserialize)]
struct EventRow {
    protocol_id: String,
    occurred_at: String,
    #[serde(default)]
    site: Option<String>,
}

fn parse_occurred_at(raw: &str, tz: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_local_timestamp_to_utc(raw, tz).ok()
}

/// Parse a dose-log CSV file. Rows that cannot be read are skipped and counted.
pub fn parse_event_log_csv(path: impl AsRef<Path>, tz: &str) -> Result<EventLog> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;
    parse_event_log_reader(file, tz)
}

/// Parse dose-log CSV from any reader.
pub fn parse_event_log_reader<R: Read>(reader: R, tz: &str) -> Result<EventLog> {
    // Fail fast on a bad timezone instead of skipping every local row.
    cadence_core::time::parse_tz(tz)?;

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut log = EventLog::default();

    for (line, result) in rdr.deserialize::<EventRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(line = line + 2, error = %e, "skipping unreadable dose log row");
                log.skipped += 1;
                continue;
            }
        };

        if row.protocol_id.is_empty() {
            log.skipped += 1;
            continue;
        }

        let Some(occurred_at) = parse_occurred_at(&row.occurred_at, tz) else {
            warn!(line = line + 2, occurred_at = %row.occurred_at, "skipping dose log row with bad timestamp");
            log.skipped += 1;
            continue;
        };

        let mut event = AdministrationEvent::new(row.protocol_id, occurred_at);
        if let Some(site) = row.site.filter(|s| !s.is_empty()) {
            event = event.with_site(site);
        }
        log.events.push(event);
    }

    Ok(log)
}

/// Load a JSON array of administration events.
pub fn load_events_json(path: impl AsRef<Path>) -> Result<Vec<AdministrationEvent>> {
    let s = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read {}", path.as_ref().display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.as_ref().display()))
}
