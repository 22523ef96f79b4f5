//! Time utilities: calendar dates from timezone-aware timestamps.
//!
//! The engine works on calendar dates. Callers normalise administration
//! timestamps into their patient's local date with these helpers first.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse an IANA timezone name like "America/Chicago".
pub fn parse_tz(tz: &str) -> Result<Tz> {
    tz.parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))
}

/// Local calendar date of a UTC instant in `tz`.
pub fn local_date(ts: DateTime<Utc>, tz: &str) -> Result<NaiveDate> {
    let tz = parse_tz(tz)?;
    Ok(ts.with_timezone(&tz).date_naive())
}

/// Parse a local timestamp like "2026-02-20 21:15" in `tz`, returning UTC.
pub fn parse_local_timestamp_to_utc(local: &str, tz: &str) -> Result<DateTime<Utc>> {
    let tz = parse_tz(tz)?;

    let ndt = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M")
        .map_err(|e| anyhow::anyhow!("invalid local datetime '{local}': {e}"))?;

    let local_dt = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| anyhow::anyhow!("ambiguous or invalid local time (DST?): {local} {tz}"))?;

    Ok(local_dt.with_timezone(&Utc))
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}
