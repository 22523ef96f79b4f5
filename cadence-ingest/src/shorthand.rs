//! Schedule shorthand parser.
//!
//! Accepts the phrases people type into a "how often?" box:
//!   daily | weekly | every other day | every 3 days | every 2 weeks
//!   mon,wed,fri | weekly on tue and thu | custom: <anything>

use anyhow::{Result, bail};
use cadence_core::ScheduleRule;
use regex::Regex;

/// Full day names and their common abbreviations. Anything else is rejected.
fn weekday_from_name(name: &str) -> Option<u8> {
    match name {
        "sun" | "sunday" => Some(0),
        "mon" | "monday" => Some(1),
        "tue" | "tues" | "tuesday" => Some(2),
        "wed" | "wednesday" => Some(3),
        "thu" | "thur" | "thurs" | "thursday" => Some(4),
        "fri" | "friday" => Some(5),
        "sat" | "saturday" => Some(6),
        _ => None,
    }
}

/// Parse a shorthand schedule description into a [`ScheduleRule`].
pub fn parse_schedule_shorthand(input: &str) -> Result<ScheduleRule> {
    let text = input.trim().to_lowercase();
    if text.is_empty() {
        bail!("empty schedule");
    }

    if let Some(payload) = text.strip_prefix("custom:") {
        let payload = payload.trim();
        if payload.is_empty() {
            bail!("custom schedule needs a description after 'custom:'");
        }
        // keep the caller's original casing
        let original = input
            .trim()
            .get("custom:".len()..)
            .map(str::trim)
            .unwrap_or(payload);
        return Ok(ScheduleRule::custom(original));
    }

    match text.as_str() {
        "daily" | "every day" | "once a day" => return Ok(ScheduleRule::daily()),
        "weekly" | "every week" | "once a week" => return Ok(ScheduleRule::every_n_days(7)),
        "every other day" => return Ok(ScheduleRule::every_n_days(2)),
        _ => {}
    }

    let every_re = Regex::new(r"^every\s+(?P<n>\d+)\s+(?P<unit>days?|weeks?)$")?;
    if let Some(caps) = every_re.captures(&text) {
        let n: u32 = caps["n"].parse()?;
        let days = if caps["unit"].starts_with("week") {
            n.checked_mul(7)
                .ok_or_else(|| anyhow::anyhow!("interval too large: {input}"))?
        } else {
            n
        };
        if days == 0 {
            bail!("interval must be at least 1 day: {input}");
        }
        return Ok(ScheduleRule::every_n_days(days));
    }

    let days_re = Regex::new(r"^(?:(?:weekly|every)\s+on\s+)?(?P<list>[a-z]+(?:\s*(?:,|and|&)\s*[a-z]+)*)$")?;
    if let Some(caps) = days_re.captures(&text) {
        let split_re = Regex::new(r"\s*(?:,|\band\b|&)\s*")?;
        let mut days = Vec::new();
        for name in split_re.split(&caps["list"]).filter(|s| !s.is_empty()) {
            match weekday_from_name(name) {
                Some(d) => days.push(d),
                None => bail!("unrecognized weekday '{name}' in schedule: {input}"),
            }
        }
        if !days.is_empty() {
            return Ok(ScheduleRule::weekly_on(days));
        }
    }

    bail!("unrecognized schedule: {input}")
}
