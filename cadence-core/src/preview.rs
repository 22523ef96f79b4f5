//! Schedule preview: a bounded, lazy walk over upcoming occurrences.
//!
//! The walk starts at the first scheduled date on or after `today` (never
//! before the protocol start) and stops at whichever comes first:
//! the horizon, the protocol end date, an unsupported rule, a non-advancing
//! rule, or [`MAX_PREVIEW_ITERATIONS`] steps.

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::cycle::is_active_phase;
use crate::occurrence::{first_occurrence_on_or_after, next_occurrence};
use crate::protocol::Protocol;

/// Hard ceiling on calculator steps per preview.
pub const MAX_PREVIEW_ITERATIONS: usize = 1000;

/// Lazy iterator over a protocol's upcoming occurrence dates.
///
/// Off-phase dates (cycling, paused protocols) are skipped but still count
/// towards the iteration ceiling.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    protocol: &'a Protocol,
    cursor: Option<NaiveDate>,
    limit: NaiveDate,
    iterations: usize,
}

impl<'a> Occurrences<'a> {
    pub fn new(protocol: &'a Protocol, today: NaiveDate, horizon_days: u32) -> Self {
        let horizon_end = today
            .checked_add_days(Days::new(u64::from(horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        let limit = match protocol.end_date {
            Some(end) => end.min(horizon_end),
            None => horizon_end,
        };

        let cursor = if protocol.is_active {
            first_occurrence_on_or_after(&protocol.rule, protocol.start_date, today)
        } else {
            None
        };

        Self {
            protocol,
            cursor,
            limit,
            iterations: 0,
        }
    }

    /// Steps taken so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        loop {
            let candidate = self.cursor?;
            if candidate > self.limit {
                self.cursor = None;
                return None;
            }
            if self.iterations >= MAX_PREVIEW_ITERATIONS {
                debug!(
                    protocol = %self.protocol.id,
                    ceiling = MAX_PREVIEW_ITERATIONS,
                    "preview truncated at iteration ceiling"
                );
                self.cursor = None;
                return None;
            }
            self.iterations += 1;

            self.cursor = match next_occurrence(&self.protocol.rule, candidate) {
                Some(next) if next > candidate => Some(next),
                Some(_) => {
                    debug!(protocol = %self.protocol.id, "schedule rule does not advance; stopping preview");
                    None
                }
                None => None,
            };

            if is_active_phase(self.protocol, candidate) {
                return Some(candidate);
            }
        }
    }
}

/// Upcoming occurrence dates within `horizon_days` of `today`.
pub fn preview(protocol: &Protocol, today: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
    Occurrences::new(protocol, today, horizon_days).collect()
}
