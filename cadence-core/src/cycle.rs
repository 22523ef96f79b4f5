//! Cycle evaluator: on/off phases for protocols that cycle in whole weeks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::protocol::Protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Active,
    Off,
}

/// Where a date falls inside a protocol's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclePosition {
    /// 1-based index of the cycle containing the date.
    pub cycle_number: i64,
    /// 0-based day within the current cycle.
    pub day_in_cycle: i64,
    pub phase: CyclePhase,
    /// Days until the phase flips, counting `date` itself.
    pub days_left_in_phase: i64,
}

/// Whether `check_date` falls in an active phase of `protocol`.
///
/// Without a cycle this is just `protocol.is_active`. Dates before the start
/// date are never active.
pub fn is_active_phase(protocol: &Protocol, check_date: NaiveDate) -> bool {
    if !protocol.is_active {
        return false;
    }
    match protocol.cycle {
        None => true,
        Some(_) => cycle_position(protocol, check_date)
            .is_some_and(|pos| pos.phase == CyclePhase::Active),
    }
}

/// Position of `date` within the protocol's cycle.
///
/// `None` when the protocol has no cycle, the date precedes the start date,
/// or the cycle has zero length (rejected by validation).
pub fn cycle_position(protocol: &Protocol, date: NaiveDate) -> Option<CyclePosition> {
    let cycle = protocol.cycle?;
    let total = cycle.total_days();
    if total <= 0 {
        return None;
    }

    let days_since_start = (date - protocol.start_date).num_days();
    if days_since_start < 0 {
        return None;
    }

    let day_in_cycle = days_since_start.rem_euclid(total);
    let active_days = cycle.active_days();
    let (phase, days_left_in_phase) = if day_in_cycle < active_days {
        (CyclePhase::Active, active_days - day_in_cycle)
    } else {
        (CyclePhase::Off, total - day_in_cycle)
    };

    Some(CyclePosition {
        cycle_number: days_since_start / total + 1,
        day_in_cycle,
        phase,
        days_left_in_phase,
    })
}
