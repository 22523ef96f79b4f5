//! cadence-core: recurring-dose scheduling and adherence engine
//!
//! Everything here is a pure function over values passed in by the caller:
//! no I/O, no shared state, safe to call from any thread.

pub mod rule;
pub mod protocol;
pub mod occurrence;
pub mod cycle;
pub mod preview;
pub mod adherence;
pub mod rotation;
pub mod validation;
pub mod reminders;
pub mod time;

pub use rule::{ScheduleRule, weekday_index};
pub use protocol::{AdministrationEvent, CycleConfig, Protocol, last_site_used};
pub use occurrence::{first_occurrence_on_or_after, next_occurrence};
pub use cycle::{CyclePhase, CyclePosition, cycle_position, is_active_phase};
pub use preview::{MAX_PREVIEW_ITERATIONS, Occurrences, preview};
pub use adherence::{
    AdherenceReport, AdherenceStatus, STREAK_TOLERANCE_DAYS, analyze, analyze_in_tz,
};
pub use rotation::{next_site, site_sequence};
pub use validation::{ProtocolDraft, ValidationIssue, ValidationReport, validate};
pub use reminders::{ReminderIntent, ReminderPolicy, project_dose_reminders};
