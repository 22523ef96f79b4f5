//! Protocol validation.
//!
//! Checks accumulate: a draft with several problems reports all of them, in
//! field order, so a form can show every error at once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::protocol::{CycleConfig, Protocol};
use crate::rule::ScheduleRule;
use crate::time::parse_iso_date;

/// A single invariant violation. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("protocol id is required")]
    MissingId,
    #[error("schedule rule is required")]
    MissingRule,
    #[error("frequency must be at least 1 day")]
    FrequencyTooSmall,
    #[error("at least one day must be selected")]
    NoDaysSelected,
    #[error("day of week must be between 0 and 6 (got {0})")]
    DayOutOfRange(i64),
    #[error("start date is required")]
    MissingStartDate,
    #[error("start date must be a valid YYYY-MM-DD date (got '{0}')")]
    MalformedStartDate(String),
    #[error("end date must be a valid YYYY-MM-DD date (got '{0}')")]
    MalformedEndDate(String),
    #[error("end date must not be before start date")]
    EndBeforeStart,
    #[error("cycle must have at least 1 active week")]
    CycleWithoutActiveWeeks,
    #[error("site rotation entries must not be blank")]
    BlankRotationSite,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// User-facing messages, one per issue, in the order the checks ran.
    pub errors: Vec<String>,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            valid: issues.is_empty(),
            errors: issues.iter().map(ToString::to_string).collect(),
            issues,
        }
    }

    /// Messages in the order the checks ran.
    pub fn errors(&self) -> Vec<String> {
        self.errors.clone()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return write!(f, "protocol is valid");
        }
        write!(f, "invalid protocol: {}", self.errors().join("; "))
    }
}

impl std::error::Error for ValidationReport {}

/// Unvalidated protocol input, as typed into a form or read from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDraft {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub medication_ref: String,
    #[serde(default)]
    pub rule: Option<ScheduleRule>,
    /// ISO-8601 `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub cycle: Option<CycleConfig>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub site_rotation: Option<Vec<String>>,
    /// Weekday numbers exactly as entered, before narrowing into the rule.
    /// When present, range errors quote these values.
    #[serde(default)]
    pub entered_days: Option<Vec<i64>>,
}

fn default_active() -> bool {
    true
}

impl ProtocolDraft {
    pub fn new(id: impl Into<String>, medication_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            medication_ref: medication_ref.into(),
            rule: None,
            start_date: None,
            end_date: None,
            cycle: None,
            is_active: true,
            site_rotation: None,
            entered_days: None,
        }
    }

    pub fn with_rule(mut self, rule: ScheduleRule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn with_start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn with_end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
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

    pub fn with_entered_days(mut self, days: impl IntoIterator<Item = i64>) -> Self {
        self.entered_days = Some(days.into_iter().collect());
        self
    }

    /// Validate and convert into a [`Protocol`].
    pub fn into_protocol(self) -> Result<Protocol, ValidationReport> {
        let checked = check(&self);
        if !checked.issues.is_empty() {
            return Err(ValidationReport::from_issues(checked.issues));
        }
        let (Some(rule), Some(start_date)) = (self.rule, checked.start_date) else {
            // unreachable in practice: both absences are reported as issues
            return Err(ValidationReport::from_issues(vec![ValidationIssue::MissingRule]));
        };

        Ok(Protocol {
            id: self.id,
            medication_ref: self.medication_ref,
            rule,
            start_date,
            end_date: checked.end_date,
            cycle: self.cycle,
            is_active: self.is_active,
            site_rotation: self.site_rotation,
        })
    }
}

/// Check every protocol invariant on `draft`. Never panics.
pub fn validate(draft: &ProtocolDraft) -> ValidationReport {
    ValidationReport::from_issues(check(draft).issues)
}

struct Checked {
    issues: Vec<ValidationIssue>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

fn check(draft: &ProtocolDraft) -> Checked {
    let mut issues = Vec::new();

    if draft.id.trim().is_empty() {
        issues.push(ValidationIssue::MissingId);
    }

    match &draft.rule {
        None => issues.push(ValidationIssue::MissingRule),
        Some(ScheduleRule::EveryNDays { n }) => {
            if *n < 1 {
                issues.push(ValidationIssue::FrequencyTooSmall);
            }
        }
        Some(ScheduleRule::WeeklyOnDays { days }) => {
            if days.is_empty() {
                issues.push(ValidationIssue::NoDaysSelected);
            }
            match &draft.entered_days {
                Some(entered) => {
                    for day in entered.iter().filter(|d| !(0..=6).contains(*d)) {
                        issues.push(ValidationIssue::DayOutOfRange(*day));
                    }
                }
                None => {
                    for day in days.iter().filter(|d| **d > 6) {
                        issues.push(ValidationIssue::DayOutOfRange(i64::from(*day)));
                    }
                }
            }
        }
        Some(ScheduleRule::Custom { .. }) => {}
    }

    let start_date = match draft.start_date.as_deref().map(str::trim) {
        None | Some("") => {
            issues.push(ValidationIssue::MissingStartDate);
            None
        }
        Some(raw) => {
            let parsed = parse_iso_date(raw);
            if parsed.is_none() {
                issues.push(ValidationIssue::MalformedStartDate(raw.to_string()));
            }
            parsed
        }
    };

    let end_date = match draft.end_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = parse_iso_date(raw);
            if parsed.is_none() {
                issues.push(ValidationIssue::MalformedEndDate(raw.to_string()));
            }
            parsed
        }
    };

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            issues.push(ValidationIssue::EndBeforeStart);
        }
    }

    if let Some(cycle) = draft.cycle {
        if cycle.active_weeks < 1 {
            issues.push(ValidationIssue::CycleWithoutActiveWeeks);
        }
    }

    if let Some(sites) = &draft.site_rotation {
        if sites.iter().any(|s| s.trim().is_empty()) {
            issues.push(ValidationIssue::BlankRotationSite);
        }
    }

    Checked {
        issues,
        start_date,
        end_date,
    }
}
