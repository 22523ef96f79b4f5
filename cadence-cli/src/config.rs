use anyhow::{Context, Result, bail};
use cadence_core::ReminderPolicy;
use cadence_core::time::parse_tz;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_cadence_home;

/// Longest reminder lead accepted from config: one week.
const MAX_LEAD_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// IANA timezone used for "today", local dose-log timestamps and reminders.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub preview: PreviewSection,
    #[serde(default)]
    pub reminders: RemindersSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSection {
    pub horizon_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemindersSection {
    /// Local "HH:MM".
    pub dose_time: String,
    pub lead_minutes: i64,
    pub max_reminders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// tracing EnvFilter directive; RUST_LOG wins when set.
    pub filter: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self { horizon_days: 30 }
    }
}

impl Default for RemindersSection {
    fn default() -> Self {
        Self {
            dose_time: "09:00".to_string(),
            lead_minutes: 30,
            max_reminders: 14,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            preview: PreviewSection::default(),
            reminders: RemindersSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

impl Config {
    pub fn reminder_policy(&self) -> Result<ReminderPolicy> {
        let dose_time = NaiveTime::parse_from_str(self.reminders.dose_time.trim(), "%H:%M")
            .with_context(|| format!("invalid reminders.dose_time '{}'", self.reminders.dose_time))?;
        let lead = self.reminders.lead_minutes;
        if !(0..=MAX_LEAD_MINUTES).contains(&lead) {
            bail!("reminders.lead_minutes must be between 0 and {MAX_LEAD_MINUTES} (got {lead})");
        }
        Ok(ReminderPolicy {
            max_reminders: self.reminders.max_reminders,
            lead_minutes: self.reminders.lead_minutes,
            dose_time,
            timezone: parse_tz(&self.timezone)?,
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_cadence_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}
