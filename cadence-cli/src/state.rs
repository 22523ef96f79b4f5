use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$CADENCE_HOME`, or `~/.cadence`.
pub fn cadence_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CADENCE_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".cadence"))
}

pub fn ensure_cadence_home() -> Result<PathBuf> {
    let dir = cadence_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
