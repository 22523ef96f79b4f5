//! Protocol snapshot loader (JSON exported by the persistence layer).

use anyhow::{Context, Result, bail};
use cadence_core::Protocol;
use serde::Deserialize;
use std::path::Path;

use crate::types::ProtocolRecord;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ProtocolRecord>),
    One(Box<ProtocolRecord>),
}

/// Parse a JSON array of protocol records, or a single record.
/// Soft-deleted rows are dropped.
pub fn parse_protocols(json: &str) -> Result<Vec<ProtocolRecord>> {
    let parsed: OneOrMany = serde_json::from_str(json).context("parse protocol snapshot")?;
    let records = match parsed {
        OneOrMany::Many(v) => v,
        OneOrMany::One(r) => vec![*r],
    };
    Ok(records.into_iter().filter(|r| !r.is_deleted()).collect())
}

pub fn load_protocols(path: impl AsRef<Path>) -> Result<Vec<ProtocolRecord>> {
    let s = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read {}", path.as_ref().display()))?;
    parse_protocols(&s).with_context(|| format!("in {}", path.as_ref().display()))
}

/// Pick one record by id, or the only record when no id is given.
pub fn select_record<'a>(records: &'a [ProtocolRecord], id: Option<&str>) -> Result<&'a ProtocolRecord> {
    match id {
        Some(id) => records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow::anyhow!("protocol '{id}' not found in snapshot")),
        None => match records {
            [only] => Ok(only),
            [] => bail!("snapshot contains no protocols"),
            _ => bail!(
                "snapshot contains {} protocols; pass --id to choose one",
                records.len()
            ),
        },
    }
}

/// Select a record and validate it into a [`Protocol`].
pub fn find_protocol(records: &[ProtocolRecord], id: Option<&str>) -> Result<Protocol> {
    let record = select_record(records, id)?;
    let protocol = record.to_draft().into_protocol()?;
    Ok(protocol)
}
