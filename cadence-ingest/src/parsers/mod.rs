//! Snapshot parsers, one per persisted format.

pub mod event_log;
pub mod protocol_snapshot;
