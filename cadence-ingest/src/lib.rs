//! cadence-ingest: adapters from persisted snapshots (protocol JSON, dose logs)
//! into engine types.

pub mod types;
pub mod shorthand;
pub mod parsers;

pub use types::{EventLog, ProtocolRecord};
pub use shorthand::parse_schedule_shorthand;
pub use parsers::event_log::{load_events_json, parse_event_log_csv, parse_event_log_reader};
pub use parsers::protocol_snapshot::{find_protocol, load_protocols, parse_protocols, select_record};
