//! Durability layer for the memory fabric
//!
//! - `wal`: framed, checksummed write-ahead log with torn-tail recovery
//! - `event_log`: per-partition sequenced history, optionally WAL-backed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event_log;
pub mod wal;

pub use event_log::{EventLog, LoggedEvent};
pub use wal::{
    DurabilityMode, TruncateInfo, TruncateReason, WalError, WalReadResult, WalReader, WalRecord,
    WalWriter, WAL_FILE_NAME,
};
