//! WAL (Write-Ahead Log) module
//!
//! - `mode`: durability policy (DurabilityMode)
//! - `frame`: length + CRC32 framing of records
//! - `record`: logged record types (WalRecord)
//! - `writer`: append-only WAL writer (WalWriter)
//! - `reader`: WAL reader with torn-tail detection (WalReader)

pub mod frame;
pub mod mode;
pub mod reader;
pub mod record;
pub mod writer;

use fabric_core::FabricError;
use std::path::PathBuf;
use thiserror::Error;

pub use frame::{encode_frame, read_frame, FrameRead, FRAME_HEADER_LEN, MAX_FRAME_PAYLOAD};
pub use mode::DurabilityMode;
pub use reader::{TruncateInfo, TruncateReason, WalReadResult, WalReader};
pub use record::WalRecord;
pub use writer::WalWriter;

/// File name of the log inside a data directory.
pub const WAL_FILE_NAME: &str = "fabric.wal";

/// Errors raised by the WAL layer.
#[derive(Debug, Error)]
pub enum WalError {
    /// Underlying file operation failed
    #[error("WAL I/O error at {}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded
    #[error("failed to encode WAL record: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// A checksummed frame holds bytes that are not a record
    #[error("undecodable WAL record at offset {offset}: {reason}")]
    Decode {
        /// Byte offset of the frame
        offset: u64,
        /// Decoder message
        reason: String,
    },

    /// Encoded record exceeds the frame limit
    #[error("WAL frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Payload length
        len: usize,
        /// Configured limit
        max: usize,
    },

    /// A previous append failed part-way; the writer refuses further appends
    #[error("WAL writer is poisoned by an earlier failed append")]
    Poisoned,
}

impl From<WalError> for FabricError {
    fn from(err: WalError) -> Self {
        match err {
            WalError::Io { path, source } => {
                FabricError::storage(format!("WAL I/O at {}", path.display()), source)
            }
            WalError::Encode(e) => FabricError::serialization(e.to_string()),
            WalError::Decode { offset, reason } => FabricError::Corruption { offset, reason },
            WalError::FrameTooLarge { len, max } => FabricError::invalid_input(format!(
                "record of {} bytes exceeds log frame limit of {}",
                len, max
            )),
            WalError::Poisoned => FabricError::Storage {
                message: "WAL writer is poisoned by an earlier failed append".to_string(),
                source: None,
            },
        }
    }
}
