//! WAL reader with torn-tail detection
//!
//! Reading stops at the first frame that is incomplete, fails its
//! checksum, or announces an impossible length. Everything before that
//! point is returned; the rest is reported in `TruncateInfo` so the
//! caller can cut the file back with [`TruncateInfo::repair`].
//!
//! A frame that passes its checksum but does not decode is different: the
//! bytes are exactly what was written, so this is a hard `Decode` error
//! rather than a torn tail.

use super::frame::{read_frame, FrameRead};
use super::{WalError, WalRecord};
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Why reading stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruncateReason {
    /// File ends inside a frame
    TornFrame,
    /// Frame payload fails its CRC
    ChecksumMismatch {
        /// CRC in the header
        expected: u32,
        /// CRC of the payload
        actual: u32,
    },
    /// Header length is out of range
    BadLength {
        /// Announced length
        len: usize,
    },
}

impl std::fmt::Display for TruncateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TruncateReason::TornFrame => write!(f, "torn frame"),
            TruncateReason::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch (expected {:08x}, got {:08x})", expected, actual)
            }
            TruncateReason::BadLength { len } => write!(f, "bad frame length {}", len),
        }
    }
}

/// Unreadable tail found at the end of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncateInfo {
    /// File the tail belongs to
    pub path: PathBuf,
    /// Byte length of the valid prefix
    pub valid_up_to: u64,
    /// Bytes after the valid prefix
    pub discarded_bytes: u64,
    /// Why the first bad frame was rejected
    pub reason: TruncateReason,
}

impl TruncateInfo {
    /// Cut the file back to its valid prefix.
    pub fn repair(&self) -> Result<(), WalError> {
        let io_err = |source| WalError::Io {
            path: self.path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.set_len(self.valid_up_to).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        tracing::warn!(
            target: "fabric::wal",
            path = %self.path.display(),
            valid_up_to = self.valid_up_to,
            discarded_bytes = self.discarded_bytes,
            reason = %self.reason,
            "Truncated unreadable WAL tail"
        );
        Ok(())
    }
}

/// Everything recovered from one log file.
#[derive(Debug, Default)]
pub struct WalReadResult {
    /// Records in file order, each with its frame offset
    pub records: Vec<(u64, WalRecord)>,
    /// Present when a bad tail was found
    pub truncated: Option<TruncateInfo>,
}

impl WalReadResult {
    /// Highest lsn recovered.
    pub fn last_lsn(&self) -> Option<u64> {
        self.records.iter().map(|(_, r)| r.lsn()).max()
    }
}

/// Reads a log file front to back.
pub struct WalReader;

impl WalReader {
    /// Read every intact record in `path`. A missing file is empty.
    pub fn read_all(path: &Path) -> Result<WalReadResult, WalError> {
        let bytes = match File::open(path) {
            Ok(mut file) => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf).map_err(|source| WalError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                buf
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(WalReadResult::default())
            }
            Err(source) => {
                return Err(WalError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::read_bytes(path, &bytes)
    }

    fn read_bytes(path: &Path, bytes: &[u8]) -> Result<WalReadResult, WalError> {
        let mut result = WalReadResult::default();
        let mut offset = 0usize;

        while offset < bytes.len() {
            let reason = match read_frame(&bytes[offset..]) {
                FrameRead::Frame { payload, consumed } => {
                    let record = WalRecord::decode(payload, offset as u64)?;
                    result.records.push((offset as u64, record));
                    offset += consumed;
                    continue;
                }
                FrameRead::Incomplete => TruncateReason::TornFrame,
                FrameRead::ChecksumMismatch { expected, actual } => {
                    TruncateReason::ChecksumMismatch { expected, actual }
                }
                FrameRead::Oversized { len } => TruncateReason::BadLength { len },
            };

            result.truncated = Some(TruncateInfo {
                path: path.to_path_buf(),
                valid_up_to: offset as u64,
                discarded_bytes: (bytes.len() - offset) as u64,
                reason,
            });
            break;
        }

        Ok(result)
    }
}
