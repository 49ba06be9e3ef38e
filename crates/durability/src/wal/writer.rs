//! Append-only WAL writer
//!
//! The writer is not internally synchronized; the event log serializes
//! appends behind its own mutex so that frame order equals lsn order.

use super::frame::encode_frame;
use super::{DurabilityMode, WalError, WalRecord};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends framed records to the log file.
pub struct WalWriter {
    path: PathBuf,
    file: BufWriter<File>,
    sync_every_append: bool,
    poisoned: bool,
    frames_written: u64,
}

impl WalWriter {
    /// Open (or create) the log at `path` for appending.
    pub fn open(path: &Path, mode: DurabilityMode) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| WalError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            sync_every_append: mode.syncs_every_append(),
            poisoned: false,
            frames_written: 0,
        })
    }

    /// Append one record.
    ///
    /// Encoding failures leave the file untouched. An I/O failure may have
    /// written a partial frame, so the writer poisons itself and rejects
    /// every later append; recovery truncates the torn tail.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), WalError> {
        if self.poisoned {
            return Err(WalError::Poisoned);
        }

        let frame = encode_frame(&record.encode()?)?;

        if let Err(source) = self.write_frame(&frame) {
            self.poisoned = true;
            tracing::error!(
                target: "fabric::wal",
                path = %self.path.display(),
                lsn = record.lsn(),
                error = %source,
                "WAL append failed; writer poisoned"
            );
            return Err(WalError::Io {
                path: self.path.clone(),
                source,
            });
        }

        self.frames_written += 1;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.file.write_all(frame)?;
        if self.sync_every_append {
            self.file.flush()?;
            self.file.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Push buffered frames to the OS and sync them.
    pub fn flush(&mut self) -> Result<(), WalError> {
        self.file
            .flush()
            .and_then(|_| self.file.get_ref().sync_data())
            .map_err(|source| WalError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames appended by this writer since open.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Whether an earlier append failed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

impl Drop for WalWriter {
    fn drop(&mut self) {
        if self.poisoned {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::warn!(target: "fabric::wal", error = %e, "WAL flush on close failed");
        }
    }
}

impl std::fmt::Debug for WalWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalWriter")
            .field("path", &self.path)
            .field("sync_every_append", &self.sync_every_append)
            .field("poisoned", &self.poisoned)
            .field("frames_written", &self.frames_written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::WalReader;
    use fabric_core::ScopeHandle;
    use tempfile::tempdir;

    fn delete_record(lsn: u64) -> WalRecord {
        WalRecord::VectorDelete {
            lsn,
            scope: ScopeHandle::session("s1"),
            key: format!("doc{}", lsn),
        }
    }

    #[test]
    fn test_append_then_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");

        {
            let mut writer = WalWriter::open(&path, DurabilityMode::Buffered).unwrap();
            for lsn in 1..=3 {
                writer.append(&delete_record(lsn)).unwrap();
            }
            assert_eq!(writer.frames_written(), 3);
        } // dropped -> flushed

        let result = WalReader::read_all(&path).unwrap();
        let lsns: Vec<u64> = result.records.iter().map(|(_, r)| r.lsn()).collect();
        assert_eq!(lsns, vec![1, 2, 3]);
        assert!(result.truncated.is_none());
    }

    #[test]
    fn test_strict_mode_visible_without_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strict.wal");

        let mut writer = WalWriter::open(&path, DurabilityMode::Strict).unwrap();
        writer.append(&delete_record(1)).unwrap();

        // Writer still open: the frame must already be on disk
        let result = WalReader::read_all(&path).unwrap();
        assert_eq!(result.records.len(), 1);
    }

    #[test]
    fn test_reopen_appends_after_existing_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.wal");

        {
            let mut writer = WalWriter::open(&path, DurabilityMode::Buffered).unwrap();
            writer.append(&delete_record(1)).unwrap();
        }
        {
            let mut writer = WalWriter::open(&path, DurabilityMode::Buffered).unwrap();
            writer.append(&delete_record(2)).unwrap();
        }

        let result = WalReader::read_all(&path).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.last_lsn(), Some(2));
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("x.wal");
        let err = WalWriter::open(&path, DurabilityMode::Buffered).unwrap_err();
        assert!(matches!(err, WalError::Io { .. }));
    }
}
