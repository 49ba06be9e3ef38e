//! Durability policy

use serde::{Deserialize, Serialize};

/// How hard the log works to survive a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityMode {
    /// No log file; history lives only in memory
    InMemory,
    /// Frames are buffered and reach disk on flush, drop, or buffer pressure
    #[default]
    Buffered,
    /// Every append is flushed and fsynced before the write returns
    Strict,
}

impl DurabilityMode {
    /// Whether this mode writes a log file.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, DurabilityMode::InMemory)
    }

    /// Whether every append is synced.
    pub fn syncs_every_append(&self) -> bool {
        matches!(self, DurabilityMode::Strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags() {
        assert!(!DurabilityMode::InMemory.is_persistent());
        assert!(DurabilityMode::Buffered.is_persistent());
        assert!(DurabilityMode::Strict.syncs_every_append());
        assert!(!DurabilityMode::Buffered.syncs_every_append());
        assert_eq!(DurabilityMode::default(), DurabilityMode::Buffered);
    }
}
