//! Fabric configuration
//!
//! Disk-backed fabrics persist their configuration as `fabric.toml` in the
//! data directory. The file is written with defaults on first open and read
//! back on every later open, so tuning survives restarts.
//!
//! ```toml
//! durability = "strict"
//! lock_stripes = 512
//! dispatch_lanes = 8
//! lane_capacity = 1024
//! handler_timeout_ms = 30000
//! history_cap = 1000
//! vector_metric = "cosine"
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use fabric_concurrency::DEFAULT_LOCK_STRIPES;
use fabric_core::{DistanceMetric, FabricError, FabricResult};
use fabric_dispatch::{DEFAULT_HANDLER_TIMEOUT, DEFAULT_LANE_CAPACITY};
use fabric_durability::DurabilityMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file inside a data directory.
pub const CONFIG_FILE_NAME: &str = "fabric.toml";

/// Default server-side cap on history page size.
pub const DEFAULT_HISTORY_CAP: usize = 1000;

/// Tunables for a fabric instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FabricConfig {
    /// WAL durability policy. Ignored by ephemeral fabrics.
    pub durability: DurabilityMode,
    /// Stripes in the key lock table (rounded up to a power of two)
    pub lock_stripes: usize,
    /// Dispatch lanes
    pub dispatch_lanes: usize,
    /// Pending deliveries per lane before the oldest is dropped
    pub lane_capacity: usize,
    /// Longest a subscription handler may run per event, 0 for no limit
    pub handler_timeout_ms: u64,
    /// Largest history page returned, whatever the caller asks for
    pub history_cap: usize,
    /// Similarity function for vector search
    pub vector_metric: DistanceMetric,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            durability: DurabilityMode::default(),
            lock_stripes: DEFAULT_LOCK_STRIPES,
            dispatch_lanes: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            lane_capacity: DEFAULT_LANE_CAPACITY,
            handler_timeout_ms: DEFAULT_HANDLER_TIMEOUT.as_millis() as u64,
            history_cap: DEFAULT_HISTORY_CAP,
            vector_metric: DistanceMetric::default(),
        }
    }
}

impl FabricConfig {
    /// Parse from TOML text and validate.
    pub fn from_toml_str(text: &str) -> FabricResult<Self> {
        let config: FabricConfig = toml::from_str(text)
            .map_err(|e| FabricError::invalid_input(format!("invalid fabric config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> FabricResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FabricError::storage(format!("failed to read config {}", path.display()), e)
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> FabricResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FabricError::serialization(format!("failed to encode config: {}", e)))
    }

    /// Write to `path`, replacing any existing file.
    pub fn write_to_file(&self, path: &Path) -> FabricResult<()> {
        let text = self.to_toml_string()?;
        std::fs::write(path, text).map_err(|e| {
            FabricError::storage(format!("failed to write config {}", path.display()), e)
        })
    }

    /// Load `fabric.toml` from `dir`, creating it with defaults if absent.
    pub fn load_or_init(dir: &Path) -> FabricResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::from_file(&path)
        } else {
            let config = Self::default();
            config.write_to_file(&path)?;
            Ok(config)
        }
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> FabricResult<()> {
        for (name, value) in [
            ("lock_stripes", self.lock_stripes),
            ("dispatch_lanes", self.dispatch_lanes),
            ("lane_capacity", self.lane_capacity),
            ("history_cap", self.history_cap),
        ] {
            if value == 0 {
                return Err(FabricError::invalid_input(format!(
                    "config field '{}' must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Set the durability mode.
    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }

    /// Set the history cap.
    pub fn history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    /// Set the vector metric.
    pub fn vector_metric(mut self, metric: DistanceMetric) -> Self {
        self.vector_metric = metric;
        self
    }

    /// Set the handler timeout; `None` lets handlers run unbounded.
    pub fn handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout_ms = timeout.map_or(0, |t| t.as_millis().max(1) as u64);
        self
    }

    /// Handler timeout as a duration.
    pub fn handler_timeout_duration(&self) -> Option<Duration> {
        (self.handler_timeout_ms > 0).then(|| Duration::from_millis(self.handler_timeout_ms))
    }

    /// Set dispatch lane count and capacity.
    pub fn dispatch(mut self, lanes: usize, lane_capacity: usize) -> Self {
        self.dispatch_lanes = lanes;
        self.lane_capacity = lane_capacity;
        self
    }
}
