//! Typed client API over the executor.
//!
//! [`FabricClient`] binds an [`Executor`] to one caller identity and turns
//! every `Output` back into a concrete Rust type.
//!
//! # Example
//!
//! ```text
//! use fabric_executor::FabricClient;
//!
//! let client = FabricClient::open("/path/to/data")?
//!     .with_caller(CallerContext::agent("planner"));
//!
//! let scope = ScopeHandle::session("u1");
//! client.kv_set(&scope, "prefs.theme", "dark")?;
//! let theme = client.kv_get(&scope, "prefs.theme")?;
//!
//! client.vectors().set(&scope, "doc.1", vec![0.1, 0.9], VectorMetadata::new())?;
//! ```

mod db;
mod kv;
mod vectors;

pub use vectors::Vectors;

use std::path::Path;
use std::sync::Arc;

use fabric_engine::Fabric;
use fabric_security::CallerContext;

use crate::{Executor, Result};

/// Executor bound to one caller.
#[derive(Clone)]
pub struct FabricClient {
    executor: Executor,
    caller: CallerContext,
}

impl FabricClient {
    /// Open a disk-backed fabric at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let fabric = Fabric::open(path)?;
        Ok(Self::from_fabric(fabric))
    }

    /// In-memory fabric.
    pub fn ephemeral() -> Result<Self> {
        Ok(Self::from_fabric(Fabric::ephemeral()?))
    }

    /// Wrap an existing fabric with an anonymous caller.
    pub fn from_fabric(fabric: Arc<Fabric>) -> Self {
        Self {
            executor: Executor::new(fabric),
            caller: CallerContext::anonymous(),
        }
    }

    /// Same fabric, different caller.
    pub fn with_caller(mut self, caller: CallerContext) -> Self {
        self.caller = caller;
        self
    }

    /// Caller used for every command.
    pub fn caller(&self) -> &CallerContext {
        &self.caller
    }

    /// The executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The underlying fabric, for subscriptions.
    pub fn fabric(&self) -> &Arc<Fabric> {
        self.executor.fabric()
    }

    /// Vector operations.
    pub fn vectors(&self) -> Vectors<'_> {
        Vectors::new(&self.executor, &self.caller)
    }
}
