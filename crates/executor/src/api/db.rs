//! Database operations: ping, stats, flush, configuration, workflows.

use super::FabricClient;
use crate::output::StatsInfo;
use crate::{Command, Error, Output, Result};
use fabric_engine::FabricConfig;

impl FabricClient {
    // =========================================================================
    // Database Operations (3)
    // =========================================================================

    /// Ping the fabric. Returns the server version.
    pub fn ping(&self) -> Result<String> {
        match self.executor.execute(&self.caller, Command::Ping)? {
            Output::Pong { version } => Ok(version),
            _ => Err(Error::unexpected_output("Ping")),
        }
    }

    /// Counters snapshot.
    pub fn stats(&self) -> Result<StatsInfo> {
        match self.executor.execute(&self.caller, Command::Stats)? {
            Output::Stats(stats) => Ok(stats),
            _ => Err(Error::unexpected_output("Stats")),
        }
    }

    /// Flush the WAL to disk.
    pub fn flush(&self) -> Result<()> {
        match self.executor.execute(&self.caller, Command::Flush)? {
            Output::Unit => Ok(()),
            _ => Err(Error::unexpected_output("Flush")),
        }
    }

    // =========================================================================
    // Configuration and scopes (2)
    // =========================================================================

    /// Active configuration, as persisted in `fabric.toml`.
    pub fn config(&self) -> Result<FabricConfig> {
        match self.executor.execute(&self.caller, Command::ConfigGet)? {
            Output::Config(cfg) => Ok(cfg),
            _ => Err(Error::unexpected_output("ConfigGet")),
        }
    }

    /// Allow `workflow_id` to be used as a scope. Returns whether it was new.
    pub fn register_workflow(&self, workflow_id: &str) -> Result<bool> {
        match self.executor.execute(
            &self.caller,
            Command::WorkflowRegister {
                workflow_id: workflow_id.to_string(),
            },
        )? {
            Output::Bool(added) => Ok(added),
            _ => Err(Error::unexpected_output("WorkflowRegister")),
        }
    }
}
