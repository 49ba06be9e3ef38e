//! The fabric database
//!
//! `Fabric` owns every shared component: scope registry, sharded store,
//! key lock table, event log, vector indexes and the dispatcher. The
//! primitives (`KvStore`, `VectorStore`) are stateless facades over an
//! `Arc<Fabric>`.
//!
//! # Design
//!
//! - Disk-backed fabrics hold an exclusive `fs2` lock on `fabric.lock` so
//!   two processes never append to the same WAL.
//! - Opening replays `fabric.wal`; a torn tail is truncated and logged.
//! - There is no process-wide instance: each `Fabric` owns its dispatcher.

use crate::config::FabricConfig;
use crate::layered::LayeredMemory;
use crate::primitives::kv::KvStore;
use crate::primitives::vector::{VectorIndex, VectorStore};
use crate::recovery;
use crate::scoped::ScopedMemory;
use crate::scope::ScopeRegistry;
use dashmap::DashMap;
use fabric_concurrency::LockTable;
use fabric_core::{FabricError, FabricResult, PartitionId, ScopeHandle};
use fabric_dispatch::{
    Binding, DispatchStats, Dispatcher, DispatcherConfig, EventHandler, SubscriptionGuard,
    SubscriptionId,
};
use fabric_durability::{DurabilityMode, EventLog, WalReader, WalWriter, WAL_FILE_NAME};
use fabric_security::{authorize, AccessMode, CallerContext, OpenOptions, Operation};
use fabric_storage::ShardedStore;
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Name of the directory lock file.
pub const LOCK_FILE_NAME: &str = "fabric.lock";

/// Point-in-time counters.
#[derive(Debug, Clone, PartialEq)]
pub struct FabricStats {
    /// Scope partitions created
    pub partitions: usize,
    /// Live keys across all partitions
    pub keys: usize,
    /// Events held in history
    pub events: usize,
    /// Vectors across all scopes
    pub vectors: usize,
    /// Last log sequence number assigned
    pub last_lsn: u64,
    /// Key lock acquisitions that had to wait
    pub lock_contention: u64,
    /// Dispatcher counters
    pub dispatch: DispatchStats,
}

/// Shared memory for a set of cooperating agents.
pub struct Fabric {
    pub(crate) config: FabricConfig,
    pub(crate) options: OpenOptions,
    pub(crate) data_dir: Option<PathBuf>,
    pub(crate) scopes: ScopeRegistry,
    pub(crate) store: ShardedStore,
    pub(crate) locks: LockTable,
    pub(crate) log: EventLog,
    pub(crate) vectors: DashMap<PartitionId, Arc<RwLock<VectorIndex>>>,
    pub(crate) dispatcher: Dispatcher,
    _dir_lock: Option<File>,
}

impl Fabric {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Open (or create) a disk-backed fabric at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> FabricResult<Arc<Self>> {
        Self::open_with_options(path, OpenOptions::default())
    }

    /// Open with explicit options; configuration comes from `fabric.toml`.
    pub fn open_with_options(path: impl AsRef<Path>, options: OpenOptions) -> FabricResult<Arc<Self>> {
        let path = path.as_ref();
        prepare_dir(path, &options)?;
        // the lock must be held before fabric.toml is read or written
        let dir_lock = lock_dir(path, options.access_mode)?;
        let config = if options.access_mode.is_read_only() {
            let file = path.join(crate::config::CONFIG_FILE_NAME);
            if file.exists() {
                FabricConfig::from_file(&file)?
            } else {
                FabricConfig::default()
            }
        } else {
            FabricConfig::load_or_init(path)?
        };
        Self::open_inner(path, config, options, dir_lock)
    }

    /// Open with an explicit configuration, persisting it to `fabric.toml`.
    pub fn open_with(
        path: impl AsRef<Path>,
        config: FabricConfig,
        options: OpenOptions,
    ) -> FabricResult<Arc<Self>> {
        let path = path.as_ref();
        config.validate()?;
        prepare_dir(path, &options)?;
        let dir_lock = lock_dir(path, options.access_mode)?;
        if !options.access_mode.is_read_only() {
            config.write_to_file(&path.join(crate::config::CONFIG_FILE_NAME))?;
        }
        Self::open_inner(path, config, options, dir_lock)
    }

    fn open_inner(
        path: &Path,
        config: FabricConfig,
        options: OpenOptions,
        dir_lock: Option<File>,
    ) -> FabricResult<Arc<Self>> {
        let wal_path = path.join(WAL_FILE_NAME);

        let (log, records) = if config.durability.is_persistent() {
            let read = WalReader::read_all(&wal_path)?;
            if let Some(info) = &read.truncated {
                if options.access_mode.is_read_only() {
                    tracing::warn!(
                        target: "fabric::recovery",
                        path = %wal_path.display(),
                        discarded_bytes = info.discarded_bytes,
                        reason = %info.reason,
                        "Ignoring unreadable WAL tail (read-only open)"
                    );
                } else {
                    info.repair()?;
                }
            }
            let log = if options.access_mode.is_read_only() {
                EventLog::in_memory()
            } else {
                EventLog::with_writer(WalWriter::open(&wal_path, config.durability)?, config.durability)
            };
            (log, read.records)
        } else {
            (EventLog::in_memory(), Vec::new())
        };

        let fabric = Self::assemble(config, options, Some(path.to_path_buf()), log, dir_lock)?;
        let report = recovery::replay(&fabric, records)?;

        tracing::info!(
            target: "fabric::engine",
            path = %path.display(),
            durability = ?fabric.config.durability,
            access_mode = ?fabric.options.access_mode,
            records = report.records,
            changes = report.changes,
            vector_ops = report.vector_ops,
            partitions = fabric.scopes.len(),
            "Fabric opened"
        );
        Ok(Arc::new(fabric))
    }

    /// In-memory fabric with default configuration.
    pub fn ephemeral() -> FabricResult<Arc<Self>> {
        Self::ephemeral_with(FabricConfig::default())
    }

    /// In-memory fabric with `config`. Its durability setting is ignored.
    pub fn ephemeral_with(config: FabricConfig) -> FabricResult<Arc<Self>> {
        config.validate()?;
        let config = FabricConfig {
            durability: DurabilityMode::InMemory,
            ..config
        };
        let fabric = Self::assemble(config, OpenOptions::default(), None, EventLog::in_memory(), None)?;
        Ok(Arc::new(fabric))
    }

    fn assemble(
        config: FabricConfig,
        options: OpenOptions,
        data_dir: Option<PathBuf>,
        log: EventLog,
        dir_lock: Option<File>,
    ) -> FabricResult<Self> {
        let dispatcher = Dispatcher::new(DispatcherConfig {
            lanes: config.dispatch_lanes,
            lane_capacity: config.lane_capacity,
            handler_timeout: config.handler_timeout_duration(),
        })?;
        Ok(Self {
            locks: LockTable::new(config.lock_stripes),
            config,
            options,
            data_dir,
            scopes: ScopeRegistry::new(),
            store: ShardedStore::new(),
            log,
            vectors: DashMap::new(),
            dispatcher,
            _dir_lock: dir_lock,
        })
    }

    // ========================================================================
    // Primitives
    // ========================================================================

    /// Key-value facade.
    pub fn kv(self: &Arc<Self>) -> KvStore {
        KvStore::new(Arc::clone(self))
    }

    /// Vector facade.
    pub fn vectors(self: &Arc<Self>) -> VectorStore {
        VectorStore::new(Arc::clone(self))
    }

    /// Memory bound to one scope and one caller.
    pub fn scoped(self: &Arc<Self>, caller: CallerContext, scope: ScopeHandle) -> ScopedMemory {
        ScopedMemory::new(Arc::clone(self), caller, scope)
    }

    /// Memory of session `id`.
    pub fn session(self: &Arc<Self>, caller: CallerContext, id: impl Into<String>) -> ScopedMemory {
        self.scoped(caller, ScopeHandle::session(id))
    }

    /// Memory of the caller's own actor. `None` when the caller has no actor id.
    pub fn actor(self: &Arc<Self>, caller: CallerContext) -> Option<ScopedMemory> {
        let id = caller.actor_id.clone()?;
        Some(self.scoped(caller, ScopeHandle::actor(id)))
    }

    /// Memory of workflow `id`.
    pub fn workflow(self: &Arc<Self>, caller: CallerContext, id: impl Into<String>) -> ScopedMemory {
        self.scoped(caller, ScopeHandle::workflow(id))
    }

    /// Global memory.
    pub fn global(self: &Arc<Self>, caller: CallerContext) -> ScopedMemory {
        self.scoped(caller, ScopeHandle::global())
    }

    /// Memory resolved through the caller's workflow, session, actor and
    /// global scopes, in that order.
    pub fn memory(self: &Arc<Self>, caller: CallerContext) -> LayeredMemory {
        LayeredMemory::new(Arc::clone(self), caller)
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Allow workflow `id` to be used as a scope. Returns false if already known.
    pub fn register_workflow(&self, id: impl Into<String>) -> bool {
        self.scopes.register_workflow(id)
    }

    /// Whether workflow `id` is registered.
    pub fn is_workflow_registered(&self, id: &str) -> bool {
        self.scopes.is_registered(id)
    }

    /// Every scope that has a partition.
    pub fn scopes(&self) -> Vec<ScopeHandle> {
        self.scopes.partitions().into_iter().map(|(_, h)| h).collect()
    }

    pub(crate) fn authorize(
        &self,
        caller: &CallerContext,
        scope: &ScopeHandle,
        op: Operation,
    ) -> FabricResult<()> {
        authorize(self.options.access_mode, caller, scope, op)
    }

    pub(crate) fn vector_index(&self, partition: PartitionId) -> Arc<RwLock<VectorIndex>> {
        self.vectors.entry(partition).or_default().value().clone()
    }

    pub(crate) fn existing_vector_index(&self, partition: PartitionId) -> Option<Arc<RwLock<VectorIndex>>> {
        self.vectors.get(&partition).map(|i| i.value().clone())
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register `handler` for changes to keys matching any of `patterns`.
    ///
    /// A scope-bound subscription requires read access to that scope.
    pub fn subscribe<I, S>(
        &self,
        caller: &CallerContext,
        patterns: I,
        binding: Binding,
        handler: impl EventHandler,
    ) -> FabricResult<SubscriptionId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Binding::ScopeInstance(scope) = &binding {
            self.authorize(caller, scope, Operation::Read)?;
        }
        self.dispatcher.subscribe(patterns, binding, handler)
    }

    /// Like [`subscribe`](Self::subscribe), unregistering when the guard drops.
    pub fn subscribe_guarded<I, S>(
        &self,
        caller: &CallerContext,
        patterns: I,
        binding: Binding,
        handler: impl EventHandler,
    ) -> FabricResult<SubscriptionGuard>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Binding::ScopeInstance(scope) = &binding {
            self.authorize(caller, scope, Operation::Read)?;
        }
        self.dispatcher.subscribe_guarded(patterns, binding, handler)
    }

    /// Stop deliveries for `id`. Returns whether it was live.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Wait until every queued delivery has run.
    pub async fn quiesce(&self) {
        self.dispatcher.quiesce().await
    }

    /// Blocking [`quiesce`](Self::quiesce). False on timeout.
    pub fn quiesce_blocking(&self, timeout: Duration) -> bool {
        self.dispatcher.quiesce_blocking(timeout)
    }

    // ========================================================================
    // Lifecycle and introspection
    // ========================================================================

    /// Push buffered WAL frames to disk.
    pub fn flush(&self) -> FabricResult<()> {
        Ok(self.log.flush()?)
    }

    /// Flush, then drain and stop the dispatcher.
    pub async fn shutdown(&self) -> FabricResult<()> {
        self.flush()?;
        self.dispatcher.shutdown().await;
        tracing::info!(target: "fabric::engine", "Fabric shut down");
        Ok(())
    }

    /// Active configuration.
    pub fn config(&self) -> &FabricConfig {
        &self.config
    }

    /// Access mode the fabric was opened with.
    pub fn access_mode(&self) -> AccessMode {
        self.options.access_mode
    }

    /// Data directory, `None` for ephemeral fabrics.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// True for in-memory fabrics.
    pub fn is_ephemeral(&self) -> bool {
        self.data_dir.is_none()
    }

    /// Counters snapshot.
    pub fn stats(&self) -> FabricStats {
        FabricStats {
            partitions: self.scopes.len(),
            keys: self.store.total_entries(),
            events: self.log.total_events(),
            vectors: self.vectors.iter().map(|i| i.value().read().len()).sum(),
            last_lsn: self.log.last_lsn(),
            lock_contention: self.locks.contended(),
            dispatch: self.dispatcher.stats(),
        }
    }
}

impl Drop for Fabric {
    fn drop(&mut self) {
        if let Err(e) = self.log.flush() {
            tracing::warn!(target: "fabric::engine", error = %e, "Flush on close failed");
        }
    }
}

impl std::fmt::Debug for Fabric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fabric")
            .field("data_dir", &self.data_dir)
            .field("durability", &self.config.durability)
            .field("access_mode", &self.options.access_mode)
            .field("partitions", &self.scopes.len())
            .finish()
    }
}

fn prepare_dir(path: &Path, options: &OpenOptions) -> FabricResult<()> {
    if path.is_dir() {
        return Ok(());
    }
    if !options.create_if_missing || options.access_mode.is_read_only() {
        return Err(FabricError::Storage {
            message: format!("data directory {} does not exist", path.display()),
            source: None,
        });
    }
    std::fs::create_dir_all(path)
        .map_err(|e| FabricError::storage(format!("failed to create {}", path.display()), e))
}

fn lock_dir(path: &Path, mode: AccessMode) -> FabricResult<Option<File>> {
    let lock_path = path.join(LOCK_FILE_NAME);
    let file = if mode.is_read_only() {
        match File::open(&lock_path) {
            Ok(file) => file,
            // nothing ever wrote here, so nothing can be writing now
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FabricError::storage("failed to open lock file", e)),
        }
    } else {
        File::create(&lock_path).map_err(|e| FabricError::storage("failed to create lock file", e))?
    };

    let locked = if mode.is_read_only() {
        FileExt::try_lock_shared(&file)
    } else {
        FileExt::try_lock_exclusive(&file)
    };
    locked.map_err(|e| {
        FabricError::storage(
            format!("data directory {} is in use by another process", path.display()),
            e,
        )
    })?;
    Ok(Some(file))
}
