//! Striped per-key lock table
//!
//! Writers to the same `(partition, key)` must be strictly ordered, while
//! writers to different keys proceed independently. A fixed array of
//! mutexes is indexed by an FxHash of the pair: two keys only contend when
//! they land on the same stripe.
//!
//! # Guarantees
//!
//! - Same `(partition, key)` always maps to the same stripe
//! - A `KeyGuard` held across read-modify-write gives no lost updates
//! - Readers never touch this table
//!
//! Stripe count is rounded up to a power of two so the index is a mask.

use fabric_core::PartitionId;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of stripes.
pub const DEFAULT_LOCK_STRIPES: usize = 256;

/// Fixed-size table of key-level write locks.
pub struct LockTable {
    stripes: Box<[Mutex<()>]>,
    mask: usize,
    acquisitions: AtomicU64,
    contended: AtomicU64,
}

/// Exclusive hold on one stripe.
///
/// Released on drop.
pub struct KeyGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    stripe: usize,
}

impl KeyGuard<'_> {
    /// Index of the held stripe.
    pub fn stripe(&self) -> usize {
        self.stripe
    }
}

impl LockTable {
    /// Create a table with at least `stripes` stripes (minimum 1).
    pub fn new(stripes: usize) -> Self {
        let count = stripes.max(1).next_power_of_two();
        let stripes: Vec<Mutex<()>> = (0..count).map(|_| Mutex::new(())).collect();
        Self {
            stripes: stripes.into_boxed_slice(),
            mask: count - 1,
            acquisitions: AtomicU64::new(0),
            contended: AtomicU64::new(0),
        }
    }

    /// Number of stripes.
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    /// Stripe index for a key.
    #[inline]
    pub fn stripe_for(&self, partition: PartitionId, key: &str) -> usize {
        let mut hasher = FxHasher::default();
        partition.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() as usize) & self.mask
    }

    /// Block until the key's stripe is held.
    pub fn lock(&self, partition: PartitionId, key: &str) -> KeyGuard<'_> {
        let stripe = self.stripe_for(partition, key);
        let mutex = &self.stripes[stripe];
        self.acquisitions.fetch_add(1, Ordering::Relaxed);

        let guard = match mutex.try_lock() {
            Some(guard) => guard,
            None => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                mutex.lock()
            }
        };

        KeyGuard {
            _guard: guard,
            stripe,
        }
    }

    /// Total lock acquisitions.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Acquisitions that had to wait for another holder.
    pub fn contended(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_STRIPES)
    }
}

impl std::fmt::Debug for LockTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockTable")
            .field("stripes", &self.stripe_count())
            .field("acquisitions", &self.acquisitions())
            .field("contended", &self.contended())
            .finish()
    }
}
