//! Lock management for transaction isolation.
//!
//! This module implements a hierarchical lock table supporting:
//! - Five lock modes: intention-shared (IS), intention-exclusive (IX),
//!   shared (S), shared-intention-exclusive (SIX), and exclusive (X)
//! - Reentrant acquisition and in-place lock upgrades
//! - FIFO wait queues with asynchronous grant delivery
//! - Wait-die deadlock prevention
//! - Lock downgrades for next-key locking protocols
//!
//! # Lock Compatibility Matrix
//!
//! ```text
//!          │ IS  │ IX  │ S   │ SIX │ X   │
//! ─────────┼─────┼─────┼─────┼─────┼─────┤
//!     IS   │ ✓   │ ✓   │ ✓   │ ✓   │ ✗   │
//!     IX   │ ✓   │ ✓   │ ✗   │ ✗   │ ✗   │
//!     S    │ ✓   │ ✗   │ ✓   │ ✗   │ ✗   │
//!     SIX  │ ✓   │ ✗   │ ✗   │ ✗   │ ✗   │
//!     X    │ ✗   │ ✗   │ ✗   │ ✗   │ ✗   │
//! ```
//!
//! # Waiting
//!
//! `acquire` suspends on a oneshot channel when the request is incompatible
//! with current owners. A release (or downgrade) fulfills at most one
//! head-of-queue waiter, preserving FIFO ordering.
//!
//! # Wait-Die
//!
//! When the table is constructed with [`DeadlockPolicy::WaitDie`], a request
//! that would have to wait behind an *older* incompatible owner (lower
//! transaction ID) fails immediately instead of queuing. The caller retries
//! the whole logical operation under the same transaction ID so its priority
//! is preserved.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{RowId, Tuple, TxnId};

/// Lock mode for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockMode {
    /// Intention to take shared locks on finer-grained sub-resources.
    IntentShared,
    /// Intention to take exclusive locks on finer-grained sub-resources.
    IntentExclusive,
    /// Shared (read) lock.
    Shared,
    /// Shared lock plus intention-exclusive on sub-resources.
    SharedIntentExclusive,
    /// Exclusive (write) lock.
    Exclusive,
}

impl LockMode {
    /// Checks if this lock mode is compatible with another.
    pub const fn is_compatible_with(self, other: LockMode) -> bool {
        use LockMode::{Exclusive, IntentExclusive, IntentShared, Shared, SharedIntentExclusive};
        matches!(
            (self, other),
            (IntentShared, IntentShared)
                | (IntentShared, IntentExclusive)
                | (IntentShared, Shared)
                | (IntentShared, SharedIntentExclusive)
                | (IntentExclusive, IntentShared)
                | (IntentExclusive, IntentExclusive)
                | (Shared, IntentShared)
                | (Shared, Shared)
                | (SharedIntentExclusive, IntentShared)
        )
    }

    /// Returns the position of this mode in the total strength order
    /// `IS < IX < S < SIX < X`.
    #[inline]
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            LockMode::IntentShared => 0,
            LockMode::IntentExclusive => 1,
            LockMode::Shared => 2,
            LockMode::SharedIntentExclusive => 3,
            LockMode::Exclusive => 4,
        }
    }

    /// Returns the stronger of two lock modes.
    #[inline]
    #[must_use]
    pub const fn stronger(self, other: LockMode) -> LockMode {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }

    /// Returns true if this mode is at least as strong as `other`.
    #[inline]
    #[must_use]
    pub const fn covers(self, other: LockMode) -> bool {
        self.rank() >= other.rank()
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::IntentShared => write!(f, "IS"),
            LockMode::IntentExclusive => write!(f, "IX"),
            LockMode::Shared => write!(f, "S"),
            LockMode::SharedIntentExclusive => write!(f, "SIX"),
            LockMode::Exclusive => write!(f, "X"),
        }
    }
}

/// Deadlock prevention policy for a lock table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlockPolicy {
    /// No prevention: incompatible requests queue unconditionally.
    None,
    /// Wait-die: a younger transaction is rejected instead of waiting
    /// behind an older incompatible owner.
    #[default]
    WaitDie,
}

/// The key a lock protects.
///
/// Row keys guard primary row access; tuple keys guard projected index
/// key values (including the `INF` upper-bound sentinel).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// A primary row lock.
    Row(RowId),
    /// A projected index key lock.
    Key(Tuple),
}

impl LockKey {
    /// Creates a row lock key.
    #[inline]
    #[must_use]
    pub const fn row(row_id: RowId) -> Self {
        LockKey::Row(row_id)
    }

    /// Creates an index key lock key.
    #[inline]
    #[must_use]
    pub const fn key(key: Tuple) -> Self {
        LockKey::Key(key)
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Row(row_id) => write!(f, "row:{row_id}"),
            LockKey::Key(key) => write!(f, "key:{key}"),
        }
    }
}

impl From<RowId> for LockKey {
    #[inline]
    fn from(row_id: RowId) -> Self {
        LockKey::Row(row_id)
    }
}

impl From<Tuple> for LockKey {
    #[inline]
    fn from(key: Tuple) -> Self {
        LockKey::Key(key)
    }
}

/// A granted lock holder.
#[derive(Debug)]
struct LockHolder {
    /// The owning transaction.
    txn_id: TxnId,
    /// The effective granted mode.
    mode: LockMode,
}

/// A pending lock request in the FIFO wait queue.
struct LockWaiter {
    /// The requesting transaction.
    txn_id: TxnId,
    /// The requested mode.
    mode: LockMode,
    /// Fulfilled with the effective granted mode when the wait ends.
    grant: oneshot::Sender<LockMode>,
}

/// Per-key lock state: current owners plus the FIFO wait queue.
///
/// Invariant: all owners are pairwise compatible, or every owner belongs
/// to the same transaction (reentrant/upgrade case).
#[derive(Default)]
struct LockState {
    owners: Vec<LockHolder>,
    waiters: VecDeque<LockWaiter>,
}

impl LockState {
    fn owner_position(&self, txn_id: TxnId) -> Option<usize> {
        self.owners.iter().position(|o| o.txn_id == txn_id)
    }

    /// True if `mode` for `txn_id` conflicts with no *other* owner.
    fn admits(&self, txn_id: TxnId, mode: LockMode) -> bool {
        self.owners
            .iter()
            .all(|o| o.txn_id == txn_id || o.mode.is_compatible_with(mode))
    }
}

/// Statistics about a lock table.
#[derive(Debug, Default)]
pub struct LockStats {
    /// Total lock acquisitions (immediate and after waiting).
    pub acquisitions: AtomicU64,
    /// Total requests that had to queue.
    pub waits: AtomicU64,
    /// Total wait-die rejections.
    pub deadlocks_prevented: AtomicU64,
    /// Total lock releases.
    pub releases: AtomicU64,
    /// Total downgrades.
    pub downgrades: AtomicU64,
}

impl LockStats {
    /// Creates new stats.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_acquisition(&self) {
        self.acquisitions.fetch_add(1, AtomicOrdering::Relaxed);
    }

    fn record_wait(&self) {
        self.waits.fetch_add(1, AtomicOrdering::Relaxed);
    }

    fn record_deadlock_prevented(&self) {
        self.deadlocks_prevented.fetch_add(1, AtomicOrdering::Relaxed);
    }

    fn record_release(&self) {
        self.releases.fetch_add(1, AtomicOrdering::Relaxed);
    }

    fn record_downgrade(&self) {
        self.downgrades.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

/// A per-key lock table.
///
/// Each index owns one table over its projected key values; the store owns
/// one more over primary row IDs. Tables are independent: deadlock
/// prevention and release bookkeeping never cross tables.
pub struct LockTable {
    /// Per-key lock state.
    locks: DashMap<LockKey, Mutex<LockState>>,
    /// Keys held by each transaction, for bulk release.
    held: RwLock<HashMap<TxnId, HashSet<LockKey>>>,
    /// Deadlock prevention policy.
    policy: DeadlockPolicy,
    /// Statistics.
    stats: LockStats,
}

impl LockTable {
    /// Creates a lock table with the given deadlock policy.
    pub fn new(policy: DeadlockPolicy) -> Self {
        Self {
            locks: DashMap::new(),
            held: RwLock::new(HashMap::new()),
            policy,
            stats: LockStats::new(),
        }
    }

    /// Returns the deadlock prevention policy.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> DeadlockPolicy {
        self.policy
    }

    /// Returns statistics about this table.
    pub fn stats(&self) -> &LockStats {
        &self.stats
    }

    /// Acquires a lock, suspending until granted.
    ///
    /// Returns the *effective* granted mode, which may be stronger than the
    /// requested mode when the transaction already held the key (reentrant
    /// acquisition yields the max of held and requested modes).
    ///
    /// Fails with [`StrataError::DeadlockPrevented`] when wait-die refuses
    /// the wait; regular blocking never fails.
    pub async fn acquire(
        &self,
        txn_id: TxnId,
        key: LockKey,
        mode: LockMode,
    ) -> StrataResult<LockMode> {
        let rx = {
            let entry = self.locks.entry(key.clone()).or_default();
            let mut state = entry.value().lock();

            if let Some(pos) = state.owner_position(txn_id) {
                let held = state.owners[pos].mode;
                if held.covers(mode) {
                    // Reentrant at an equal-or-stronger mode.
                    self.stats.record_acquisition();
                    return Ok(held);
                }
                if state.admits(txn_id, mode) {
                    // Upgrade in place: no other owner conflicts.
                    let effective = held.stronger(mode);
                    state.owners[pos].mode = effective;
                    self.stats.record_acquisition();
                    return Ok(effective);
                }
            } else if state.admits(txn_id, mode) {
                state.owners.push(LockHolder { txn_id, mode });
                self.record_held(txn_id, &key);
                self.stats.record_acquisition();
                return Ok(mode);
            }

            // The request must wait. Under wait-die, a requester younger
            // than any incompatible owner dies instead.
            if self.policy == DeadlockPolicy::WaitDie {
                let blocked_by_older = state.owners.iter().any(|o| {
                    o.txn_id != txn_id
                        && !o.mode.is_compatible_with(mode)
                        && o.txn_id.is_older_than(txn_id)
                });
                if blocked_by_older {
                    self.stats.record_deadlock_prevented();
                    debug!(%txn_id, %key, %mode, "wait-die rejected lock wait");
                    return Err(StrataError::DeadlockPrevented { txn_id });
                }
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(LockWaiter {
                txn_id,
                mode,
                grant: tx,
            });
            self.stats.record_wait();
            trace!(%txn_id, %key, %mode, "lock request queued");
            rx
        };

        let granted = rx.await.map_err(|_| {
            StrataError::internal("lock waiter abandoned before grant")
        })?;
        self.record_held(txn_id, &key);
        self.stats.record_acquisition();
        Ok(granted)
    }

    /// Releases one key held by a transaction.
    ///
    /// If the release leaves the head-of-queue waiter grantable, exactly one
    /// waiter is promoted (FIFO single promotion).
    pub fn release(&self, txn_id: TxnId, key: &LockKey) -> bool {
        let mut released = false;
        let mut now_empty = false;

        if let Some(entry) = self.locks.get(key) {
            let mut state = entry.value().lock();
            if let Some(pos) = state.owner_position(txn_id) {
                state.owners.remove(pos);
                released = true;
                self.stats.record_release();
                self.promote_head(key, &mut state);
            }
            now_empty = state.owners.is_empty() && state.waiters.is_empty();
        }

        if released {
            if let Some(keys) = self.held.write().get_mut(&txn_id) {
                keys.remove(key);
            }
        }

        if now_empty {
            // Re-checked under the shard write lock so a concurrent acquire
            // cannot be stranded on a removed entry.
            self.locks.remove_if(key, |_, state| {
                let state = state.lock();
                state.owners.is_empty() && state.waiters.is_empty()
            });
        }

        released
    }

    /// Releases every key held by a transaction. Returns the release count.
    pub fn release_all(&self, txn_id: TxnId) -> usize {
        let keys: Vec<LockKey> = {
            let held = self.held.read();
            held.get(&txn_id)
                .map(|keys| keys.iter().cloned().collect())
                .unwrap_or_default()
        };

        let count = keys.len();
        for key in &keys {
            self.release(txn_id, key);
        }
        self.held.write().remove(&txn_id);
        count
    }

    /// Downgrades a held lock to a weaker mode, returning the new effective
    /// mode.
    ///
    /// Used by next-key locking: an inserter that was granted an escalated
    /// mode on the successor key sheds it back to the intent mode once the
    /// insert no longer needs exclusivity. A downgrade may unblock the
    /// head-of-queue waiter.
    pub fn downgrade(
        &self,
        txn_id: TxnId,
        key: &LockKey,
        to: LockMode,
    ) -> StrataResult<LockMode> {
        let entry = self.locks.get(key).ok_or_else(|| {
            StrataError::internal(format!("downgrade of unheld key {key}"))
        })?;
        let mut state = entry.value().lock();

        let pos = state.owner_position(txn_id).ok_or_else(|| {
            StrataError::internal(format!(
                "transaction {txn_id} does not hold key {key}"
            ))
        })?;

        if state.owners[pos].mode.rank() > to.rank() {
            state.owners[pos].mode = to;
            self.stats.record_downgrade();
            trace!(%txn_id, %key, %to, "lock downgraded");
            self.promote_head(key, &mut state);
        }
        Ok(state.owners[pos].mode)
    }

    /// Returns the mode a transaction currently holds on a key, if any.
    #[must_use]
    pub fn held_mode(&self, txn_id: TxnId, key: &LockKey) -> Option<LockMode> {
        let entry = self.locks.get(key)?;
        let state = entry.value().lock();
        state
            .owner_position(txn_id)
            .map(|pos| state.owners[pos].mode)
    }

    /// Returns the number of keys with live lock state.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Returns the number of waiters queued on a key.
    #[must_use]
    pub fn waiter_count(&self, key: &LockKey) -> usize {
        self.locks
            .get(key)
            .map_or(0, |entry| entry.value().lock().waiters.len())
    }

    fn record_held(&self, txn_id: TxnId, key: &LockKey) {
        self.held
            .write()
            .entry(txn_id)
            .or_default()
            .insert(key.clone());
    }

    /// Grants the head-of-queue waiter if it no longer conflicts.
    ///
    /// At most one waiter is promoted per call. The waiter is grantable when
    /// every remaining owner is compatible with its request or is its own
    /// transaction (upgrade completion).
    fn promote_head(&self, key: &LockKey, state: &mut LockState) {
        while let Some(waiter) = state.waiters.front() {
            if !state.admits(waiter.txn_id, waiter.mode) {
                break;
            }

            let waiter = state
                .waiters
                .pop_front()
                .expect("front waiter checked above");

            let (granted, upgraded_from) = match state.owner_position(waiter.txn_id) {
                Some(pos) => {
                    let prev = state.owners[pos].mode;
                    let effective = prev.stronger(waiter.mode);
                    state.owners[pos].mode = effective;
                    (effective, Some((pos, prev)))
                }
                None => {
                    state.owners.push(LockHolder {
                        txn_id: waiter.txn_id,
                        mode: waiter.mode,
                    });
                    (waiter.mode, None)
                }
            };

            match waiter.grant.send(granted) {
                Ok(()) => {
                    trace!(txn_id = %waiter.txn_id, %key, %granted, "waiter promoted");
                    break;
                }
                Err(_) => {
                    // The waiter dropped its receiver; undo and try the next.
                    match upgraded_from {
                        Some((pos, prev)) => state.owners[pos].mode = prev,
                        None => {
                            state.owners.pop();
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Debug for LockTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockTable")
            .field("policy", &self.policy)
            .field("lock_count", &self.lock_count())
            .finish()
    }
}
