//! The version-chain row store.
//!
//! [`RowStore`] owns every chain head, keyed by [`RowId`]. It allocates row
//! identifiers, forwards chain mutations, and removes chains emptied by the
//! abort of a pure insert. Secondary indexes hold row IDs into this store
//! and resolve through it; they never own row data.
//!
//! The store performs no locking of its own: callers serialize writers to a
//! chain through the row-level lock acquired upstream, and the per-chain
//! `RwLock` only guards physical access so that snapshot reads may run
//! concurrently with writes to other rows.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use dashmap::DashMap;
use parking_lot::RwLock;

use strata_common::constants::DEFAULT_MAX_CHAIN_VERSIONS;
use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{ReadView, RowId, Timestamp, Tuple, TxnId};

use crate::chain::{VersionChain, VersionFilter, WriteOutcome};

/// Owns the set of all version chains.
pub struct RowStore {
    /// All chains, keyed by row ID.
    chains: DashMap<RowId, RwLock<VersionChain>>,
    /// Next row ID to allocate.
    next_row_id: AtomicU64,
    /// Version retention cap applied to every chain.
    max_versions: usize,
}

impl RowStore {
    /// Creates a row store with the default chain cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_versions(DEFAULT_MAX_CHAIN_VERSIONS)
    }

    /// Creates a row store with a specific chain cap.
    #[must_use]
    pub fn with_max_versions(max_versions: usize) -> Self {
        Self {
            chains: DashMap::new(),
            next_row_id: AtomicU64::new(RowId::FIRST.as_u64()),
            max_versions: max_versions.max(2),
        }
    }

    /// Returns the number of live chains.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.chains.len()
    }

    /// Returns true if a chain exists for the row.
    #[must_use]
    pub fn contains(&self, row_id: RowId) -> bool {
        self.chains.contains_key(&row_id)
    }

    /// Creates a new chain for an uncommitted insert and returns its row ID.
    ///
    /// The value must be a real tuple; the sentinels are reserved.
    pub fn insert(&self, value: Tuple, txn_id: TxnId) -> StrataResult<RowId> {
        if !value.is_data() {
            return Err(StrataError::InvalidArgument {
                message: "cannot insert a sentinel tuple".to_string(),
            });
        }

        let row_id = RowId::new(self.next_row_id.fetch_add(1, AtomicOrdering::SeqCst));
        let chain = VersionChain::begin_insert(value, txn_id, self.max_versions);
        self.chains.insert(row_id, RwLock::new(chain));
        Ok(row_id)
    }

    /// Applies a write to an existing chain. Returns the superseded value.
    pub fn add_write(
        &self,
        row_id: RowId,
        value: Tuple,
        txn_id: TxnId,
    ) -> StrataResult<WriteOutcome> {
        let entry = self
            .chains
            .get(&row_id)
            .ok_or(StrataError::RowNotFound { row_id })?;
        let result = entry.value().write().add_write(value, txn_id);
        result
    }

    /// Commits the in-flight write on a chain at `timestamp`.
    pub fn commit_write(
        &self,
        row_id: RowId,
        timestamp: Timestamp,
        txn_id: TxnId,
    ) -> StrataResult<()> {
        let entry = self
            .chains
            .get(&row_id)
            .ok_or(StrataError::RowNotFound { row_id })?;
        let result = entry.value().write().commit_write(timestamp, txn_id);
        result
    }

    /// Rolls back the in-flight write on a chain.
    ///
    /// A chain emptied by the abort of a pure insert is removed from the
    /// store entirely.
    pub fn abort_write(&self, row_id: RowId, txn_id: TxnId) -> StrataResult<()> {
        let emptied = {
            let entry = self
                .chains
                .get(&row_id)
                .ok_or(StrataError::RowNotFound { row_id })?;
            let emptied = entry.value().write().abort_write(txn_id)?;
            emptied
        };

        if emptied {
            self.chains.remove(&row_id);
        }
        Ok(())
    }

    /// Resolves the value of a row visible through `view`.
    ///
    /// A missing chain resolves to `None`: the row never existed, or its
    /// history was removed.
    #[must_use]
    pub fn resolve(
        &self,
        row_id: RowId,
        view: ReadView,
        filter: Option<&VersionFilter>,
    ) -> Option<Tuple> {
        let entry = self.chains.get(&row_id)?;
        let result = entry.value().read().resolve(view, filter);
        result
    }

    /// Returns the transaction mid-write on a row, if any.
    #[must_use]
    pub fn write_owner(&self, row_id: RowId) -> Option<TxnId> {
        let entry = self.chains.get(&row_id)?;
        let owner = entry.value().read().owner();
        owner
    }

    /// Returns the number of versions retained for a row.
    #[must_use]
    pub fn version_count(&self, row_id: RowId) -> usize {
        self.chains
            .get(&row_id)
            .map_or(0, |entry| entry.value().read().version_count())
    }

    /// Returns a snapshot of all live row IDs.
    ///
    /// The snapshot may be stale with respect to concurrent inserts and
    /// removals but is never torn.
    #[must_use]
    pub fn row_ids(&self) -> Vec<RowId> {
        self.chains.iter().map(|entry| *entry.key()).collect()
    }
}

impl Default for RowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStore")
            .field("row_count", &self.row_count())
            .field("max_versions", &self.max_versions)
            .finish()
    }
}
