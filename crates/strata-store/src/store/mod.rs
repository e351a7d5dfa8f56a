//! The multi-version store.
//!
//! [`MvStore`] orchestrates a transaction's operations across the primary
//! row store and every configured secondary index:
//!
//! - `insert`/`update`/`remove` acquire the primary row lock, apply the
//!   chain write, then drive each index's locked maintenance path, recording
//!   undo steps as they go
//! - `commit` replays the commit timestamp over every chain the transaction
//!   wrote, then releases all locks across all tables
//! - `abort` replays the undo log in reverse, then releases all locks
//!
//! A failed index sub-operation (uniqueness violation, wait-die rejection)
//! does not unwind the sub-operations already applied within the same call:
//! the transaction stays active holding its pending writes until the caller
//! aborts it, exactly as a failed statement inside an interactive
//! transaction would behave.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{ReadView, RowId, Timestamp, Tuple, TxnId};
use strata_index::{RangeCursor, SecondaryIndex};
use strata_mvcc::{RowStore, VersionFilter};
use strata_txn::{LockKey, LockMode, LockTable};

use crate::config::StoreConfig;
use crate::txn::{Transaction, TransactionState, UndoAction};

/// Statistics about a store.
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Total transactions begun.
    pub begun: AtomicU64,
    /// Total transactions committed.
    pub committed: AtomicU64,
    /// Total transactions aborted.
    pub aborted: AtomicU64,
}

impl StoreStats {
    /// Creates new stats.
    pub fn new() -> Self {
        Self::default()
    }
}

/// An embeddable multi-version transactional row store.
pub struct MvStore {
    /// The shared row store owning every version chain.
    rows: Arc<RowStore>,
    /// Primary row locks, distinct from every index's key lock table.
    row_locks: LockTable,
    /// Secondary indexes, fixed at construction.
    indexes: Vec<SecondaryIndex>,
    /// Live transactions, keyed by caller-supplied ID.
    transactions: RwLock<HashMap<TxnId, Mutex<Transaction>>>,
    /// Construction-time configuration.
    config: StoreConfig,
    /// Statistics.
    stats: StoreStats,
}

impl MvStore {
    /// Creates a store from its configuration.
    ///
    /// Fails when two indexes share a name.
    pub fn new(config: StoreConfig) -> StrataResult<Self> {
        let rows = Arc::new(RowStore::with_max_versions(config.max_chain_versions));

        let mut indexes = Vec::with_capacity(config.indexes.len());
        for spec in &config.indexes {
            if indexes
                .iter()
                .any(|existing: &SecondaryIndex| existing.name() == spec.name)
            {
                return Err(StrataError::InvalidArgument {
                    message: format!("duplicate index name {}", spec.name),
                });
            }
            indexes.push(SecondaryIndex::new(
                spec.kind,
                spec.name.clone(),
                spec.columns.clone(),
                Arc::clone(&rows),
                config.deadlock_policy,
            ));
        }

        Ok(Self {
            rows,
            row_locks: LockTable::new(config.deadlock_policy),
            indexes,
            transactions: RwLock::new(HashMap::new()),
            config,
            stats: StoreStats::new(),
        })
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the shared row store.
    pub fn row_store(&self) -> &Arc<RowStore> {
        &self.rows
    }

    /// Returns statistics.
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Returns the number of live transactions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.transactions.read().len()
    }

    /// Returns the lifecycle state of a live transaction.
    #[must_use]
    pub fn transaction_state(&self, txn_id: TxnId) -> Option<TransactionState> {
        let txns = self.transactions.read();
        txns.get(&txn_id).map(|entry| entry.lock().state())
    }

    /// Looks up an index by name.
    pub fn index(&self, name: &str) -> StrataResult<&SecondaryIndex> {
        self.indexes
            .iter()
            .find(|index| index.name() == name)
            .ok_or_else(|| StrataError::InvalidArgument {
                message: format!("no index named {name}"),
            })
    }

    /// Registers a transaction explicitly.
    ///
    /// Fails when the ID is invalid or already live. Mutating operations
    /// also register unknown IDs lazily, so calling this is optional; a
    /// retry after a wait-die rejection reuses the same ID once the previous
    /// attempt has aborted.
    pub fn begin(&self, txn_id: TxnId) -> StrataResult<()> {
        if !txn_id.is_valid() {
            return Err(StrataError::InvalidArgument {
                message: "transaction id must be non-zero".to_string(),
            });
        }
        let mut txns = self.transactions.write();
        if txns.contains_key(&txn_id) {
            return Err(StrataError::InvalidArgument {
                message: format!("transaction {txn_id} is already live"),
            });
        }
        txns.insert(txn_id, Mutex::new(Transaction::new(txn_id)));
        self.stats.begun.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(%txn_id, "transaction begun");
        Ok(())
    }

    /// Inserts a row, returning its reference.
    ///
    /// The chain head is created first, then every index insert runs; a
    /// rejecting index (uniqueness violation) leaves the already-applied
    /// row-store insert pending - the caller must abort to roll it back.
    pub async fn insert(&self, row: Tuple, txn_id: TxnId) -> StrataResult<RowId> {
        self.ensure_active(txn_id)?;

        let row_id = self.rows.insert(row.clone(), txn_id)?;
        self.row_locks
            .acquire(txn_id, LockKey::row(row_id), LockMode::Exclusive)
            .await?;
        self.with_txn(txn_id, |txn| {
            txn.record_write(row_id);
            txn.record_undo(UndoAction::RowWrite { row_id });
        })?;

        for (position, index) in self.indexes.iter().enumerate() {
            index.insert(&row, row_id, txn_id).await?;
            let key = index.project(&row)?;
            self.with_txn(txn_id, |txn| {
                txn.record_undo(UndoAction::IndexInsert {
                    index: position,
                    key,
                    row_id,
                });
            })?;
        }
        Ok(row_id)
    }

    /// Replaces a row's value, returning the superseded value.
    pub async fn update(&self, row_id: RowId, new: Tuple, txn_id: TxnId) -> StrataResult<Tuple> {
        self.ensure_active(txn_id)?;

        self.row_locks
            .acquire(txn_id, LockKey::row(row_id), LockMode::Exclusive)
            .await?;

        let old = self
            .rows
            .resolve(row_id, ReadView::Transaction(txn_id), None)
            .ok_or(StrataError::RowNotFound { row_id })?;

        let outcome = self.rows.add_write(row_id, new.clone(), txn_id)?;
        if outcome.spliced {
            self.with_txn(txn_id, |txn| {
                txn.record_write(row_id);
                txn.record_undo(UndoAction::RowWrite { row_id });
            })?;
        }

        for (position, index) in self.indexes.iter().enumerate() {
            let rebound = index.update(&old, &new, row_id, txn_id).await?;
            if rebound {
                let key = index.project(&new)?;
                self.with_txn(txn_id, |txn| {
                    txn.record_undo(UndoAction::IndexInsert {
                        index: position,
                        key,
                        row_id,
                    });
                })?;
            }
        }
        Ok(old)
    }

    /// Deletes a row, returning its last value.
    ///
    /// The chain records a tombstone; history before the delete stays
    /// readable at its timestamps.
    pub async fn remove(&self, row_id: RowId, txn_id: TxnId) -> StrataResult<Tuple> {
        self.ensure_active(txn_id)?;

        self.row_locks
            .acquire(txn_id, LockKey::row(row_id), LockMode::Exclusive)
            .await?;

        let old = self
            .rows
            .resolve(row_id, ReadView::Transaction(txn_id), None)
            .ok_or(StrataError::RowNotFound { row_id })?;

        let outcome = self.rows.add_write(row_id, Tuple::TOMBSTONE, txn_id)?;
        if outcome.spliced {
            self.with_txn(txn_id, |txn| {
                txn.record_write(row_id);
                txn.record_undo(UndoAction::RowWrite { row_id });
            })?;
        }

        for index in &self.indexes {
            index.remove(&old, row_id, txn_id).await?;
        }
        Ok(old)
    }

    /// Reads a row through a view, with an optional filter predicate.
    ///
    /// A transaction view takes `S` on the row; a snapshot view is
    /// lock-free.
    pub async fn get(
        &self,
        row_id: RowId,
        view: ReadView,
        filter: Option<&VersionFilter>,
    ) -> StrataResult<Option<Tuple>> {
        if let ReadView::Transaction(txn_id) = view {
            self.ensure_active(txn_id)?;
            self.row_locks
                .acquire(txn_id, LockKey::row(row_id), LockMode::Shared)
                .await?;
        }
        Ok(self.rows.resolve(row_id, view, filter))
    }

    /// Returns the row references bound under `key` in the named index.
    ///
    /// References are unresolved: a binding may point at a row invisible to
    /// the view. Use [`Self::lookup`] or [`Self::get`] to resolve.
    pub async fn search(
        &self,
        index_name: &str,
        key: &Tuple,
        view: ReadView,
    ) -> StrataResult<Vec<RowId>> {
        if let ReadView::Transaction(txn_id) = view {
            self.ensure_active(txn_id)?;
        }
        self.index(index_name)?.search(key, view).await
    }

    /// Resolves the rows live under `key` in the named index for `view`.
    ///
    /// Bindings are historical: a row that moved to a different key (or was
    /// tombstoned) stays bound under its old key, so each resolved value is
    /// re-projected and kept only when it still carries the queried key.
    pub async fn lookup(
        &self,
        index_name: &str,
        key: &Tuple,
        view: ReadView,
    ) -> StrataResult<Vec<Tuple>> {
        let columns = self.index(index_name)?.columns().to_vec();
        let refs = self.search(index_name, key, view).await?;

        let key = key.clone();
        let matches_key = move |value: &Tuple| {
            value
                .select(&columns)
                .map_or(false, |projected| projected == key)
        };
        Ok(refs
            .into_iter()
            .filter_map(|row_id| self.rows.resolve(row_id, view, Some(&matches_key)))
            .collect())
    }

    /// Opens a range cursor over a sorted index.
    pub fn range(
        &self,
        index_name: &str,
        lower: Option<Tuple>,
        upper: Option<Tuple>,
        view: ReadView,
    ) -> StrataResult<RangeCursor> {
        if let ReadView::Transaction(txn_id) = view {
            self.ensure_active(txn_id)?;
        }
        self.index(index_name)?.range(lower, upper, view)
    }

    /// Commits a transaction at the caller-supplied timestamp.
    ///
    /// Every chain the transaction wrote is finalized at `commit_ts`, all
    /// locks across all tables are released, and the transaction entry is
    /// removed.
    pub fn commit(&self, txn_id: TxnId, commit_ts: Timestamp) -> StrataResult<()> {
        {
            let txns = self.transactions.read();
            let entry = txns
                .get(&txn_id)
                .ok_or(StrataError::TransactionNotFound { txn_id })?;
            let mut txn = entry.lock();

            if !txn.state().is_active() {
                return Err(StrataError::TransactionInactive {
                    txn_id,
                    state: txn.state().to_string(),
                });
            }
            txn.set_state(TransactionState::Committing);

            for row_id in txn.writes() {
                self.rows.commit_write(row_id, commit_ts, txn_id)?;
            }
        }

        self.release_locks(txn_id);
        self.transactions.write().remove(&txn_id);
        self.stats.committed.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(%txn_id, %commit_ts, "transaction committed");
        Ok(())
    }

    /// Aborts a transaction, rolling back every recorded action in reverse
    /// order, then releasing all locks and removing the entry.
    pub fn abort(&self, txn_id: TxnId) -> StrataResult<()> {
        let undo = {
            let txns = self.transactions.read();
            let entry = txns
                .get(&txn_id)
                .ok_or(StrataError::TransactionNotFound { txn_id })?;
            let mut txn = entry.lock();

            if !txn.state().is_active() {
                return Err(StrataError::TransactionInactive {
                    txn_id,
                    state: txn.state().to_string(),
                });
            }
            txn.set_state(TransactionState::Aborting);
            txn.take_undo()
        };

        for action in undo {
            match action {
                UndoAction::RowWrite { row_id } => {
                    self.rows.abort_write(row_id, txn_id)?;
                }
                UndoAction::IndexInsert {
                    index,
                    key,
                    row_id,
                } => {
                    self.indexes[index].revoke(&key, row_id);
                }
            }
        }

        self.release_locks(txn_id);
        self.transactions.write().remove(&txn_id);
        self.stats.aborted.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(%txn_id, "transaction aborted");
        Ok(())
    }

    /// Verifies a transaction is live and active, registering it lazily if
    /// the ID is unknown.
    fn ensure_active(&self, txn_id: TxnId) -> StrataResult<()> {
        {
            let txns = self.transactions.read();
            if let Some(entry) = txns.get(&txn_id) {
                let txn = entry.lock();
                return if txn.state().is_active() {
                    Ok(())
                } else {
                    Err(StrataError::TransactionInactive {
                        txn_id,
                        state: txn.state().to_string(),
                    })
                };
            }
        }
        self.begin(txn_id)
    }

    fn with_txn(
        &self,
        txn_id: TxnId,
        apply: impl FnOnce(&mut Transaction),
    ) -> StrataResult<()> {
        let txns = self.transactions.read();
        let entry = txns
            .get(&txn_id)
            .ok_or(StrataError::TransactionNotFound { txn_id })?;
        apply(&mut entry.lock());
        Ok(())
    }

    fn release_locks(&self, txn_id: TxnId) {
        self.row_locks.release_all(txn_id);
        for index in &self.indexes {
            index.release_all(txn_id);
        }
    }
}

impl fmt::Debug for MvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MvStore")
            .field("rows", &self.rows.row_count())
            .field("indexes", &self.indexes.len())
            .field("active_txns", &self.active_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSpec;
    use strata_common::types::Datum;
    use strata_index::IndexKind;
    use strata_txn::DeadlockPolicy;

    fn row(id: i64, name: &str) -> Tuple {
        Tuple::new(vec![Datum::int(id), Datum::str(name)])
    }

    fn key_of(id: i64) -> Tuple {
        Tuple::new(vec![Datum::int(id)])
    }

    fn txn(n: u128) -> TxnId {
        TxnId::new(n)
    }

    fn ts(n: u64) -> Timestamp {
        Timestamp::new(n)
    }

    fn store() -> Arc<MvStore> {
        let config = StoreConfig::default()
            .with_deadlock_policy(DeadlockPolicy::None)
            .with_index(IndexSpec::new("by_id", vec![0], IndexKind::HashUnique))
            .with_index(IndexSpec::new(
                "by_name",
                vec![1],
                IndexKind::SortedNonUnique,
            ));
        Arc::new(MvStore::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_transaction_lifecycle() {
        let store = store();

        store.begin(txn(1)).unwrap();
        assert_eq!(store.active_count(), 1);
        assert_eq!(
            store.transaction_state(txn(1)),
            Some(TransactionState::Active)
        );

        store.commit(txn(1), ts(10)).unwrap();
        assert_eq!(store.active_count(), 0);
        assert_eq!(store.transaction_state(txn(1)), None);
    }

    #[tokio::test]
    async fn test_begin_rejects_duplicates_and_invalid() {
        let store = store();
        store.begin(txn(1)).unwrap();
        assert!(store.begin(txn(1)).is_err());
        assert!(store.begin(TxnId::INVALID).is_err());
    }

    #[tokio::test]
    async fn test_commit_unknown_transaction() {
        let store = store();
        assert!(matches!(
            store.commit(txn(99), ts(1)),
            Err(StrataError::TransactionNotFound { .. })
        ));
        assert!(matches!(
            store.abort(txn(99)),
            Err(StrataError::TransactionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_insert_commit_get() {
        let store = store();

        let row_id = store.insert(row(1, "alice"), txn(1)).await.unwrap();
        store.commit(txn(1), ts(10)).unwrap();

        let found = store
            .get(row_id, ReadView::Snapshot(ts(10)), None)
            .await
            .unwrap();
        assert_eq!(found, Some(row(1, "alice")));

        // Just before the commit timestamp the row does not exist.
        let found = store
            .get(row_id, ReadView::Snapshot(ts(9)), None)
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_own_writes_visible_before_commit() {
        let store = store();

        let row_id = store.insert(row(1, "alice"), txn(1)).await.unwrap();

        let own = store
            .get(row_id, ReadView::Transaction(txn(1)), None)
            .await
            .unwrap();
        assert_eq!(own, Some(row(1, "alice")));

        // Invisible to snapshots until committed.
        let other = store
            .get(row_id, ReadView::Snapshot(ts(1000)), None)
            .await
            .unwrap();
        assert_eq!(other, None);
    }

    #[tokio::test]
    async fn test_abort_insert_leaves_no_trace() {
        let store = store();

        let row_id = store.insert(row(1, "alice"), txn(1)).await.unwrap();
        store.abort(txn(1)).unwrap();

        assert!(!store.row_store().contains(row_id));
        let found = store
            .get(row_id, ReadView::Snapshot(ts(1000)), None)
            .await
            .unwrap();
        assert_eq!(found, None);

        // The unique index binding was revoked too: the key is free again.
        let row_id = store.insert(row(1, "bob"), txn(2)).await.unwrap();
        store.commit(txn(2), ts(10)).unwrap();
        let found = store
            .lookup("by_id", &key_of(1), ReadView::Snapshot(ts(10)))
            .await
            .unwrap();
        assert_eq!(found, vec![row(1, "bob")]);
        let _ = row_id;
    }

    #[tokio::test]
    async fn test_update_returns_old_value() {
        let store = store();

        let row_id = store.insert(row(1, "alice"), txn(1)).await.unwrap();
        store.commit(txn(1), ts(10)).unwrap();

        let old = store.update(row_id, row(1, "bob"), txn(2)).await.unwrap();
        assert_eq!(old, row(1, "alice"));
        store.commit(txn(2), ts(20)).unwrap();

        assert_eq!(
            store
                .get(row_id, ReadView::Snapshot(ts(20)), None)
                .await
                .unwrap(),
            Some(row(1, "bob"))
        );
        assert_eq!(
            store
                .get(row_id, ReadView::Snapshot(ts(15)), None)
                .await
                .unwrap(),
            Some(row(1, "alice"))
        );
    }

    #[tokio::test]
    async fn test_remove_tombstones() {
        let store = store();

        let row_id = store.insert(row(1, "alice"), txn(1)).await.unwrap();
        store.commit(txn(1), ts(10)).unwrap();

        let old = store.remove(row_id, txn(2)).await.unwrap();
        assert_eq!(old, row(1, "alice"));
        store.commit(txn(2), ts(20)).unwrap();

        assert_eq!(
            store
                .get(row_id, ReadView::Snapshot(ts(20)), None)
                .await
                .unwrap(),
            None
        );
        // History before the delete is intact.
        assert_eq!(
            store
                .get(row_id, ReadView::Snapshot(ts(15)), None)
                .await
                .unwrap(),
            Some(row(1, "alice"))
        );
        // Removing again fails: the row no longer resolves.
        assert!(matches!(
            store.remove(row_id, txn(3)).await,
            Err(StrataError::RowNotFound { .. })
        ));
        store.abort(txn(3)).unwrap();
    }

    #[tokio::test]
    async fn test_unique_violation_leaves_transaction_active() {
        let store = store();

        store.insert(row(1, "alice"), txn(1)).await.unwrap();
        store.commit(txn(1), ts(10)).unwrap();

        let err = store.insert(row(1, "dup"), txn(2)).await.unwrap_err();
        assert!(err.is_unique_violation());

        // The failed sub-operation is not auto-rolled back: the transaction
        // is still live with the pending chain write until it aborts.
        assert_eq!(
            store.transaction_state(txn(2)),
            Some(TransactionState::Active)
        );
        store.abort(txn(2)).unwrap();

        // After the abort nothing of the attempt remains.
        let found = store
            .lookup("by_id", &key_of(1), ReadView::Snapshot(ts(10)))
            .await
            .unwrap();
        assert_eq!(found, vec![row(1, "alice")]);
    }

    #[tokio::test]
    async fn test_update_rebinds_indexes() {
        let store = store();

        let row_id = store.insert(row(1, "alice"), txn(1)).await.unwrap();
        store.commit(txn(1), ts(10)).unwrap();

        store.update(row_id, row(2, "alice"), txn(2)).await.unwrap();
        store.commit(txn(2), ts(20)).unwrap();

        // The new key finds the row, the old key no longer resolves it.
        assert_eq!(
            store
                .lookup("by_id", &key_of(2), ReadView::Snapshot(ts(20)))
                .await
                .unwrap(),
            vec![row(2, "alice")]
        );
        assert_eq!(
            store
                .lookup("by_id", &key_of(1), ReadView::Snapshot(ts(20)))
                .await
                .unwrap(),
            Vec::<Tuple>::new()
        );
        // At the old timestamp the old key still works.
        assert_eq!(
            store
                .lookup("by_id", &key_of(1), ReadView::Snapshot(ts(10)))
                .await
                .unwrap(),
            vec![row(1, "alice")]
        );
    }

    #[tokio::test]
    async fn test_range_through_store() {
        let store = store();

        store.insert(row(1, "carol"), txn(1)).await.unwrap();
        store.insert(row(2, "alice"), txn(1)).await.unwrap();
        store.insert(row(3, "bob"), txn(1)).await.unwrap();
        store.commit(txn(1), ts(10)).unwrap();

        let mut cursor = store
            .range(
                "by_name",
                Some(Tuple::new(vec![Datum::str("alice")])),
                Some(Tuple::new(vec![Datum::str("bob")])),
                ReadView::Snapshot(ts(10)),
            )
            .unwrap();
        let mut names = Vec::new();
        while let Some(row_id) = cursor.next().await.unwrap() {
            let value = store
                .get(row_id, ReadView::Snapshot(ts(10)), None)
                .await
                .unwrap()
                .unwrap();
            names.push(value.field(1).unwrap().as_str().unwrap().to_string());
        }
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_range_on_hash_index_unsupported() {
        let store = store();
        assert!(matches!(
            store.range("by_id", None, None, ReadView::Snapshot(ts(1))),
            Err(StrataError::NotSupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_wait_die_surfaces_to_caller() {
        let config = StoreConfig::default()
            .with_deadlock_policy(DeadlockPolicy::WaitDie)
            .with_index(IndexSpec::new("by_id", vec![0], IndexKind::HashUnique));
        let store = Arc::new(MvStore::new(config).unwrap());

        let row_id = store.insert(row(1, "alice"), txn(1)).await.unwrap();
        store.commit(txn(1), ts(10)).unwrap();

        // The older transaction holds the row exclusively.
        store.update(row_id, row(1, "old"), txn(2)).await.unwrap();

        // The younger transaction must not wait: it dies.
        let err = store.update(row_id, row(1, "young"), txn(3)).await.unwrap_err();
        assert!(err.is_deadlock_prevented());

        store.abort(txn(3)).unwrap();
        store.commit(txn(2), ts(20)).unwrap();

        // Retrying with the same ID after the holder finished succeeds.
        store.update(row_id, row(1, "young"), txn(3)).await.unwrap();
        store.commit(txn(3), ts(30)).unwrap();
        assert_eq!(
            store
                .get(row_id, ReadView::Snapshot(ts(30)), None)
                .await
                .unwrap(),
            Some(row(1, "young"))
        );
    }

    #[tokio::test]
    async fn test_duplicate_index_name_rejected() {
        let config = StoreConfig::default()
            .with_index(IndexSpec::new("dup", vec![0], IndexKind::HashUnique))
            .with_index(IndexSpec::new("dup", vec![1], IndexKind::SortedUnique));
        assert!(MvStore::new(config).is_err());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = store();

        store.begin(txn(1)).unwrap();
        store.begin(txn(2)).unwrap();
        store.commit(txn(1), ts(10)).unwrap();
        store.abort(txn(2)).unwrap();

        assert_eq!(store.stats().begun.load(AtomicOrdering::Relaxed), 2);
        assert_eq!(store.stats().committed.load(AtomicOrdering::Relaxed), 1);
        assert_eq!(store.stats().aborted.load(AtomicOrdering::Relaxed), 1);
    }
}
