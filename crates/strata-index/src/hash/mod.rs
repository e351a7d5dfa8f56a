//! Hash-based secondary indexes.
//!
//! A hash index maps a projected key tuple to the set of rows whose value
//! carried that key at some point in retained history. Bindings are never
//! physically removed by `update` or `remove` - multi-version history may
//! still resolve through them, and a tombstoned or rewritten row simply
//! resolves to nothing (or to a different key) for a given view. Only the
//! abort of an uncommitted insert unbinds physically, via [`HashIndex::revoke`].
//!
//! Locking discipline over the index's own lock table, keyed by projected
//! key values:
//! - unique insert/update/remove: `X` on the key
//! - non-unique maintenance: `IX` on the key
//! - equality search under a transaction: `S` on the key

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{ReadView, RowId, Tuple, TxnId};
use strata_mvcc::RowStore;
use strata_txn::{DeadlockPolicy, LockKey, LockMode, LockTable};

/// A hash index over projected key tuples.
pub struct HashIndex {
    /// Index name, used in error reporting.
    name: String,
    /// Columns projected out of row tuples to form keys.
    columns: Vec<usize>,
    /// Whether keys must be unique among live rows.
    unique: bool,
    /// Per-key lock table, distinct from the primary row lock table.
    locks: LockTable,
    /// Key to row-reference bindings.
    entries: DashMap<Tuple, HashSet<RowId>>,
    /// The shared row store, used to resolve rows during uniqueness checks.
    rows: Arc<RowStore>,
}

impl HashIndex {
    /// Creates a hash index.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<usize>,
        unique: bool,
        rows: Arc<RowStore>,
        policy: DeadlockPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            unique,
            locks: LockTable::new(policy),
            entries: DashMap::new(),
            rows,
        }
    }

    /// Returns the index name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the projected columns.
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Returns true if this index enforces uniqueness.
    #[inline]
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns this index's lock table.
    #[must_use]
    pub fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    /// Projects a row tuple into this index's key space.
    pub fn project(&self, tuple: &Tuple) -> StrataResult<Tuple> {
        tuple.select(&self.columns)
    }

    fn key_mode(&self) -> LockMode {
        if self.unique {
            LockMode::Exclusive
        } else {
            LockMode::IntentExclusive
        }
    }

    /// Inserts a binding for `row_id` under the key projected from `tuple`.
    ///
    /// For a unique index the key is locked exclusively, then every other
    /// row bound under the key is resolved under the caller's transaction;
    /// a live row whose current value still projects to the same key is a
    /// uniqueness violation and nothing is bound.
    pub async fn insert(&self, tuple: &Tuple, row_id: RowId, txn_id: TxnId) -> StrataResult<()> {
        let key = self.project(tuple)?;
        self.locks
            .acquire(txn_id, LockKey::key(key.clone()), self.key_mode())
            .await?;

        if self.unique {
            self.check_unique(&key, row_id, txn_id)?;
        }

        self.entries.entry(key).or_default().insert(row_id);
        Ok(())
    }

    /// Updates bindings when a row's value changes.
    ///
    /// The old binding is retained for history. When the projected key
    /// changes, the new key goes through the full insert path (including the
    /// uniqueness check); returns true exactly when a new binding was added,
    /// so the caller can register its undo.
    pub async fn update(
        &self,
        old: &Tuple,
        new: &Tuple,
        row_id: RowId,
        txn_id: TxnId,
    ) -> StrataResult<bool> {
        let old_key = self.project(old)?;
        let new_key = self.project(new)?;

        if old_key == new_key {
            self.locks
                .acquire(txn_id, LockKey::key(old_key), self.key_mode())
                .await?;
            return Ok(false);
        }

        self.locks
            .acquire(txn_id, LockKey::key(old_key), LockMode::IntentExclusive)
            .await?;
        self.insert(new, row_id, txn_id).await?;
        Ok(true)
    }

    /// Serializes a removal against readers and writers of the key.
    ///
    /// The binding itself stays: the chain-level tombstone makes the row
    /// invisible, and history before the tombstone must keep resolving.
    pub async fn remove(&self, tuple: &Tuple, _row_id: RowId, txn_id: TxnId) -> StrataResult<()> {
        let key = self.project(tuple)?;
        self.locks
            .acquire(txn_id, LockKey::key(key), self.key_mode())
            .await?;
        Ok(())
    }

    /// Returns the rows bound under `key`, visible through `view`.
    ///
    /// A transaction view takes `S` on the key; a snapshot view takes no
    /// locks. References are returned unresolved - a binding may point at a
    /// row whose value is invisible (or tombstoned) for the view.
    pub async fn search(&self, key: &Tuple, view: ReadView) -> StrataResult<Vec<RowId>> {
        if let ReadView::Transaction(txn_id) = view {
            self.locks
                .acquire(txn_id, LockKey::key(key.clone()), LockMode::Shared)
                .await?;
        }
        Ok(self.bindings(key))
    }

    /// Physically unbinds `row_id` from `key`.
    ///
    /// Used only when aborting the transaction whose uncommitted insert
    /// created the binding.
    pub fn revoke(&self, key: &Tuple, row_id: RowId) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.value_mut().remove(&row_id);
            let emptied = entry.value().is_empty();
            drop(entry);
            if emptied {
                self.entries
                    .remove_if(key, |_, refs| refs.is_empty());
            }
        }
    }

    /// Releases every lock this index holds for a transaction.
    pub fn release_all(&self, txn_id: TxnId) -> usize {
        self.locks.release_all(txn_id)
    }

    fn bindings(&self, key: &Tuple) -> Vec<RowId> {
        let mut refs: Vec<RowId> = self
            .entries
            .get(key)
            .map(|entry| entry.value().iter().copied().collect())
            .unwrap_or_default();
        refs.sort_unstable();
        refs
    }

    /// Rejects the insert if another live row still carries `key`.
    fn check_unique(&self, key: &Tuple, row_id: RowId, txn_id: TxnId) -> StrataResult<()> {
        for other in self.bindings(key) {
            if other == row_id {
                continue;
            }
            let Some(current) = self
                .rows
                .resolve(other, ReadView::Transaction(txn_id), None)
            else {
                continue;
            };
            if current.select(&self.columns)? == *key {
                return Err(StrataError::UniqueViolation {
                    index: self.name.clone(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HashIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashIndex")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("unique", &self.unique)
            .field("keys", &self.entries.len())
            .finish()
    }
}
