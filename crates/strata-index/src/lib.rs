//! # strata-index
//!
//! Secondary indexes for StrataDB.
//!
//! Four index variants are provided, selected per column set at store
//! construction time:
//!
//! | variant | storage | uniqueness | range queries |
//! |---|---|---|---|
//! | [`IndexKind::HashUnique`] | hash map | enforced | no |
//! | [`IndexKind::HashNonUnique`] | hash map | - | no |
//! | [`IndexKind::SortedUnique`] | ordered map | enforced | yes |
//! | [`IndexKind::SortedNonUnique`] | ordered map | - | yes |
//!
//! Every variant couples index mutation to lock acquisition on its own
//! per-key lock table: uniqueness checks run under `X`, maintenance under
//! `IX`, equality reads under `S`, and the sorted variants add next-key
//! locking so range scans are phantom-free. Indexes store row references
//! only; row data stays in the shared row store.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Hash index storage
pub mod hash;

/// Sorted index storage and range cursors
pub mod sorted;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{ReadView, RowId, Tuple, TxnId};
use strata_mvcc::RowStore;
use strata_txn::{DeadlockPolicy, LockTable};

pub use hash::HashIndex;
pub use sorted::{RangeCursor, SortedIndex};

/// The four secondary index variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Hash storage, unique keys.
    HashUnique,
    /// Hash storage, duplicate keys allowed.
    HashNonUnique,
    /// Ordered storage, unique keys.
    SortedUnique,
    /// Ordered storage, duplicate keys allowed.
    SortedNonUnique,
}

impl IndexKind {
    /// Returns true if the variant enforces uniqueness.
    #[inline]
    #[must_use]
    pub const fn is_unique(self) -> bool {
        matches!(self, IndexKind::HashUnique | IndexKind::SortedUnique)
    }

    /// Returns true if the variant supports range queries.
    #[inline]
    #[must_use]
    pub const fn is_sorted(self) -> bool {
        matches!(self, IndexKind::SortedUnique | IndexKind::SortedNonUnique)
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::HashUnique => write!(f, "hash-unique"),
            IndexKind::HashNonUnique => write!(f, "hash-non-unique"),
            IndexKind::SortedUnique => write!(f, "sorted-unique"),
            IndexKind::SortedNonUnique => write!(f, "sorted-non-unique"),
        }
    }
}

/// A secondary index of one of the four variants.
///
/// The variant set is closed: every index is one of these, fixed at store
/// construction, and all share one capability surface (insert, update,
/// remove, equality search, range for the sorted variants).
pub enum SecondaryIndex {
    /// Hash storage, unique keys.
    HashUnique(HashIndex),
    /// Hash storage, duplicate keys allowed.
    HashNonUnique(HashIndex),
    /// Ordered storage, unique keys.
    SortedUnique(SortedIndex),
    /// Ordered storage, duplicate keys allowed.
    SortedNonUnique(SortedIndex),
}

impl SecondaryIndex {
    /// Creates an index of the given kind.
    pub fn new(
        kind: IndexKind,
        name: impl Into<String>,
        columns: Vec<usize>,
        rows: Arc<RowStore>,
        policy: DeadlockPolicy,
    ) -> Self {
        let name = name.into();
        match kind {
            IndexKind::HashUnique => {
                SecondaryIndex::HashUnique(HashIndex::new(name, columns, true, rows, policy))
            }
            IndexKind::HashNonUnique => {
                SecondaryIndex::HashNonUnique(HashIndex::new(name, columns, false, rows, policy))
            }
            IndexKind::SortedUnique => {
                SecondaryIndex::SortedUnique(SortedIndex::new(name, columns, true, rows, policy))
            }
            IndexKind::SortedNonUnique => SecondaryIndex::SortedNonUnique(SortedIndex::new(
                name, columns, false, rows, policy,
            )),
        }
    }

    /// Returns the variant kind.
    #[must_use]
    pub const fn kind(&self) -> IndexKind {
        match self {
            SecondaryIndex::HashUnique(_) => IndexKind::HashUnique,
            SecondaryIndex::HashNonUnique(_) => IndexKind::HashNonUnique,
            SecondaryIndex::SortedUnique(_) => IndexKind::SortedUnique,
            SecondaryIndex::SortedNonUnique(_) => IndexKind::SortedNonUnique,
        }
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.name()
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.name()
            }
        }
    }

    /// Returns the projected columns.
    #[must_use]
    pub fn columns(&self) -> &[usize] {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.columns()
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.columns()
            }
        }
    }

    /// Returns this index's lock table.
    #[must_use]
    pub fn lock_table(&self) -> &LockTable {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.lock_table()
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.lock_table()
            }
        }
    }

    /// Projects a row tuple into this index's key space.
    pub fn project(&self, tuple: &Tuple) -> StrataResult<Tuple> {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.project(tuple)
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.project(tuple)
            }
        }
    }

    /// Inserts a binding for `row_id` under the key projected from `tuple`.
    pub async fn insert(&self, tuple: &Tuple, row_id: RowId, txn_id: TxnId) -> StrataResult<()> {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.insert(tuple, row_id, txn_id).await
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.insert(tuple, row_id, txn_id).await
            }
        }
    }

    /// Updates bindings for a row value change. Returns true when a new
    /// binding was added under a changed key.
    pub async fn update(
        &self,
        old: &Tuple,
        new: &Tuple,
        row_id: RowId,
        txn_id: TxnId,
    ) -> StrataResult<bool> {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.update(old, new, row_id, txn_id).await
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.update(old, new, row_id, txn_id).await
            }
        }
    }

    /// Serializes a removal against readers and writers of the key.
    pub async fn remove(&self, tuple: &Tuple, row_id: RowId, txn_id: TxnId) -> StrataResult<()> {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.remove(tuple, row_id, txn_id).await
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.remove(tuple, row_id, txn_id).await
            }
        }
    }

    /// Returns the rows bound under `key`, visible through `view`.
    pub async fn search(&self, key: &Tuple, view: ReadView) -> StrataResult<Vec<RowId>> {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.search(key, view).await
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.search(key, view).await
            }
        }
    }

    /// Opens a range cursor. Fails for hash variants.
    pub fn range(
        &self,
        lower: Option<Tuple>,
        upper: Option<Tuple>,
        view: ReadView,
    ) -> StrataResult<RangeCursor> {
        match self {
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                Ok(index.range(lower, upper, view))
            }
            SecondaryIndex::HashUnique(_) | SecondaryIndex::HashNonUnique(_) => {
                Err(StrataError::NotSupported {
                    operation: format!("range query on {} index {}", self.kind(), self.name()),
                })
            }
        }
    }

    /// Physically unbinds `row_id` from `key` (abort-time undo only).
    pub fn revoke(&self, key: &Tuple, row_id: RowId) {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.revoke(key, row_id);
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.revoke(key, row_id);
            }
        }
    }

    /// Releases every lock this index holds for a transaction.
    pub fn release_all(&self, txn_id: TxnId) -> usize {
        match self {
            SecondaryIndex::HashUnique(index) | SecondaryIndex::HashNonUnique(index) => {
                index.release_all(txn_id)
            }
            SecondaryIndex::SortedUnique(index) | SecondaryIndex::SortedNonUnique(index) => {
                index.release_all(txn_id)
            }
        }
    }
}

impl fmt::Debug for SecondaryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecondaryIndex")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("columns", &self.columns())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::types::Datum;

    #[test]
    fn test_index_kind_properties() {
        assert!(IndexKind::HashUnique.is_unique());
        assert!(IndexKind::SortedUnique.is_unique());
        assert!(!IndexKind::HashNonUnique.is_unique());
        assert!(!IndexKind::SortedNonUnique.is_unique());

        assert!(IndexKind::SortedUnique.is_sorted());
        assert!(IndexKind::SortedNonUnique.is_sorted());
        assert!(!IndexKind::HashUnique.is_sorted());
    }

    #[tokio::test]
    async fn test_range_unsupported_on_hash() {
        let rows = Arc::new(RowStore::new());
        let index = SecondaryIndex::new(
            IndexKind::HashUnique,
            "by_id",
            vec![0],
            rows,
            DeadlockPolicy::None,
        );

        let result = index.range(None, None, ReadView::Transaction(TxnId::new(1)));
        assert!(matches!(result, Err(StrataError::NotSupported { .. })));
    }

    #[tokio::test]
    async fn test_enum_dispatch_round_trip() {
        let rows = Arc::new(RowStore::new());
        let index = SecondaryIndex::new(
            IndexKind::SortedNonUnique,
            "by_name",
            vec![1],
            rows.clone(),
            DeadlockPolicy::None,
        );
        assert_eq!(index.kind(), IndexKind::SortedNonUnique);
        assert_eq!(index.name(), "by_name");
        assert_eq!(index.columns(), &[1]);

        let txn = TxnId::new(1);
        let value = Tuple::new(vec![Datum::int(1), Datum::str("alice")]);
        let row_id = rows.insert(value.clone(), txn).unwrap();
        index.insert(&value, row_id, txn).await.unwrap();

        let key = Tuple::new(vec![Datum::str("alice")]);
        let refs = index.search(&key, ReadView::Transaction(txn)).await.unwrap();
        assert_eq!(refs, vec![row_id]);
    }
}
