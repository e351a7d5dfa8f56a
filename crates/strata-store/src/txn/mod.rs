//! Per-transaction state.
//!
//! The store owns one [`Transaction`] entry per live transaction ID, created
//! on `begin` (or lazily on the first operation) and removed exactly on
//! commit or abort.
//!
//! # Transaction States
//!
//! ```text
//! ┌────────┐   commit()   ┌────────────┐
//! │ Active │─────────────▶│ Committing │──▶ entry removed
//! │        │   abort()    ┌────────────┐
//! │        │─────────────▶│  Aborting  │──▶ entry removed
//! └────────┘              └────────────┘
//! ```

use std::collections::HashSet;
use std::fmt;

use strata_common::types::{RowId, Tuple, TxnId};

/// The lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// The transaction can perform operations.
    Active,
    /// Commit is in progress.
    Committing,
    /// Abort is in progress.
    Aborting,
}

impl TransactionState {
    /// Returns true if the transaction can perform operations.
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        self == TransactionState::Active
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Active => write!(f, "active"),
            TransactionState::Committing => write!(f, "committing"),
            TransactionState::Aborting => write!(f, "aborting"),
        }
    }
}

/// One recorded undo step, replayed in reverse order on abort.
#[derive(Debug, Clone)]
pub(crate) enum UndoAction {
    /// Roll back the in-flight chain write on a row.
    RowWrite {
        /// The written row.
        row_id: RowId,
    },
    /// Unbind an uncommitted index insertion.
    IndexInsert {
        /// Position of the index in the store's index set.
        index: usize,
        /// The bound key.
        key: Tuple,
        /// The bound row.
        row_id: RowId,
    },
}

/// Transaction-local bookkeeping owned by the store.
pub struct Transaction {
    /// The caller-supplied transaction ID.
    id: TxnId,
    /// Current lifecycle state.
    state: TransactionState,
    /// Rows with an in-flight chain write by this transaction.
    writes: HashSet<RowId>,
    /// Undo log in acquisition order; replayed reversed on abort.
    undo: Vec<UndoAction>,
}

impl Transaction {
    /// Creates a new active transaction.
    #[must_use]
    pub fn new(id: TxnId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            writes: HashSet::new(),
            undo: Vec::new(),
        }
    }

    /// Returns the transaction ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns the number of rows written.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    pub(crate) fn set_state(&mut self, state: TransactionState) {
        self.state = state;
    }

    /// Records a row whose chain now carries this transaction's write.
    pub(crate) fn record_write(&mut self, row_id: RowId) {
        self.writes.insert(row_id);
    }

    pub(crate) fn record_undo(&mut self, action: UndoAction) {
        self.undo.push(action);
    }

    /// Returns the written rows for commit replay.
    pub(crate) fn writes(&self) -> impl Iterator<Item = RowId> + '_ {
        self.writes.iter().copied()
    }

    /// Drains the undo log in reverse acquisition order.
    pub(crate) fn take_undo(&mut self) -> Vec<UndoAction> {
        let mut undo = std::mem::take(&mut self.undo);
        undo.reverse();
        undo
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("writes", &self.writes.len())
            .field("undo", &self.undo.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", TransactionState::Active), "active");
        assert_eq!(format!("{}", TransactionState::Committing), "committing");
        assert_eq!(format!("{}", TransactionState::Aborting), "aborting");
    }

    #[test]
    fn test_write_set_deduplicates() {
        let mut txn = Transaction::new(TxnId::new(1));
        txn.record_write(RowId::new(5));
        txn.record_write(RowId::new(5));
        assert_eq!(txn.write_count(), 1);
    }

    #[test]
    fn test_undo_drains_reversed() {
        let mut txn = Transaction::new(TxnId::new(1));
        txn.record_undo(UndoAction::RowWrite {
            row_id: RowId::new(1),
        });
        txn.record_undo(UndoAction::RowWrite {
            row_id: RowId::new(2),
        });

        let undo = txn.take_undo();
        assert!(matches!(
            undo[0],
            UndoAction::RowWrite { row_id } if row_id == RowId::new(2)
        ));
        assert!(matches!(
            undo[1],
            UndoAction::RowWrite { row_id } if row_id == RowId::new(1)
        ));
        assert!(txn.take_undo().is_empty());
    }
}
