//! Read views for version resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Timestamp, TxnId};

/// The perspective from which a read resolves row versions.
///
/// Every read operation sees the store through exactly one of two views:
///
/// - [`ReadView::Transaction`] - the read belongs to an in-flight
///   transaction. It sees that transaction's own uncommitted writes plus the
///   latest committed state; the caller is expected to hold the lock that
///   keeps other writers out.
/// - [`ReadView::Snapshot`] - the read is anchored at a commit timestamp and
///   sees exactly the versions whose validity interval contains it. Snapshot
///   reads take no locks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadView {
    /// Read as an in-flight transaction.
    Transaction(TxnId),
    /// Read as of a commit timestamp.
    Snapshot(Timestamp),
}

impl ReadView {
    /// Returns the transaction ID if this is a transaction view.
    #[inline]
    #[must_use]
    pub const fn txn_id(&self) -> Option<TxnId> {
        match self {
            ReadView::Transaction(txn_id) => Some(*txn_id),
            ReadView::Snapshot(_) => None,
        }
    }

    /// Returns the timestamp if this is a snapshot view.
    #[inline]
    #[must_use]
    pub const fn timestamp(&self) -> Option<Timestamp> {
        match self {
            ReadView::Transaction(_) => None,
            ReadView::Snapshot(ts) => Some(*ts),
        }
    }

    /// Returns true if this is a snapshot view.
    #[inline]
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        matches!(self, ReadView::Snapshot(_))
    }
}

impl fmt::Debug for ReadView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadView::Transaction(txn_id) => write!(f, "ReadView::Transaction({txn_id})"),
            ReadView::Snapshot(ts) => write!(f, "ReadView::Snapshot({ts})"),
        }
    }
}

impl From<TxnId> for ReadView {
    #[inline]
    fn from(txn_id: TxnId) -> Self {
        ReadView::Transaction(txn_id)
    }
}

impl From<Timestamp> for ReadView {
    #[inline]
    fn from(ts: Timestamp) -> Self {
        ReadView::Snapshot(ts)
    }
}
