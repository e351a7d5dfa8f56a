//! Error handling for StrataDB.
//!
//! This module provides a unified error type and result alias used
//! across all StrataDB components.

use thiserror::Error;

use crate::types::{RowId, Tuple, TxnId};

/// Result type alias for StrataDB operations.
pub type StrataResult<T> = std::result::Result<T, StrataError>;

/// The main error type for StrataDB.
///
/// Three kinds matter to concurrency control and are worth distinguishing
/// programmatically:
///
/// - [`StrataError::DeadlockPrevented`] - wait-die rejected a lock wait. The
///   caller should release and retry the whole logical operation with the
///   *same* transaction ID to preserve its priority.
/// - [`StrataError::UniqueViolation`] - a unique index found a live
///   conflicting key. The transaction stays active; the caller may retry a
///   different key or abort.
/// - [`StrataError::IllegalChainState`] - a version chain was mutated by a
///   transaction that does not own it. This is a programmer error, not a
///   retryable condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrataError {
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// Operation not supported by this component.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: String,
    },

    /// A projection referenced a column past the end of a tuple.
    #[error("column {column} out of range for tuple of arity {arity}")]
    ColumnOutOfRange {
        /// The requested column index.
        column: usize,
        /// The tuple's arity.
        arity: usize,
    },

    /// Row not found, or not visible to the requesting view.
    #[error("row {row_id} not found")]
    RowNotFound {
        /// The missing row.
        row_id: RowId,
    },

    /// Transaction not found.
    #[error("transaction {txn_id} not found")]
    TransactionNotFound {
        /// The missing transaction.
        txn_id: TxnId,
    },

    /// Transaction is not in a state that permits the operation.
    #[error("transaction {txn_id} is {state}, expected active")]
    TransactionInactive {
        /// The transaction.
        txn_id: TxnId,
        /// Its current lifecycle state.
        state: String,
    },

    /// Wait-die rejected a lock wait to prevent deadlock.
    #[error("deadlock prevented: transaction {txn_id} must not wait on an older transaction")]
    DeadlockPrevented {
        /// The younger transaction whose wait was refused.
        txn_id: TxnId,
    },

    /// A unique index detected a live conflicting key.
    #[error("unique constraint violation on index {index}: key {key}")]
    UniqueViolation {
        /// The violated index.
        index: String,
        /// The conflicting key.
        key: Tuple,
    },

    /// A version chain invariant was violated.
    #[error("illegal chain state: {message}")]
    IllegalChainState {
        /// Description of the violation.
        message: String,
    },
}

impl StrataError {
    /// Creates an internal error from a message.
    pub fn internal(message: impl Into<String>) -> Self {
        StrataError::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the error is a wait-die rejection.
    ///
    /// Such errors are retryable by re-running the logical operation under
    /// the same transaction ID.
    #[inline]
    #[must_use]
    pub const fn is_deadlock_prevented(&self) -> bool {
        matches!(self, StrataError::DeadlockPrevented { .. })
    }

    /// Returns true if the error is a uniqueness violation.
    #[inline]
    #[must_use]
    pub const fn is_unique_violation(&self) -> bool {
        matches!(self, StrataError::UniqueViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Datum;

    #[test]
    fn test_error_display() {
        let err = StrataError::DeadlockPrevented {
            txn_id: TxnId::new(9),
        };
        assert_eq!(
            err.to_string(),
            "deadlock prevented: transaction 9 must not wait on an older transaction"
        );

        let err = StrataError::UniqueViolation {
            index: "by_name".to_string(),
            key: Tuple::new(vec![Datum::str("alice")]),
        };
        assert_eq!(
            err.to_string(),
            "unique constraint violation on index by_name: key (alice)"
        );
    }

    #[test]
    fn test_error_classification() {
        let deadlock = StrataError::DeadlockPrevented {
            txn_id: TxnId::new(1),
        };
        assert!(deadlock.is_deadlock_prevented());
        assert!(!deadlock.is_unique_violation());

        let unique = StrataError::UniqueViolation {
            index: "i".to_string(),
            key: Tuple::empty(),
        };
        assert!(unique.is_unique_violation());
        assert!(!unique.is_deadlock_prevented());
    }
}
