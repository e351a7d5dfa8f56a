//! Core identifier types for StrataDB.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction identifier - uniquely identifies a logical transaction attempt.
///
/// Transaction IDs are supplied by the caller (typically a coordination layer
/// minting 128-bit identifiers). They serve two purposes:
/// - Ownership of in-flight writes on version chains
/// - Priority ordering for wait-die deadlock prevention: a transaction whose
///   ID sorts *lower* started earlier and is considered "older"
///
/// Under wait-die the same ID must be reused across retries of the same
/// logical transaction so its priority is preserved.
///
/// # Example
///
/// ```rust
/// use strata_common::types::TxnId;
///
/// let older = TxnId::new(1);
/// let younger = TxnId::new(2);
/// assert!(older.is_older_than(younger));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TxnId(u128);

impl TxnId {
    /// Invalid transaction ID, used as a sentinel value.
    pub const INVALID: Self = Self(0);

    /// Minimum valid transaction ID.
    pub const MIN: Self = Self(1);

    /// Maximum transaction ID.
    pub const MAX: Self = Self(u128::MAX);

    /// Creates a new `TxnId` from a raw u128 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u128) -> Self {
        Self(id)
    }

    /// Returns the raw u128 value.
    #[inline]
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Checks if this is a valid transaction ID.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Returns true if this transaction started before `other`.
    ///
    /// Used by wait-die: an older transaction may wait on a younger one,
    /// a younger transaction requesting against an older owner dies.
    #[inline]
    #[must_use]
    pub const fn is_older_than(self, other: Self) -> bool {
        self.0 < other.0
    }

    /// Creates a TxnId from bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }

    /// Converts to bytes (big-endian).
    #[inline]
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "TxnId(INVALID)")
        } else {
            write!(f, "TxnId({})", self.0)
        }
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for TxnId {
    #[inline]
    fn from(id: u128) -> Self {
        Self::new(id)
    }
}

impl From<TxnId> for u128 {
    #[inline]
    fn from(id: TxnId) -> Self {
        id.0
    }
}

/// Row identifier - a stable handle to one logical row's version chain.
///
/// Row IDs are allocated by the row store on insert and remain valid for the
/// lifetime of the chain. Secondary indexes store row IDs, never row data.
///
/// # Example
///
/// ```rust
/// use strata_common::types::RowId;
///
/// let row = RowId::new(42);
/// assert_eq!(row.as_u64(), 42);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RowId(u64);

impl RowId {
    /// Invalid row ID, used as a sentinel value.
    pub const INVALID: Self = Self(0);

    /// First valid row ID.
    pub const FIRST: Self = Self(1);

    /// Creates a new `RowId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next row ID.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is a valid row ID.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "RowId(INVALID)")
        } else {
            write!(f, "RowId({})", self.0)
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RowId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<RowId> for u64 {
    #[inline]
    fn from(id: RowId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txn_id() {
        let txn = TxnId::new(100);
        assert_eq!(txn.as_u128(), 100);
        assert!(txn.is_valid());
        assert!(!TxnId::INVALID.is_valid());

        let bytes = txn.to_be_bytes();
        assert_eq!(TxnId::from_be_bytes(bytes), txn);
    }

    #[test]
    fn test_txn_age_ordering() {
        let older = TxnId::new(7);
        let younger = TxnId::new(8);

        assert!(older.is_older_than(younger));
        assert!(!younger.is_older_than(older));
        assert!(!older.is_older_than(older));
    }

    #[test]
    fn test_row_id() {
        let row = RowId::new(42);
        assert_eq!(row.as_u64(), 42);
        assert!(row.is_valid());
        assert!(!RowId::INVALID.is_valid());

        let next = row.next();
        assert_eq!(next.as_u64(), 43);
    }

    #[test]
    fn test_ordering() {
        assert!(TxnId::new(1) < TxnId::new(2));
        assert!(RowId::new(1) < RowId::new(2));
    }
}
