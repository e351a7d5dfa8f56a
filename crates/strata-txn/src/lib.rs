//! # strata-txn
//!
//! Hierarchical lock management for StrataDB.
//!
//! This crate provides the per-key lock table used by the row store and by
//! every secondary index:
//!
//! - **Five lock modes**: IS, IX, S, SIX, and X with the standard
//!   intent-lock compatibility matrix.
//!
//! - **Asynchronous acquisition**: incompatible requests suspend on a
//!   oneshot grant channel rather than blocking a thread; a release wakes
//!   exactly one head-of-queue waiter.
//!
//! - **Wait-die deadlock prevention**: a younger transaction that would
//!   wait behind an older incompatible owner fails fast with a retryable
//!   error instead of queuing.
//!
//! - **Downgrades**: next-key locking protocols shed successor-key locks
//!   back to intent modes once exclusivity is no longer needed.
//!
//! # Example
//!
//! ```ignore
//! use strata_txn::lock::{DeadlockPolicy, LockKey, LockMode, LockTable};
//! use strata_common::types::{RowId, TxnId};
//!
//! let table = LockTable::new(DeadlockPolicy::WaitDie);
//! let txn = TxnId::new(1);
//! let granted = table
//!     .acquire(txn, LockKey::row(RowId::new(7)), LockMode::Exclusive)
//!     .await?;
//! assert_eq!(granted, LockMode::Exclusive);
//! table.release_all(txn);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Lock table implementation.
///
/// This module provides:
/// - [`lock::LockTable`]: per-key lock state with async acquisition
/// - [`lock::LockMode`]: the five hierarchical lock modes
/// - [`lock::LockKey`]: row and index-key lock targets
/// - [`lock::DeadlockPolicy`]: wait-die or unconditional queuing
pub mod lock;

// Re-export commonly used types
pub use lock::{DeadlockPolicy, LockKey, LockMode, LockStats, LockTable};
