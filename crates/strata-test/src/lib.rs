//! Shared helpers for StrataDB integration tests.

#![warn(clippy::all)]

use std::sync::Arc;

use strata_common::types::{Datum, Tuple, TxnId};
use strata_index::IndexKind;
use strata_mvcc::LogicalClock;
use strata_store::{IndexSpec, MvStore, StoreConfig};
use strata_txn::DeadlockPolicy;

/// Builds a store with a unique hash index on column 0 and a non-unique
/// sorted index on column 1, without deadlock prevention.
pub fn open_store() -> Arc<MvStore> {
    open_store_with_policy(DeadlockPolicy::None)
}

/// Builds the standard test store with an explicit deadlock policy.
pub fn open_store_with_policy(policy: DeadlockPolicy) -> Arc<MvStore> {
    let config = StoreConfig::default()
        .with_deadlock_policy(policy)
        .with_index(IndexSpec::new("by_id", vec![0], IndexKind::HashUnique))
        .with_index(IndexSpec::new(
            "by_name",
            vec![1],
            IndexKind::SortedNonUnique,
        ));
    Arc::new(MvStore::new(config).expect("valid test config"))
}

/// Builds a store with a single sorted unique index on column 0.
pub fn open_sorted_store() -> Arc<MvStore> {
    let config = StoreConfig::default()
        .with_deadlock_policy(DeadlockPolicy::None)
        .with_index(IndexSpec::new("by_id", vec![0], IndexKind::SortedUnique));
    Arc::new(MvStore::new(config).expect("valid test config"))
}

/// A fresh logical clock for minting commit timestamps.
pub fn open_clock() -> Arc<LogicalClock> {
    Arc::new(LogicalClock::new())
}

/// A two-field row tuple `(id, name)`.
pub fn row(id: i64, name: &str) -> Tuple {
    Tuple::new(vec![Datum::int(id), Datum::str(name)])
}

/// A single-field key tuple over `id`.
pub fn key_of(id: i64) -> Tuple {
    Tuple::new(vec![Datum::int(id)])
}

/// A single-field key tuple over `name`.
pub fn name_key(name: &str) -> Tuple {
    Tuple::new(vec![Datum::str(name)])
}

/// Shorthand transaction ID constructor.
pub fn txn(n: u128) -> TxnId {
    TxnId::new(n)
}
