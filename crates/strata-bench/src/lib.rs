//! Benchmark helpers for StrataDB.

#![warn(clippy::all)]

use std::sync::Arc;

use strata_common::types::{Datum, Tuple};
use strata_index::IndexKind;
use strata_store::{IndexSpec, MvStore, StoreConfig};
use strata_txn::DeadlockPolicy;

/// Builds the store layout used by the benchmarks: a unique hash index on
/// column 0 and a non-unique sorted index on column 1.
pub fn bench_store() -> Arc<MvStore> {
    let config = StoreConfig::default()
        .with_deadlock_policy(DeadlockPolicy::WaitDie)
        .with_index(IndexSpec::new("by_id", vec![0], IndexKind::HashUnique))
        .with_index(IndexSpec::new(
            "by_name",
            vec![1],
            IndexKind::SortedNonUnique,
        ));
    Arc::new(MvStore::new(config).expect("valid bench config"))
}

/// A two-field row tuple `(id, name)`.
pub fn bench_row(id: i64) -> Tuple {
    Tuple::new(vec![Datum::int(id), Datum::str(format!("name-{id}"))])
}
