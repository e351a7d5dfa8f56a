//! Store configuration.
//!
//! The secondary index set and the deadlock prevention policy are fixed at
//! store construction; there is no online schema change at this layer.

use serde::{Deserialize, Serialize};

use strata_common::constants::DEFAULT_MAX_CHAIN_VERSIONS;
use strata_index::IndexKind;
use strata_txn::DeadlockPolicy;

/// Declaration of one secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Name used to address the index in queries.
    pub name: String,
    /// Row tuple columns projected into the index key, in order.
    pub columns: Vec<usize>,
    /// Storage and uniqueness variant.
    pub kind: IndexKind,
}

impl IndexSpec {
    /// Creates an index declaration.
    pub fn new(name: impl Into<String>, columns: Vec<usize>, kind: IndexKind) -> Self {
        Self {
            name: name.into(),
            columns,
            kind,
        }
    }
}

/// Configuration for an [`MvStore`](crate::MvStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Deadlock prevention policy applied to every lock table in the store.
    pub deadlock_policy: DeadlockPolicy,
    /// Version retention cap per row chain.
    pub max_chain_versions: usize,
    /// Secondary indexes, fixed at construction.
    pub indexes: Vec<IndexSpec>,
}

impl StoreConfig {
    /// Adds an index declaration.
    #[must_use]
    pub fn with_index(mut self, spec: IndexSpec) -> Self {
        self.indexes.push(spec);
        self
    }

    /// Sets the deadlock prevention policy.
    #[must_use]
    pub fn with_deadlock_policy(mut self, policy: DeadlockPolicy) -> Self {
        self.deadlock_policy = policy;
        self
    }

    /// Sets the per-chain version retention cap.
    #[must_use]
    pub fn with_max_chain_versions(mut self, cap: usize) -> Self {
        self.max_chain_versions = cap;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            deadlock_policy: DeadlockPolicy::WaitDie,
            max_chain_versions: DEFAULT_MAX_CHAIN_VERSIONS,
            indexes: Vec::new(),
        }
    }
}
