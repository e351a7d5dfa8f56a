//! # strata-store
//!
//! The StrataDB multi-version transactional row store.
//!
//! This crate ties the engine together:
//!
//! - **Transaction lifecycle**: caller-supplied 128-bit transaction IDs,
//!   explicit or lazy registration, commit at a caller-supplied timestamp,
//!   abort with reverse-order undo replay.
//!
//! - **Row operations**: insert/update/remove/get against the shared
//!   version-chain row store under primary row locks.
//!
//! - **Index-qualified queries**: equality search and phantom-free range
//!   scans through the configured secondary indexes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         MvStore                              │
//! │                            │                                 │
//! │    ┌───────────────────────┼─────────────────────┐          │
//! │    │                       │                     │          │
//! │    ▼                       ▼                     ▼          │
//! │ ┌──────────┐      ┌────────────────┐    ┌───────────────┐  │
//! │ │ RowStore │      │ row LockTable  │    │ Transactions  │  │
//! │ │ (chains) │      │   (wait-die)   │    │ (write + undo)│  │
//! │ └──────────┘      └────────────────┘    └───────────────┘  │
//! │      ▲                                                      │
//! │      │ resolve                                              │
//! │ ┌────┴────────────────────────────────────────┐            │
//! │ │ SecondaryIndex × N (own LockTable each)     │            │
//! │ └─────────────────────────────────────────────┘            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use strata_store::{IndexSpec, MvStore, StoreConfig};
//! use strata_index::IndexKind;
//! use strata_common::types::{Datum, ReadView, Timestamp, Tuple, TxnId};
//!
//! let store = MvStore::new(
//!     StoreConfig::default()
//!         .with_index(IndexSpec::new("by_id", vec![0], IndexKind::HashUnique)),
//! )?;
//!
//! let txn = TxnId::new(1);
//! let row = store
//!     .insert(Tuple::from(vec![Datum::int(1), Datum::str("alice")]), txn)
//!     .await?;
//! store.commit(txn, Timestamp::new(100))?;
//!
//! let value = store
//!     .get(row, ReadView::Snapshot(Timestamp::new(100)), None)
//!     .await?;
//! assert!(value.is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Store configuration.
pub mod config;

/// The multi-version store.
pub mod store;

/// Per-transaction state.
pub mod txn;

// Re-export commonly used types
pub use config::{IndexSpec, StoreConfig};
pub use store::{MvStore, StoreStats};
pub use txn::{Transaction, TransactionState};
