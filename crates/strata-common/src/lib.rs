//! # strata-common
//!
//! Common types, errors, and constants for StrataDB.
//!
//! This crate provides the foundational types used across all StrataDB
//! components:
//!
//! - **Types**: Core identifiers (`TxnId`, `RowId`), commit timestamps,
//!   tuples with the `TOMBSTONE`/`INF` sentinels, and read views
//! - **Errors**: Unified error handling with `StrataError`
//! - **Constants**: System-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use strata_common::error::StrataResult;
//! use strata_common::types::{Datum, RowId, Tuple, TxnId};
//!
//! fn example() -> StrataResult<Tuple> {
//!     let txn_id = TxnId::new(1);
//!     let row_id = RowId::new(42);
//!     let row = Tuple::from(vec![Datum::int(7), Datum::str("alice")]);
//!     assert!(txn_id.is_valid() && row_id.is_valid());
//!     row.select(&[0])
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{StrataError, StrataResult};
pub use types::{Datum, ReadView, RowId, Timestamp, Tuple, TxnId};
