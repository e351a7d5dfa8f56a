//! # strata-mvcc
//!
//! Multi-version row storage for StrataDB.
//!
//! This crate implements:
//! - Version chains with half-open commit-timestamp visibility intervals
//! - The version-chain row store that owns all chain heads
//! - A minimal logical clock matching the external clock contract

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Per-row version chains
pub mod chain;

/// Logical clock
pub mod clock;

/// The version-chain row store
pub mod store;

pub use chain::{VersionChain, VersionFilter, WriteOutcome};
pub use clock::LogicalClock;
pub use store::RowStore;
