//! Core types for StrataDB.

mod ids;
mod timestamps;
mod tuple;
mod view;

pub use ids::{RowId, TxnId};
pub use timestamps::Timestamp;
pub use tuple::{Datum, Tuple};
pub use view::ReadView;
