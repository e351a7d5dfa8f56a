//! Tuple and datum types for StrataDB.
//!
//! A [`Tuple`] is an immutable, fixed-width ordered sequence of comparable
//! [`Datum`] fields. Tuples serve double duty as row values and (after
//! projection) as index keys.
//!
//! Two reserved sentinels exist alongside ordinary tuples:
//! - [`Tuple::TOMBSTONE`] - a unique zero-length value marking "row deleted"
//!   inside a version chain
//! - [`Tuple::INF`] - a unique key greater than every real key, used as the
//!   upper bound for next-key locking in sorted indexes

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{StrataError, StrataResult};

/// A single tuple field.
///
/// Only totally ordered variants are included so that any datum can be used
/// inside an index key. Cross-variant comparisons order by variant.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Datum {
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// UTF-8 string value.
    Str(String),
    /// Binary data.
    Bytes(Bytes),
}

impl Datum {
    /// Creates an integer datum.
    #[inline]
    #[must_use]
    pub const fn int(v: i64) -> Self {
        Datum::Int(v)
    }

    /// Creates a string datum.
    #[inline]
    #[must_use]
    pub fn str(v: impl Into<String>) -> Self {
        Datum::Str(v.into())
    }

    /// Creates a boolean datum.
    #[inline]
    #[must_use]
    pub const fn bool(v: bool) -> Self {
        Datum::Bool(v)
    }

    /// Creates a binary datum.
    #[inline]
    #[must_use]
    pub fn bytes(v: impl Into<Bytes>) -> Self {
        Datum::Bytes(v.into())
    }

    /// Returns the integer payload, if this datum is an integer.
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Datum::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string payload, if this datum is a string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Bool(v) => write!(f, "{v}"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Str(v) => write!(f, "{v:?}"),
            Datum::Bytes(v) => write!(f, "0x{}", hex_prefix(v)),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Bool(v) => write!(f, "{v}"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Str(v) => write!(f, "{v}"),
            Datum::Bytes(v) => write!(f, "0x{}", hex_prefix(v)),
        }
    }
}

fn hex_prefix(bytes: &Bytes) -> String {
    let shown = &bytes[..bytes.len().min(8)];
    let mut out = String::with_capacity(shown.len() * 2 + 2);
    for b in shown {
        out.push_str(&format!("{b:02x}"));
    }
    if bytes.len() > 8 {
        out.push_str("..");
    }
    out
}

impl From<i64> for Datum {
    #[inline]
    fn from(v: i64) -> Self {
        Datum::Int(v)
    }
}

impl From<&str> for Datum {
    #[inline]
    fn from(v: &str) -> Self {
        Datum::Str(v.to_string())
    }
}

impl From<String> for Datum {
    #[inline]
    fn from(v: String) -> Self {
        Datum::Str(v)
    }
}

impl From<bool> for Datum {
    #[inline]
    fn from(v: bool) -> Self {
        Datum::Bool(v)
    }
}

/// Internal representation distinguishing the two reserved sentinels from
/// ordinary field tuples.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum TupleRepr {
    /// The "row deleted" marker. Zero-length, equal only to itself.
    Tombstone,
    /// An ordinary tuple of fields.
    Fields(Vec<Datum>),
    /// The "past every key" marker. Greater than every real tuple.
    Infinite,
}

/// An immutable ordered sequence of comparable fields.
///
/// Equality and ordering are element-wise; the sentinels sort as
/// `TOMBSTONE < fields < INF` and are equal only to themselves.
///
/// # Example
///
/// ```rust
/// use strata_common::types::{Datum, Tuple};
///
/// let row = Tuple::from(vec![Datum::int(1), Datum::str("alice")]);
/// let key = row.select(&[0]).unwrap();
/// assert_eq!(key, Tuple::from(vec![Datum::int(1)]));
/// assert!(key < Tuple::INF);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple(TupleRepr);

impl Tuple {
    /// The unique zero-length "row deleted" sentinel.
    pub const TOMBSTONE: Self = Self(TupleRepr::Tombstone);

    /// The unique sentinel greater than every real key.
    pub const INF: Self = Self(TupleRepr::Infinite);

    /// Creates a tuple from a vector of fields.
    #[inline]
    #[must_use]
    pub fn new(fields: Vec<Datum>) -> Self {
        Self(TupleRepr::Fields(fields))
    }

    /// Creates an empty (zero-arity) tuple. Distinct from [`Self::TOMBSTONE`].
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(TupleRepr::Fields(Vec::new()))
    }

    /// Returns the fields of this tuple, or `None` for a sentinel.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> Option<&[Datum]> {
        match &self.0 {
            TupleRepr::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns the field at `index`, or `None` if out of range or sentinel.
    #[inline]
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Datum> {
        self.fields().and_then(|fields| fields.get(index))
    }

    /// Returns the number of fields. Sentinels have arity zero.
    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.fields().map_or(0, <[Datum]>::len)
    }

    /// Returns true if this is the tombstone sentinel.
    #[inline]
    #[must_use]
    pub const fn is_tombstone(&self) -> bool {
        matches!(self.0, TupleRepr::Tombstone)
    }

    /// Returns true if this is the infinity sentinel.
    #[inline]
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        matches!(self.0, TupleRepr::Infinite)
    }

    /// Returns true if this is an ordinary field tuple.
    #[inline]
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self.0, TupleRepr::Fields(_))
    }

    /// Projects the fields at `columns`, in order, into a new tuple.
    ///
    /// Fails on a sentinel or an out-of-range column.
    pub fn select(&self, columns: &[usize]) -> StrataResult<Tuple> {
        let fields = self.fields().ok_or_else(|| StrataError::InvalidArgument {
            message: "cannot project a sentinel tuple".to_string(),
        })?;

        let mut projected = Vec::with_capacity(columns.len());
        for &col in columns {
            let datum = fields.get(col).ok_or(StrataError::ColumnOutOfRange {
                column: col,
                arity: fields.len(),
            })?;
            projected.push(datum.clone());
        }
        Ok(Tuple::new(projected))
    }
}

impl Ord for Tuple {
    fn cmp(&self, other: &Self) -> Ordering {
        use TupleRepr::{Fields, Infinite, Tombstone};
        match (&self.0, &other.0) {
            (Tombstone, Tombstone) | (Infinite, Infinite) => Ordering::Equal,
            (Tombstone, _) | (_, Infinite) => Ordering::Less,
            (_, Tombstone) | (Infinite, _) => Ordering::Greater,
            (Fields(a), Fields(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Tuple {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            TupleRepr::Tombstone => write!(f, "Tuple(TOMBSTONE)"),
            TupleRepr::Infinite => write!(f, "Tuple(INF)"),
            TupleRepr::Fields(fields) => {
                write!(f, "Tuple(")?;
                for (i, datum) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{datum:?}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            TupleRepr::Tombstone => write!(f, "<tombstone>"),
            TupleRepr::Infinite => write!(f, "<inf>"),
            TupleRepr::Fields(fields) => {
                write!(f, "(")?;
                for (i, datum) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{datum}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<Vec<Datum>> for Tuple {
    #[inline]
    fn from(fields: Vec<Datum>) -> Self {
        Self::new(fields)
    }
}
