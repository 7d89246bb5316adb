use crate::row::Record;
use crate::value::Value;

/// Outcome of an INSERT, UPDATE, DELETE or an unshaped custom statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Written {
    pub rows_affected: u64,
    /// First column of the first `RETURNING` row, for inserts with
    /// [`set_returning`](super::QueryBuilder::set_returning).
    pub inserted_id: Option<Value>,
}

/// Result of a terminating call.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// [`FetchMode::Single`](super::FetchMode::Single): the first row, if any.
    One(Option<Record>),
    /// All rows.
    Many(Vec<Record>),
    /// No rows requested.
    Written(Written),
}

impl Fetched {
    /// The first row regardless of shape.
    pub fn one(self) -> Option<Record> {
        match self {
            Fetched::One(row) => row,
            Fetched::Many(rows) => rows.into_iter().next(),
            Fetched::Written(_) => None,
        }
    }

    /// All rows regardless of shape.
    pub fn many(self) -> Vec<Record> {
        match self {
            Fetched::One(row) => row.into_iter().collect(),
            Fetched::Many(rows) => rows,
            Fetched::Written(_) => Vec::new(),
        }
    }

    pub fn written(self) -> Option<Written> {
        match self {
            Fetched::Written(w) => Some(w),
            _ => None,
        }
    }

    /// Whether the statement produced no row at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Fetched::One(row) => row.is_none(),
            Fetched::Many(rows) => rows.is_empty(),
            Fetched::Written(_) => true,
        }
    }
}
