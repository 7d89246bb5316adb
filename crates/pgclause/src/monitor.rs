//! Statement logging via `tracing`.
//!
//! Every executed statement emits one event on the `pgclause.sql` target:
//! `DEBUG` on success, `WARN` on failure. Enable with e.g.
//! `RUST_LOG=pgclause.sql=debug`.

use crate::error::DbError;
use std::fmt;
use std::time::Duration;

/// Longest SQL prefix (in bytes) written to a log event.
const MAX_LOGGED_SQL: usize = 200;

/// The kind of statement being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// Caller-supplied SQL.
    Custom,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Emit the outcome of one execution. `outcome` carries the row count on success.
pub(crate) fn log_statement(
    kind: StatementKind,
    sql: &str,
    param_count: usize,
    elapsed: Duration,
    outcome: Result<u64, &DbError>,
) {
    let sql = truncate_sql_bytes(sql, MAX_LOGGED_SQL);
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    match outcome {
        Ok(rows) => tracing::debug!(
            target: "pgclause.sql",
            kind = %kind,
            param_count,
            rows,
            elapsed_ms,
            sql = %sql,
            "statement executed"
        ),
        Err(err) => tracing::warn!(
            target: "pgclause.sql",
            kind = %kind,
            param_count,
            elapsed_ms,
            sql = %sql,
            error = %err,
            "statement failed"
        ),
    }
}
