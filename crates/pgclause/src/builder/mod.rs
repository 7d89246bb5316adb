//! The clause-accumulating query builder.
//!
//! A [`QueryBuilder`] collects clauses through `&mut self` calls in any
//! order, then a terminating call (`select`, `insert`, `update`, `delete`,
//! `custom`) compiles them into one statement with named placeholders,
//! executes it on a borrowed [`GenericClient`] and resets the builder.
//!
//! # Usage
//!
//! ```ignore
//! use pgclause::{Connector, FetchMode, JoinKind, QueryBuilder, SortDir};
//!
//! let mut qb = QueryBuilder::new();
//! qb.set_table("templates")
//!     .add_join(JoinKind::Left, "template_links", "template_links.template_id = templates.id")
//!     .add_where("templates.id", 1, Connector::None)
//!     .add_order_by("template_links.title", SortDir::Asc)
//!     .set_fetch_mode(FetchMode::Multi);
//!
//! let rows = qb
//!     .select(&client, "templates.*, template_links.url AS link_url")
//!     .await?
//!     .many();
//! ```
//!
//! State is taken out of the builder at the start of every terminating call,
//! so a failed statement never leaks clauses into the next one.

mod clause;
mod compile;
mod output;

#[cfg(test)]
mod tests;

pub use clause::{Cmp, Connector, FetchMode, GroupOp, JoinKind, Membership, Operand, SortDir};
pub use compile::CompiledQuery;
pub use output::{Fetched, Written};

use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::monitor::log_statement;
use crate::named::Bindings;
use crate::row::Record;
use crate::value::Value;
use clause::{
    ClauseState, Group, GroupCondition, GroupTerm, Join, Limit, MembershipPredicate, OrderBy,
    Predicate,
};
use std::time::Instant;

/// Accumulates clauses for one statement at a time.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    state: ClauseState,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with the target table already set.
    pub fn with_table(table: impl Into<String>) -> Self {
        let mut qb = Self::new();
        qb.set_table(table);
        qb
    }

    // ==================== Clause setters ====================

    /// Replace the target table.
    pub fn set_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.state.table = Some(table.into());
        self
    }

    /// Append `<KIND> JOIN <table> ON ( <on> )`.
    pub fn add_join(
        &mut self,
        kind: JoinKind,
        table: impl Into<String>,
        on: impl Into<String>,
    ) -> &mut Self {
        self.state.joins.push(Join {
            kind,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    /// Append `<connector> <column> = :<placeholder>`.
    ///
    /// The first predicate normally uses [`Connector::None`]; later ones need
    /// `And`/`Or`. That is left to the caller.
    pub fn add_where(
        &mut self,
        column: impl Into<String>,
        value: impl Into<Value>,
        connector: Connector,
    ) -> &mut Self {
        self.add_where_cmp(column, Cmp::Eq, value, connector)
    }

    /// Append `<connector> <column> <op> :<placeholder>`.
    pub fn add_where_cmp(
        &mut self,
        column: impl Into<String>,
        op: Cmp,
        value: impl Into<Value>,
        connector: Connector,
    ) -> &mut Self {
        self.state.wheres.push(Predicate {
            column: column.into(),
            op,
            value: value.into(),
            connector,
        });
        self
    }

    /// Append `<connector> <column> IN|NOT IN (:p0,:p1,...)`.
    ///
    /// An empty list binds nothing: `IN` renders as `FALSE`, `NOT IN` as `TRUE`.
    pub fn add_where_in<T: Into<Value>>(
        &mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
        op: Membership,
        connector: Connector,
    ) -> &mut Self {
        self.state.where_ins.push(MembershipPredicate {
            column: column.into(),
            op,
            values: values.into_iter().map(Into::into).collect(),
            connector,
        });
        self
    }

    /// Open the condition group `key`, rendered as `<connector> ( ... )`.
    ///
    /// Starting an existing key clears its conditions but keeps its position.
    pub fn start_group(&mut self, key: impl Into<String>, connector: Connector) -> &mut Self {
        let key = key.into();
        match self.state.group_mut(&key) {
            Some(group) => {
                group.connector = connector;
                group.conditions.clear();
            }
            None => self.state.groups.push(Group {
                key,
                connector,
                conditions: Vec::new(),
            }),
        }
        self
    }

    /// Append a condition to the group `key`.
    ///
    /// Fails with [`DbError::UnknownGroup`] if `key` was never started, and
    /// with [`DbError::InvalidClause`] when a comparison gets a list operand.
    /// A membership operator given a single value treats it as a one-item list.
    pub fn add_to_group(
        &mut self,
        key: &str,
        column: impl Into<String>,
        op: impl Into<GroupOp>,
        operand: impl Into<Operand>,
        connector: Connector,
    ) -> DbResult<&mut Self> {
        let column = column.into();
        let term = match (op.into(), operand.into()) {
            (GroupOp::Cmp(op), Operand::One(value)) => GroupTerm::Compare { op, value },
            (GroupOp::Cmp(op), Operand::Many(_)) => {
                return Err(DbError::invalid_clause(format!(
                    "operator '{}' on '{}' in group '{}' takes a single value",
                    op.as_sql(),
                    column,
                    key
                )));
            }
            (GroupOp::Member(op), Operand::One(value)) => GroupTerm::Member {
                op,
                values: vec![value],
            },
            (GroupOp::Member(op), Operand::Many(values)) => GroupTerm::Member { op, values },
        };

        let group = self
            .state
            .group_mut(key)
            .ok_or_else(|| DbError::UnknownGroup(key.to_string()))?;
        group.conditions.push(GroupCondition {
            column,
            term,
            connector,
        });
        Ok(self)
    }

    pub fn add_group_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.state.group_by.push(column.into());
        self
    }

    pub fn add_order_by(&mut self, column: impl Into<String>, dir: SortDir) -> &mut Self {
        self.state.order_by.push(OrderBy {
            column: column.into(),
            dir,
        });
        self
    }

    /// Set `LIMIT <count> OFFSET <offset>`.
    pub fn set_limit(&mut self, count: u64, offset: u64) -> &mut Self {
        self.state.limit = Some(Limit { count, offset });
        self
    }

    pub fn set_fetch_mode(&mut self, mode: FetchMode) -> &mut Self {
        self.state.fetch_mode = mode;
        self
    }

    /// Add `RETURNING <column>` to the next INSERT; its first value becomes
    /// [`Written::inserted_id`].
    pub fn set_returning(&mut self, column: impl Into<String>) -> &mut Self {
        self.state.returning = Some(column.into());
        self
    }

    // ==================== Inspection ====================

    pub fn table(&self) -> Option<&str> {
        self.state.table.as_deref()
    }

    pub fn fetch_mode(&self) -> FetchMode {
        self.state.fetch_mode
    }

    /// Whether no clause of any kind is pending.
    pub fn is_empty(&self) -> bool {
        self.state == ClauseState::default()
    }

    /// Drop all pending clauses.
    pub fn reset(&mut self) {
        self.state = ClauseState::default();
    }

    fn take_state(&mut self) -> ClauseState {
        std::mem::take(&mut self.state)
    }

    // ==================== Compilation only ====================

    /// Compile the pending SELECT without resetting the builder.
    pub fn preview_select(&self, columns: &str) -> DbResult<CompiledQuery> {
        self.state.compile_select(columns)
    }

    /// Compile the pending SELECT and reset the builder.
    pub fn build_select(&mut self, columns: &str) -> DbResult<CompiledQuery> {
        self.take_state().compile_select(columns)
    }

    /// Compile an INSERT of `data` (column → value, in order) and reset the builder.
    pub fn build_insert<K, V>(
        &mut self,
        data: impl IntoIterator<Item = (K, V)>,
    ) -> DbResult<CompiledQuery>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.take_state().compile_insert(collect_data(data))
    }

    /// Compile an UPDATE setting `data` and reset the builder.
    pub fn build_update<K, V>(
        &mut self,
        data: impl IntoIterator<Item = (K, V)>,
    ) -> DbResult<CompiledQuery>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.take_state().compile_update(collect_data(data))
    }

    /// Compile a DELETE and reset the builder.
    pub fn build_delete(&mut self) -> DbResult<CompiledQuery> {
        self.take_state().compile_delete()
    }

    // ==================== Terminating calls ====================

    /// Run `SELECT <columns> FROM ...`.
    ///
    /// [`FetchMode::Single`] yields [`Fetched::One`]; otherwise [`Fetched::Many`].
    pub async fn select(
        &mut self,
        conn: &impl GenericClient,
        columns: &str,
    ) -> DbResult<Fetched> {
        let state = self.take_state();
        let compiled = state.compile_select(columns)?;
        match state.fetch_mode {
            FetchMode::Single => Ok(Fetched::One(fetch_opt(conn, &compiled).await?)),
            FetchMode::Multi | FetchMode::None => {
                Ok(Fetched::Many(fetch_all(conn, &compiled).await?))
            }
        }
    }

    /// Run `INSERT INTO <table>(cols) VALUES (...)`.
    ///
    /// PostgreSQL has no connection-wide last-insert-id, so the new row's
    /// identifier is only reported when asked for: call
    /// [`set_returning`](Self::set_returning) first and it comes back in
    /// [`Written::inserted_id`]. Without it `inserted_id` is `None`.
    pub async fn insert<K, V>(
        &mut self,
        conn: &impl GenericClient,
        data: impl IntoIterator<Item = (K, V)>,
    ) -> DbResult<Written>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let state = self.take_state();
        let compiled = state.compile_insert(collect_data(data))?;
        if state.returning.is_some() {
            let rows = fetch_all(conn, &compiled).await?;
            Ok(Written {
                rows_affected: rows.len() as u64,
                inserted_id: rows.first().and_then(|row| row.get_at(0)).cloned(),
            })
        } else {
            Ok(Written {
                rows_affected: execute(conn, &compiled).await?,
                inserted_id: None,
            })
        }
    }

    /// Run `UPDATE <table> SET ...` with the pending WHERE section.
    pub async fn update<K, V>(
        &mut self,
        conn: &impl GenericClient,
        data: impl IntoIterator<Item = (K, V)>,
    ) -> DbResult<Written>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let compiled = self.build_update(data)?;
        Ok(Written {
            rows_affected: execute(conn, &compiled).await?,
            inserted_id: None,
        })
    }

    /// Run `DELETE FROM <table>` with the pending WHERE section.
    pub async fn delete(&mut self, conn: &impl GenericClient) -> DbResult<Written> {
        let compiled = self.build_delete()?;
        Ok(Written {
            rows_affected: execute(conn, &compiled).await?,
            inserted_id: None,
        })
    }

    /// Run caller-written SQL with `:name` placeholders.
    ///
    /// Pending clauses are discarded; only the fetch mode is honoured.
    /// [`FetchMode::None`] executes and returns the affected row count.
    pub async fn custom(
        &mut self,
        conn: &impl GenericClient,
        sql: impl Into<String>,
        bindings: Bindings,
    ) -> DbResult<Fetched> {
        let state = self.take_state();
        let compiled = CompiledQuery::custom(sql, bindings);
        match state.fetch_mode {
            FetchMode::Single => Ok(Fetched::One(fetch_opt(conn, &compiled).await?)),
            FetchMode::Multi => Ok(Fetched::Many(fetch_all(conn, &compiled).await?)),
            FetchMode::None => Ok(Fetched::Written(Written {
                rows_affected: execute(conn, &compiled).await?,
                inserted_id: None,
            })),
        }
    }
}

fn collect_data<K, V>(data: impl IntoIterator<Item = (K, V)>) -> Vec<(String, Value)>
where
    K: Into<String>,
    V: Into<Value>,
{
    data.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

async fn fetch_all(conn: &impl GenericClient, compiled: &CompiledQuery) -> DbResult<Vec<Record>> {
    let positional = compiled.to_positional()?;
    let params = positional.params_ref();
    let started = Instant::now();
    let result = conn.query(&positional.sql, &params).await;
    log_statement(
        compiled.kind(),
        &positional.sql,
        params.len(),
        started.elapsed(),
        result.as_ref().map(|rows| rows.len() as u64),
    );
    result
}

async fn fetch_opt(
    conn: &impl GenericClient,
    compiled: &CompiledQuery,
) -> DbResult<Option<Record>> {
    let positional = compiled.to_positional()?;
    let params = positional.params_ref();
    let started = Instant::now();
    let result = conn.query_opt(&positional.sql, &params).await;
    log_statement(
        compiled.kind(),
        &positional.sql,
        params.len(),
        started.elapsed(),
        result.as_ref().map(|row| u64::from(row.is_some())),
    );
    result
}

async fn execute(conn: &impl GenericClient, compiled: &CompiledQuery) -> DbResult<u64> {
    let positional = compiled.to_positional()?;
    let params = positional.params_ref();
    let started = Instant::now();
    let result = conn.execute(&positional.sql, &params).await;
    log_statement(
        compiled.kind(),
        &positional.sql,
        params.len(),
        started.elapsed(),
        result.as_ref().copied(),
    );
    result
}
