//! Turn accumulated clause state into SQL with named placeholders.
//!
//! Section order is fixed regardless of the order clauses were added in:
//! `SELECT .. FROM`, joins, one `WHERE` (simple predicates, then membership
//! predicates, then groups), `GROUP BY`, `ORDER BY`, `LIMIT .. OFFSET`.
//!
//! A membership test against an empty list binds nothing and renders as the
//! constant it evaluates to: `FALSE` for `IN`, `TRUE` for `NOT IN`.

use super::clause::{ClauseState, GroupTerm};
use crate::error::{DbError, DbResult};
use crate::monitor::StatementKind;
use crate::named::{Bindings, Positional, to_positional};
use crate::value::Value;

/// A compiled statement: SQL with `:name` placeholders plus their values.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    kind: StatementKind,
    sql: String,
    bindings: Bindings,
}

impl CompiledQuery {
    /// Wrap caller-written SQL. No compilation happens.
    pub fn custom(sql: impl Into<String>, bindings: Bindings) -> Self {
        Self {
            kind: StatementKind::Custom,
            sql: sql.into(),
            bindings,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn into_parts(self) -> (String, Bindings) {
        (self.sql, self.bindings)
    }

    /// Rewrite to `$n` placeholders for execution.
    pub fn to_positional(&self) -> DbResult<Positional<'_>> {
        to_positional(&self.sql, &self.bindings)
    }
}

/// Placeholder stem for a column or group key.
///
/// Periods and anything else outside `[A-Za-z0-9_]` are dropped; a stem that
/// would start with a digit gets a `p` prefix so it still scans as a name.
pub(crate) fn placeholder_stem(raw: &str) -> String {
    let stem: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    match stem.chars().next() {
        None => "p".to_string(),
        Some(c) if c.is_ascii_digit() => format!("p{stem}"),
        Some(_) => stem,
    }
}

/// Bind each value as `<base><suffix><index>` and return the `:a,:b` list.
fn bind_list(bindings: &mut Bindings, base: &str, suffix: &str, values: &[Value]) -> String {
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let name = bindings.reserve(format!("{base}{suffix}{idx}"), value.clone());
            format!(":{name}")
        })
        .collect::<Vec<_>>()
        .join(",")
}

impl ClauseState {
    fn require_table(&self, kind: StatementKind) -> DbResult<&str> {
        match self.table.as_deref().map(str::trim) {
            Some(table) if !table.is_empty() => Ok(table),
            _ => Err(DbError::MissingTable(kind.as_str())),
        }
    }

    pub(crate) fn compile_select(&self, columns: &str) -> DbResult<CompiledQuery> {
        let table = self.require_table(StatementKind::Select)?;
        let columns = match columns.trim() {
            "" => "*",
            cols => cols,
        };

        let mut sql = format!("SELECT {} FROM {}", columns, table);
        let mut bindings = Bindings::new();
        self.push_joins(&mut sql);
        self.push_where(&mut sql, &mut bindings)?;
        self.push_group_by(&mut sql);
        self.push_order_by(&mut sql);
        self.push_limit(&mut sql);

        Ok(CompiledQuery {
            kind: StatementKind::Select,
            sql,
            bindings,
        })
    }

    pub(crate) fn compile_insert(&self, data: Vec<(String, Value)>) -> DbResult<CompiledQuery> {
        let table = self.require_table(StatementKind::Insert)?;
        check_columns("INSERT", &data)?;

        let mut bindings = Bindings::new();
        let mut columns = Vec::with_capacity(data.len());
        let mut placeholders = Vec::with_capacity(data.len());
        for (column, value) in data {
            let name = bindings.reserve(placeholder_stem(&column), value);
            placeholders.push(format!(":{name}"));
            columns.push(column);
        }

        let mut sql = format!(
            "INSERT INTO {}({}) VALUES ({})",
            table,
            columns.join(","),
            placeholders.join(",")
        );
        if let Some(returning) = &self.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(returning);
        }

        Ok(CompiledQuery {
            kind: StatementKind::Insert,
            sql,
            bindings,
        })
    }

    pub(crate) fn compile_update(&self, data: Vec<(String, Value)>) -> DbResult<CompiledQuery> {
        let table = self.require_table(StatementKind::Update)?;
        check_columns("UPDATE", &data)?;

        let mut bindings = Bindings::new();
        let sets: Vec<String> = data
            .into_iter()
            .map(|(column, value)| {
                let name = bindings.reserve(placeholder_stem(&column), value);
                format!("{} = :{}", column, name)
            })
            .collect();

        let mut sql = format!("UPDATE {} SET {}", table, sets.join(", "));
        self.push_where(&mut sql, &mut bindings)?;

        Ok(CompiledQuery {
            kind: StatementKind::Update,
            sql,
            bindings,
        })
    }

    pub(crate) fn compile_delete(&self) -> DbResult<CompiledQuery> {
        let table = self.require_table(StatementKind::Delete)?;
        let mut sql = format!("DELETE FROM {}", table);
        let mut bindings = Bindings::new();
        self.push_where(&mut sql, &mut bindings)?;

        Ok(CompiledQuery {
            kind: StatementKind::Delete,
            sql,
            bindings,
        })
    }

    fn push_joins(&self, sql: &mut String) {
        for join in &self.joins {
            sql.push_str(&format!(
                " {} JOIN {} ON ( {} )",
                join.kind.as_sql(),
                join.table,
                join.on
            ));
        }
    }

    fn push_where(&self, sql: &mut String, bindings: &mut Bindings) -> DbResult<()> {
        if !self.has_predicates() {
            return Ok(());
        }
        sql.push_str(" WHERE");

        // Shared by simple and membership predicates.
        let mut counter = 0usize;

        for pred in &self.wheres {
            let stem = format!("{}{}", placeholder_stem(&pred.column), counter);
            counter += 1;
            let name = bindings.reserve(stem, pred.value.clone());
            sql.push_str(&format!(
                " {} {} {} :{}",
                pred.connector.as_sql(),
                pred.column,
                pred.op.as_sql(),
                name
            ));
        }

        for pred in &self.where_ins {
            let base = format!("{}{}", placeholder_stem(&pred.column), counter);
            counter += 1;
            if pred.values.is_empty() {
                sql.push_str(&format!(
                    " {} {}",
                    pred.connector.as_sql(),
                    pred.op.empty_list_sql()
                ));
                continue;
            }
            let list = bind_list(bindings, &base, "win", &pred.values);
            sql.push_str(&format!(
                " {} {} {} ({})",
                pred.connector.as_sql(),
                pred.column,
                pred.op.as_sql(),
                list
            ));
        }

        for group in &self.groups {
            if group.conditions.is_empty() {
                return Err(DbError::invalid_clause(format!(
                    "condition group '{}' has no conditions",
                    group.key
                )));
            }
            let key = placeholder_stem(&group.key);
            let mut conds = Vec::with_capacity(group.conditions.len());
            for (counter, cond) in group.conditions.iter().enumerate() {
                let base = format!("{key}{counter}");
                let term = match &cond.term {
                    GroupTerm::Compare { op, value } => {
                        let name = bindings.reserve(base, value.clone());
                        format!("{} {} :{}", cond.column, op.as_sql(), name)
                    }
                    GroupTerm::Member { op, values } if values.is_empty() => {
                        op.empty_list_sql().to_string()
                    }
                    GroupTerm::Member { op, values } => {
                        let list = bind_list(bindings, &base, "gwin", values);
                        format!("{} {} ({})", cond.column, op.as_sql(), list)
                    }
                };
                let connector = cond.connector.as_sql();
                if connector.is_empty() {
                    conds.push(term);
                } else {
                    conds.push(format!("{connector} {term}"));
                }
            }
            sql.push_str(&format!(
                " {} ( {} )",
                group.connector.as_sql(),
                conds.join(" ")
            ));
        }

        Ok(())
    }

    fn push_group_by(&self, sql: &mut String) {
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
    }

    fn push_order_by(&self, sql: &mut String) {
        if self.order_by.is_empty() {
            return;
        }
        let orders: Vec<String> = self
            .order_by
            .iter()
            .map(|o| format!("{} {}", o.column, o.dir.as_sql()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&orders.join(", "));
    }

    fn push_limit(&self, sql: &mut String) {
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit.count, limit.offset));
        }
    }
}

fn check_columns(statement: &str, data: &[(String, Value)]) -> DbResult<()> {
    if data.is_empty() {
        return Err(DbError::invalid_clause(format!(
            "{statement} requires at least one column"
        )));
    }
    for (idx, (column, _)) in data.iter().enumerate() {
        if column.trim().is_empty() {
            return Err(DbError::invalid_clause(format!(
                "{statement} column name is empty"
            )));
        }
        if data[..idx].iter().any(|(c, _)| c == column) {
            return Err(DbError::invalid_clause(format!(
                "{statement} sets column '{column}' more than once"
            )));
        }
    }
    Ok(())
}
