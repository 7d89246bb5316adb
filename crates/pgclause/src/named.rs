//! Named placeholders (`:name`) and their rewrite to PostgreSQL's `$1, $2, ...`.
//!
//! Statements are compiled with named placeholders so the generated SQL is
//! stable and readable. Right before execution [`to_positional`] walks the
//! SQL once, skipping string literals, quoted identifiers, comments,
//! dollar-quoted bodies and `::` casts, and numbers every distinct name in
//! order of first appearance.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use tokio_postgres::types::ToSql;

/// Ordered mapping from placeholder name to bound value.
///
/// Names are stored without the leading `:`; every lookup accepts either form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

fn strip_colon(name: &str) -> &str {
    name.strip_prefix(':').unwrap_or(name)
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `name`, replacing and returning any previous value.
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        let name = strip_colon(name);
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name.to_string(), value));
                None
            }
        }
    }

    /// Consuming counterpart of [`Bindings::bind`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    /// Bind `value` under `stem`, or under `stem_1`, `stem_2`, ... if `stem`
    /// is taken. Returns the name actually used.
    pub(crate) fn reserve(&mut self, stem: String, value: Value) -> String {
        let mut name = stem.clone();
        let mut n = 1;
        while self.contains(&name) {
            name = format!("{stem}_{n}");
            n += 1;
        }
        self.entries.push((name.clone(), value));
        name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = strip_colon(name);
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    /// Placeholder names in binding order, without the leading `:`.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.bind(name.as_ref(), value);
        }
        bindings
    }
}

/// A statement rewritten for the wire: `$n` placeholders and values in `$n` order.
#[derive(Debug)]
pub struct Positional<'a> {
    pub sql: String,
    pub params: Vec<&'a Value>,
}

impl Positional<'_> {
    /// Parameters as references compatible with tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|v| *v as &(dyn ToSql + Sync))
            .collect()
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Index just past a `'...'` or `"..."` run starting at `start`. Doubled quotes escape.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p + 1)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| start + 2 + p + 2)
}

/// Skip `$tag$ ... $tag$`. A `$` that does not open a tag (e.g. `$1`) is a single byte.
fn skip_dollar_quoted(bytes: &[u8], start: usize) -> usize {
    let mut j = start + 1;
    if j < bytes.len() && bytes[j].is_ascii_digit() {
        return start + 1;
    }
    while j < bytes.len() && is_ident_char(bytes[j]) {
        j += 1;
    }
    if j >= bytes.len() || bytes[j] != b'$' {
        return start + 1;
    }
    let tag = &bytes[start..=j];
    bytes[j + 1..]
        .windows(tag.len())
        .position(|w| w == tag)
        .map_or(bytes.len(), |p| j + 1 + p + tag.len())
}

/// Rewrite `:name` placeholders to `$n` and order the bound values to match.
///
/// A name used more than once maps to the same `$n`. Fails if the SQL uses a
/// name with no binding, or if a binding is never used.
pub fn to_positional<'a>(sql: &str, bindings: &'a Bindings) -> DbResult<Positional<'a>> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut order: Vec<usize> = Vec::with_capacity(bindings.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => i = skip_quoted(bytes, i, b'\''),
            b'"' => i = skip_quoted(bytes, i, b'"'),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'$' => i = skip_dollar_quoted(bytes, i),
            b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
            b':' if bytes.get(i + 1).is_some_and(|&b| is_ident_start(b)) => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                let name = &sql[start..end];
                let idx = bindings
                    .position(name)
                    .ok_or_else(|| DbError::binding(format!("no value bound for :{name}")))?;
                let n = match order.iter().position(|&o| o == idx) {
                    Some(p) => p + 1,
                    None => {
                        order.push(idx);
                        order.len()
                    }
                };
                out.push_str(&sql[last..i]);
                out.push('$');
                out.push_str(&n.to_string());
                last = end;
                i = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[last..]);

    if order.len() != bindings.len() {
        let unused: Vec<String> = bindings
            .names()
            .enumerate()
            .filter(|(idx, _)| !order.contains(idx))
            .map(|(_, name)| format!(":{name}"))
            .collect();
        return Err(DbError::binding(format!(
            "bound values not used by the statement: {}",
            unused.join(", ")
        )));
    }

    let params = order.iter().map(|&idx| &bindings.entries[idx].1).collect();
    Ok(Positional { sql: out, params })
}
