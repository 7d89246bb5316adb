//! Clause types accumulated by [`QueryBuilder`](super::QueryBuilder).

use crate::error::DbError;
use crate::value::Value;
use std::str::FromStr;

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Boolean connector placed in front of a predicate or group.
///
/// `None` renders as an empty string and is meant for the first predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    None,
    And,
    Or,
}

impl Connector {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Connector::None => "",
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

impl FromStr for Connector {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "" => Ok(Connector::None),
            "AND" => Ok(Connector::And),
            "OR" => Ok(Connector::Or),
            other => Err(DbError::invalid_clause(format!("unknown connector '{other}'"))),
        }
    }
}

/// JOIN flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
            JoinKind::Cross => "CROSS",
        }
    }
}

impl FromStr for JoinKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "INNER" | "" => Ok(JoinKind::Inner),
            "LEFT" | "LEFT OUTER" => Ok(JoinKind::Left),
            "RIGHT" | "RIGHT OUTER" => Ok(JoinKind::Right),
            "FULL" | "FULL OUTER" => Ok(JoinKind::Full),
            "CROSS" => Ok(JoinKind::Cross),
            other => Err(DbError::invalid_clause(format!("unknown join kind '{other}'"))),
        }
    }
}

/// Comparison operator for a single-value predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cmp {
    #[default]
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    ILike,
    NotILike,
}

impl Cmp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Cmp::Eq => "=",
            Cmp::Ne => "!=",
            Cmp::Lt => "<",
            Cmp::Lte => "<=",
            Cmp::Gt => ">",
            Cmp::Gte => ">=",
            Cmp::Like => "LIKE",
            Cmp::NotLike => "NOT LIKE",
            Cmp::ILike => "ILIKE",
            Cmp::NotILike => "NOT ILIKE",
        }
    }
}

impl FromStr for Cmp {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "=" | "==" => Ok(Cmp::Eq),
            "!=" | "<>" => Ok(Cmp::Ne),
            "<" => Ok(Cmp::Lt),
            "<=" => Ok(Cmp::Lte),
            ">" => Ok(Cmp::Gt),
            ">=" => Ok(Cmp::Gte),
            "LIKE" => Ok(Cmp::Like),
            "NOT LIKE" => Ok(Cmp::NotLike),
            "ILIKE" => Ok(Cmp::ILike),
            "NOT ILIKE" => Ok(Cmp::NotILike),
            other => Err(DbError::invalid_clause(format!(
                "unknown comparison operator '{other}'"
            ))),
        }
    }
}

/// Set-membership operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    In,
    NotIn,
}

impl Membership {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Membership::In => "IN",
            Membership::NotIn => "NOT IN",
        }
    }

    /// What the test reduces to when the list is empty.
    pub(crate) fn empty_list_sql(&self) -> &'static str {
        match self {
            Membership::In => "FALSE",
            Membership::NotIn => "TRUE",
        }
    }
}

impl FromStr for Membership {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "IN" => Ok(Membership::In),
            "NOT IN" => Ok(Membership::NotIn),
            other => Err(DbError::invalid_clause(format!(
                "unknown membership operator '{other}'"
            ))),
        }
    }
}

/// Operator accepted inside a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOp {
    Cmp(Cmp),
    Member(Membership),
}

impl From<Cmp> for GroupOp {
    fn from(op: Cmp) -> Self {
        GroupOp::Cmp(op)
    }
}

impl From<Membership> for GroupOp {
    fn from(op: Membership) -> Self {
        GroupOp::Member(op)
    }
}

impl FromStr for GroupOp {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<Membership>() {
            Ok(m) => Ok(GroupOp::Member(m)),
            Err(_) => s.parse::<Cmp>().map(GroupOp::Cmp),
        }
    }
}

/// Right-hand side of a group condition: one value, or a list for IN / NOT IN.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    One(Value),
    Many(Vec<Value>),
}

impl Operand {
    pub fn list<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Operand::Many(values.into_iter().map(Into::into).collect())
    }
}

macro_rules! impl_operand_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Operand {
                fn from(v: $t) -> Self {
                    Operand::One(v.into())
                }
            }
        )*
    };
}

impl_operand_from!(
    Value,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    &str,
    String,
    &String,
    serde_json::Value,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>
);

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        Operand::One(v.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Operand::list(values)
    }
}

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

impl FromStr for SortDir {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "ASC" | "" => Ok(SortDir::Asc),
            "DESC" => Ok(SortDir::Desc),
            other => Err(DbError::invalid_clause(format!("unknown sort direction '{other}'"))),
        }
    }
}

/// Shape of the result of `select` and `custom` statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// No shape requested: `select` returns all rows, `custom` returns the affected row count.
    #[default]
    None,
    /// First row only, or nothing.
    Single,
    /// All rows.
    Multi,
}

impl FromStr for FetchMode {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(FetchMode::None),
            "single" => Ok(FetchMode::Single),
            "multi" => Ok(FetchMode::Multi),
            other => Err(DbError::invalid_clause(format!("unknown fetch mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Predicate {
    pub column: String,
    pub op: Cmp,
    pub value: Value,
    pub connector: Connector,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MembershipPredicate {
    pub column: String,
    pub op: Membership,
    pub values: Vec<Value>,
    pub connector: Connector,
}

/// A condition inside a group, already checked for operator/operand agreement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GroupTerm {
    Compare { op: Cmp, value: Value },
    Member { op: Membership, values: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GroupCondition {
    pub column: String,
    pub term: GroupTerm,
    pub connector: Connector,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Group {
    pub key: String,
    pub connector: Connector,
    pub conditions: Vec<GroupCondition>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OrderBy {
    pub column: String,
    pub dir: SortDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Limit {
    pub count: u64,
    pub offset: u64,
}

/// Everything a builder accumulates between two terminating calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ClauseState {
    pub table: Option<String>,
    pub joins: Vec<Join>,
    pub wheres: Vec<Predicate>,
    pub where_ins: Vec<MembershipPredicate>,
    pub groups: Vec<Group>,
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<Limit>,
    pub returning: Option<String>,
    pub fetch_mode: FetchMode,
}

impl ClauseState {
    pub fn group_mut(&mut self, key: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.key == key)
    }

    pub fn has_predicates(&self) -> bool {
        !self.wheres.is_empty() || !self.where_ins.is_empty() || !self.groups.is_empty()
    }
}
