//! # pgclause
//!
//! A small, stateful query builder for PostgreSQL.
//!
//! ## Features
//!
//! - **Accumulate, then run**: clauses (joins, where, where-in, named condition
//!   groups, group-by, order-by, limit) are added in any order; one terminating
//!   call compiles, executes and resets
//! - **Named placeholders**: statements are compiled with stable `:name`
//!   placeholders that never collide, and rewritten to `$n` only at execution
//! - **Explicit result shapes**: [`Fetched`] is one row, many rows, or a write
//!   outcome, chosen by statement kind and [`FetchMode`]
//! - **Borrowed connection**: the builder never owns a client; pass a
//!   `tokio_postgres::Client` or `Transaction` to each terminating call
//!
//! ## Example
//!
//! ```ignore
//! use pgclause::{Connector, DatabaseConfig, FetchMode, QueryBuilder};
//!
//! let client = DatabaseConfig::from_env()?.connect().await?;
//!
//! let mut qb = QueryBuilder::new();
//! qb.set_table("users")
//!     .add_where("id", 5, Connector::None)
//!     .set_fetch_mode(FetchMode::Single);
//!
//! // SELECT * FROM users WHERE  id = :id0
//! let user = qb.select(&client, "*").await?.one();
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod named;
pub mod row;
pub mod value;

pub use builder::{
    Cmp, CompiledQuery, Connector, FetchMode, Fetched, GroupOp, JoinKind, Membership, Operand,
    QueryBuilder, SortDir, Written,
};
pub use client::GenericClient;
pub use config::DatabaseConfig;
pub use error::{DbError, DbResult};
pub use monitor::StatementKind;
pub use named::{Bindings, Positional, to_positional};
pub use row::Record;
pub use value::Value;
