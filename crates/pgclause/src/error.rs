//! Error types for pgclause

use thiserror::Error;

/// Result type alias for pgclause operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for building and running statements
#[derive(Debug, Error)]
pub enum DbError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid connection parameters
    #[error("Config error: {0}")]
    Config(String),

    /// Statement execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A statement was compiled before `set_table` was called.
    #[error("No table set for {0} statement")]
    MissingTable(&'static str),

    /// `add_to_group` referenced a group that was never started.
    #[error("Unknown condition group '{0}'")]
    UnknownGroup(String),

    /// A clause value that cannot produce valid SQL.
    #[error("Invalid clause: {0}")]
    InvalidClause(String),

    /// Named placeholder and bindings disagree.
    #[error("Binding error: {0}")]
    Binding(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid clause error
    pub fn invalid_clause(message: impl Into<String>) -> Self {
        Self::InvalidClause(message.into())
    }

    /// Create a binding error
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Whether this error is a caller mistake detected before anything was sent.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::MissingTable(_) | Self::UnknownGroup(_) | Self::InvalidClause(_) | Self::Binding(_)
        )
    }

    /// Parse a tokio_postgres error into a more specific DbError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}
