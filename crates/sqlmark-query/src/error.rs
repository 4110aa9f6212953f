//! Errors raised by the query/tabular capability.

use thiserror::Error;

/// Errors a `QueryExecutor` or `Tabular` operation can raise.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The underlying driver raised an error executing SQL.
    #[error("driver error: {0}")]
    Driver(#[from] rusqlite::Error),

    /// Failed to establish or maintain a database connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A column named in a `Tabular` operation does not exist.
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;
