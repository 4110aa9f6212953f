//! [`SqliteExecutor`] -- a concrete, in-process `QueryExecutor` backed by
//! `rusqlite`. The crate's one non-mock collaborator, used to drive the
//! statement execution lifecycle end-to-end in tests.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::executor::QueryExecutor;
use crate::tabular::Tabular;

/// SQLite-backed implementation of [`QueryExecutor`].
///
/// Wraps a [`rusqlite::Connection`] in a `Mutex` so it can be shared across
/// statements the way `Script` shares one connector among all its
/// statements.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "opening SQLite database");
        let conn = Connection::open(path)
            .map_err(|e| QueryError::Connection(format!("failed to open {}: {e}", path.display())))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory SQLite database (used by tests).
    pub fn open_in_memory() -> Result<Self> {
        debug!("opening in-memory SQLite database");
        let conn = Connection::open_in_memory()
            .map_err(|e| QueryError::Connection(format!("failed to open in-memory db: {e}")))?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl QueryExecutor for SqliteExecutor {
    fn query(&self, sql: &str, results: bool, lower: bool) -> Result<Tabular> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| QueryError::Connection(format!("mutex poisoned: {e}")))?;
        let mut stmt = conn.prepare(sql)?;
        let mut columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        if !results {
            stmt.execute([])?;
            return Ok(Tabular::new(Vec::new(), Vec::new()));
        }
        if lower {
            columns = columns.into_iter().map(|c| c.to_lowercase()).collect();
        }
        let ncols = columns.len();
        let mut rows_out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(ncols);
            for i in 0..ncols {
                values.push(row.get::<_, rusqlite::types::Value>(i)?);
            }
            rows_out.push(values);
        }
        Ok(Tabular::new(columns, rows_out))
    }

    fn ex(&self, sql: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| QueryError::Connection(format!("mutex poisoned: {e}")))?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_returns_columns_and_rows() {
        let db = SqliteExecutor::open_in_memory().unwrap();
        db.ex("create table t(a integer, b text)").unwrap();
        db.ex("insert into t values (1, 'x'), (2, 'y')").unwrap();
        let t = db.query("select a, b from t order by a", true, false).unwrap();
        assert_eq!(t.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(t.row_count(), 2);
    }

    #[test]
    fn query_with_results_false_does_not_materialize_rows() {
        let db = SqliteExecutor::open_in_memory().unwrap();
        db.ex("create table t(a integer)").unwrap();
        let t = db.query("insert into t values (1)", false, false).unwrap();
        assert_eq!(t.row_count(), 0);
    }

    #[test]
    fn lower_normalizes_column_names() {
        let db = SqliteExecutor::open_in_memory().unwrap();
        db.ex("create table T(A integer)").unwrap();
        let t = db.query("select A from T", true, true).unwrap();
        assert_eq!(t.columns(), &["a".to_string()]);
    }

    #[test]
    fn driver_error_surfaces_as_query_error() {
        let db = SqliteExecutor::open_in_memory().unwrap();
        let err = db.query("select * from does_not_exist", true, false).unwrap_err();
        assert!(matches!(err, QueryError::Driver(_)));
    }
}
