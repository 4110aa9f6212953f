//! External query/tabular capability contract, plus a concrete
//! SQLite-backed implementation used to drive the engine end-to-end.

pub mod error;
pub mod executor;
pub mod sqlite;
pub mod tabular;

pub use error::{QueryError, Result};
pub use executor::QueryExecutor;
pub use sqlite::SqliteExecutor;
pub use tabular::Tabular;
pub use rusqlite::types::Value;
