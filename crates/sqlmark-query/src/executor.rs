//! The external query capability contract: the one boundary the
//! orchestration layer crosses to actually run SQL.

use crate::error::Result;
use crate::tabular::Tabular;

/// A connector capable of running SQL against some warehouse or database.
///
/// Implementations are assumed synchronous: `query`/`ex` block until the
/// driver returns or raises.
pub trait QueryExecutor {
    /// Runs `sql` and, when `results` is true, returns the full result set
    /// as a [`Tabular`]; when false, returns an empty `Tabular` (a
    /// cursor-like handle with no materialized rows). When `lower` is
    /// true, column names are normalized to lowercase.
    fn query(&self, sql: &str, results: bool, lower: bool) -> Result<Tabular>;

    /// Runs `sql` for side effects only, without fetching a result set.
    fn ex(&self, sql: &str) -> Result<()>;
}
