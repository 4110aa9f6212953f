//! Error taxonomy for the domain model: malformed tags, scope misuse, and
//! internal contract violations.

use thiserror::Error;

/// Errors raised while parsing or decomposing a tag block.
#[derive(Debug, Error)]
pub enum TagError {
    /// A multi-line tag had no `name` key and no derivable first record.
    #[error("tag block at index {index} has no name: provide a `name` key or a leading bare record")]
    MissingName { index: usize },

    /// A record inside a multi-line tag had no `:` separator.
    #[error("malformed record '{record}' in tag block at index {index}: expected `key: value`")]
    MalformedRecord { index: usize, record: String },
}

/// Errors raised by [`crate::scope::Scope`] construction or evaluation.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// An inclusion/exclusion pattern failed to compile as a regex and was
    /// not usable even as a literal (should not normally occur since
    /// literal matching never fails).
    #[error("invalid scope pattern '{pattern}' for component {component}")]
    InvalidPattern { component: String, pattern: String },
}

/// Contract violations inside the engine — always fatal, never recoverable.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error("context id {0} is already present in the exception ledger")]
    CtxIdReused(i64),

    #[error("unbalanced tag delimiters: {open} open_tag(s), {close} close_tag(s)")]
    UnbalancedDelimiters { open: usize, close: usize },

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}
