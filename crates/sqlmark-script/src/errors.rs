//! Error taxonomy for statement parsing, execution, and lookup.

use thiserror::Error;

use sqlmark_core::{InternalError, TagError};
use sqlmark_query::QueryError;

/// The QA variant a [`ScriptError::QaFailure`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaKind {
    Empty,
    Diff,
}

impl QaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "qa_empty",
            Self::Diff => "qa_diff",
        }
    }
}

/// All errors the orchestration layer can raise.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// A tag block was malformed or missing a required field (parse time).
    #[error("invalid tag at index {index}: {source}")]
    InvalidTags {
        index: usize,
        #[source]
        source: TagError,
    },

    /// An engine contract was violated; always fatal.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// Lookup by index or name found nothing.
    #[error("statement not found: {nm}")]
    StatementNotFound { nm: String },

    /// Name-keyed lookup hit a name shared by more than one statement.
    #[error("name '{nm}' is ambiguous: {count} statements share it")]
    DuplicateTag { nm: String, count: usize },

    /// The query capability raised while running a statement.
    #[error("execution error in statement '{nm}' (index {index}): {source}")]
    Execution {
        nm: String,
        index: usize,
        #[source]
        source: QueryError,
    },

    /// A QA variant's `process()` step raised (distinct from a failed
    /// validation outcome, which is a [`ScriptError::QaFailure`]).
    #[error("post-processing error in statement '{nm}' (index {index}): {msg}")]
    PostProcessing { nm: String, index: usize, msg: String },

    /// A QA variant's validation outcome was `false`.
    #[error("{kind} validation failed for statement '{nm}' (index {index}): {msg}")]
    QaFailure {
        kind: QaKind,
        nm: String,
        index: usize,
        msg: String,
    },
}

impl std::fmt::Display for QaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScriptError {
    /// The statement name this error is contextualized to, if any.
    pub fn nm(&self) -> Option<&str> {
        match self {
            Self::StatementNotFound { nm }
            | Self::DuplicateTag { nm, .. }
            | Self::Execution { nm, .. }
            | Self::PostProcessing { nm, .. }
            | Self::QaFailure { nm, .. } => Some(nm),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
