//! Errors raised while building or exporting a Markup document.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("I/O error writing markup output: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Script(#[from] sqlmark_script::ScriptError),
}

pub type Result<T> = std::result::Result<T, MarkupError>;
