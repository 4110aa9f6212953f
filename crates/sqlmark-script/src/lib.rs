//! Statement execution, QA variants, and the script orchestrator.

pub mod errors;
pub mod script;
pub mod splitter;
pub mod statement;

pub use errors::{QaKind, Result, ScriptError};
pub use script::{ContentItem, RunTarget, Script};
pub use splitter::{find_tag_spans, split_statements, StatementSpan, TagSpan};
pub use statement::{QaDiffConfig, RunOptions, Statement, StatementKind};
