//! Domain model shared by the sqlmark engine: tag parsing, name/anchor
//! inference, scope predicates, markers, renderable sections, and the
//! per-object exception ledger.

pub mod errors;
pub mod exception_handler;
pub mod marker;
pub mod parse;
pub mod scope;
pub mod section;
pub mod tag;
pub mod value;

pub use errors::{InternalError, ScopeError, TagError};
pub use exception_handler::{ExceptionHandler, ExceptionRecord, Query};
pub use marker::Marker;
pub use parse::{parse_tag_body, ParsedTag};
pub use scope::{FilterArgs, Scope, ScopeComponent};
pub use section::{Section, SectionItem};
pub use tag::Tag;
pub use value::AttrValue;
