//! Paired `.sql`/`.md` document rendering, plus an optional terminal
//! renderer used when a statement runs with `render = true`.

pub mod errors;
pub mod render;
pub mod terminal;

pub use errors::{MarkupError, Result};
pub use render::{ExportPaths, Markup};
pub use terminal::TerminalRenderer;
