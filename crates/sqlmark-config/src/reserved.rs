//! Reserved attribute definitions (e.g. `Results`, `SQL`).

use serde::{Deserialize, Serialize};

/// A reserved attribute name with its default rendering behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReservedAttr {
    /// Whether this attribute is injected even when not explicitly tagged.
    #[serde(default)]
    pub include_by_default: bool,
    /// The attribute name as it appears in rendered output.
    pub attr_nm: String,
    /// Default value to render when the attribute has no provided value.
    #[serde(default)]
    pub default_val: String,
}

impl ReservedAttr {
    pub fn new(attr_nm: impl Into<String>, include_by_default: bool) -> Self {
        Self {
            include_by_default,
            attr_nm: attr_nm.into(),
            default_val: String::new(),
        }
    }
}
