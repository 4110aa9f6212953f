//! Configuration types and loading for the sqlmark engine.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reserved::ReservedAttr;
use crate::wildcards::Wildcards;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration file contained invalid TOML.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized back to TOML.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Tolerances used by the `qa-diff` statement variant when none is specified
/// on the statement's own tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QaTolerance {
    #[serde(default)]
    pub relative: Option<f64>,
    #[serde(default = "default_absolute_tolerance")]
    pub absolute: Option<f64>,
}

fn default_absolute_tolerance() -> Option<f64> {
    Some(0.0)
}

impl Default for QaTolerance {
    fn default() -> Self {
        Self {
            relative: None,
            absolute: default_absolute_tolerance(),
        }
    }
}

/// Defaults applied to `qa-diff` statements that don't override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QaDefaults {
    #[serde(default = "default_partition_on")]
    pub partition_on: String,
    #[serde(default = "default_end_index_at")]
    pub end_index_at: String,
    #[serde(default)]
    pub compare_patterns: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub tolerance: QaTolerance,
}

fn default_partition_on() -> String {
    "src_description".to_string()
}
fn default_end_index_at() -> String {
    "src_description".to_string()
}

impl Default for QaDefaults {
    fn default() -> Self {
        Self {
            partition_on: default_partition_on(),
            end_index_at: default_end_index_at(),
            compare_patterns: vec![r".*".to_string()],
            ignore_patterns: Vec::new(),
            tolerance: QaTolerance::default(),
        }
    }
}

/// Immutable, fully parsed settings bundle passed to every component in the
/// engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// Delimiter opening a tag block (default `/*-`).
    #[serde(default = "default_open_tag")]
    pub open_tag: String,
    /// Delimiter closing a tag block (default `-*/`).
    #[serde(default = "default_close_tag")]
    pub close_tag: String,
    /// Record prefix inside a multi-line tag body (default `__`).
    #[serde(default = "default_record_prefix")]
    pub record_prefix: String,
    /// Separator between an anchor and a description inside a full name
    /// (default `~`).
    #[serde(default = "default_sep_desc")]
    pub sep_desc: String,

    /// Wildcard delimiter/flag configuration for attribute keys.
    #[serde(default)]
    pub wildcards: Wildcards,

    /// Attribute keys that type as `list` (`[a, b, c]`).
    #[serde(default)]
    pub types_as_list: Vec<String>,
    /// Attribute keys that type as `float`.
    #[serde(default)]
    pub types_as_float: Vec<String>,
    /// Attribute keys that type as `bool`.
    #[serde(default)]
    pub types_as_bool: Vec<String>,

    /// Reserved attribute names (`results`, `sql`) to their rendering rules.
    #[serde(default = "default_reserved")]
    pub reserved: HashMap<String, ReservedAttr>,
    /// Order in which attributes are rendered by the Markup renderer.
    #[serde(default = "default_attr_order")]
    pub attr_order: Vec<String>,

    /// First-token normalizations (e.g. `"create"` -> `"create"`).
    #[serde(default)]
    pub keyword_exceptions: HashMap<String, String>,
    /// First-keyword -> fallback anchor, used when no named object is found.
    #[serde(default = "default_generic_anchors")]
    pub generic_anchors: HashMap<String, String>,
    /// Ordered list of DB object terms recognized in the first SQL line.
    #[serde(default = "default_named_objects")]
    pub named_objects: Vec<String>,

    /// Anchors that map to QA statement variants.
    #[serde(default = "default_qa_anchors")]
    pub qa_anchors: Vec<String>,

    /// Fallback object name when no named object is matched.
    #[serde(default = "default_object")]
    pub default_object: String,
    /// Fallback description prefix (index is appended as `" #N"`).
    #[serde(default = "default_description")]
    pub default_description: String,

    /// Defaults applied to `qa-diff` statements.
    #[serde(default)]
    pub qa: QaDefaults,

    /// Sub-directory (relative to the source file) that Markup exports into.
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    /// Heading level used for statement sections in the rendered Markdown.
    #[serde(default = "default_statement_heading_level")]
    pub statement_heading_level: u8,
    /// Heading level used for marker sections in the rendered Markdown.
    #[serde(default = "default_marker_heading_level")]
    pub marker_heading_level: u8,
    /// Comment block prefixed to Markup's `.sql` export, when set.
    #[serde(default)]
    pub disclaimer: Option<String>,
}

fn default_open_tag() -> String {
    "/*-".to_string()
}
fn default_close_tag() -> String {
    "-*/".to_string()
}
fn default_record_prefix() -> String {
    "__".to_string()
}
fn default_sep_desc() -> String {
    "~".to_string()
}
fn default_object() -> String {
    "object".to_string()
}
fn default_description() -> String {
    "statement".to_string()
}
fn default_export_dir() -> String {
    ".sqlmark".to_string()
}
fn default_statement_heading_level() -> u8 {
    2
}
fn default_marker_heading_level() -> u8 {
    1
}

fn default_reserved() -> HashMap<String, ReservedAttr> {
    let mut m = HashMap::new();
    m.insert(
        "results".to_string(),
        ReservedAttr::new("Results", true),
    );
    m.insert("sql".to_string(), ReservedAttr::new("SQL", true));
    m
}

fn default_attr_order() -> Vec<String> {
    vec!["description".to_string(), "tags".to_string()]
}

fn default_generic_anchors() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("select".to_string(), "select data".to_string());
    m.insert("delete".to_string(), "delete data".to_string());
    m
}

fn default_named_objects() -> Vec<String> {
    vec![
        "table".to_string(),
        "view".to_string(),
        "schema".to_string(),
        "database".to_string(),
        "warehouse".to_string(),
        "stage".to_string(),
        "file format".to_string(),
        "sequence".to_string(),
        "procedure".to_string(),
        "function".to_string(),
    ]
}

fn default_qa_anchors() -> Vec<String> {
    vec!["qa-empty".to_string(), "qa-diff".to_string()]
}

/// The five identity components a `Scope` can filter on.
pub const SCOPE_ATTRIBUTES: [&str; 5] = ["kw", "obj", "desc", "anchor", "nm"];
/// The two directions a `Scope` predicate can apply.
pub const SCOPE_TYPES: [&str; 2] = ["incl", "excl"];

impl Default for Configuration {
    fn default() -> Self {
        Self {
            open_tag: default_open_tag(),
            close_tag: default_close_tag(),
            record_prefix: default_record_prefix(),
            sep_desc: default_sep_desc(),
            wildcards: Wildcards::default(),
            types_as_list: vec!["tags".to_string(), "compare-patterns".to_string(), "ignore-patterns".to_string()],
            types_as_float: vec![
                "relative-tolerance".to_string(),
                "absolute-tolerance".to_string(),
            ],
            types_as_bool: vec!["incl-idx-in-desc".to_string()],
            reserved: default_reserved(),
            attr_order: default_attr_order(),
            keyword_exceptions: HashMap::new(),
            generic_anchors: default_generic_anchors(),
            named_objects: default_named_objects(),
            qa_anchors: default_qa_anchors(),
            default_object: default_object(),
            default_description: default_description(),
            qa: QaDefaults::default(),
            export_dir: default_export_dir(),
            statement_heading_level: default_statement_heading_level(),
            marker_heading_level: default_marker_heading_level(),
            disclaimer: None,
        }
    }
}

impl Configuration {
    /// Normalizes a first-keyword token through `keyword_exceptions`.
    pub fn normalize_keyword(&self, first_token: &str) -> String {
        self.keyword_exceptions
            .get(first_token)
            .cloned()
            .unwrap_or_else(|| first_token.to_string())
    }

    /// Returns the earliest-configured `named_objects` term found as a
    /// whole word in `first_line`, if any.
    pub fn object_within(&self, first_line: &str) -> Option<String> {
        self.named_objects
            .iter()
            .find(|term| contains_whole_word(first_line, term))
            .cloned()
    }

    /// Whether `anchor` identifies a QA statement variant.
    pub fn is_qa_anchor(&self, anchor: &str) -> bool {
        self.qa_anchors.iter().any(|a| a == anchor)
    }

    pub const fn scope_attributes() -> [&'static str; 5] {
        SCOPE_ATTRIBUTES
    }

    pub const fn scope_types() -> [&'static str; 2] {
        SCOPE_TYPES
    }
}

fn contains_whole_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.split(|c: char| !c.is_alphanumeric() && c != '_').any(|tok| tok == word)
        || (word.contains(' ') && haystack.contains(word))
}

/// Loads a [`Configuration`] from a TOML file at `path`.
pub fn load_config(path: &Path) -> Result<Configuration> {
    let content = std::fs::read_to_string(path)?;
    let cfg: Configuration = toml::from_str(&content)?;
    Ok(cfg)
}

/// Serializes `cfg` and writes it to `path` as TOML.
pub fn save_config(cfg: &Configuration, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(cfg)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Configuration::default();
        assert_eq!(cfg.open_tag, "/*-");
        assert_eq!(cfg.close_tag, "-*/");
        assert_eq!(cfg.sep_desc, "~");
        assert!(cfg.is_qa_anchor("qa-empty"));
        assert!(!cfg.is_qa_anchor("select data"));
    }

    #[test]
    fn object_within_prefers_configured_order() {
        let cfg = Configuration::default();
        assert_eq!(
            cfg.object_within("create table sample_records"),
            Some("table".to_string())
        );
        assert_eq!(cfg.object_within("select 1"), None);
    }

    #[test]
    fn whole_word_matching_does_not_match_substrings() {
        let cfg = Configuration::default();
        // "tables" should not match the "table" term as a whole word.
        assert_eq!(cfg.object_within("drop tablespace x"), None);
    }

    #[test]
    fn round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlmark.toml");
        let cfg = Configuration::default();
        save_config(&cfg, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(cfg, loaded);
    }
}
