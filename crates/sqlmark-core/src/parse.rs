//! Tag/attribute block parser: splits a tag body into typed,
//! ordered attributes plus wildcard flags and a derived name.

use std::collections::HashMap;

use sqlmark_config::{Configuration, WildcardFlags};

use crate::errors::TagError;
use crate::value::{parse_value, AttrValue};

/// The parsed contents of one tag block (a statement's tag or a marker).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTag {
    /// `name` key or derived leading bare record, if any.
    pub name: Option<String>,
    /// Attribute key -> typed value, in declaration order.
    pub attrs: Vec<(String, AttrValue)>,
    /// Attribute key -> decoded wildcard flags.
    pub flags: HashMap<String, WildcardFlags>,
}

impl ParsedTag {
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Splits a multi-line tag body into raw records, one per `__key: value`
/// occurrence. A record whose line doesn't start with `prefix` is folded
/// into the record above it, preserving embedded newlines within a value.
fn split_records(body: &str, prefix: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    for line in body.lines() {
        if line.trim_start().starts_with(prefix) {
            if !current.trim().is_empty() {
                records.push(current.trim().to_string());
            }
            current = line.trim_start()[prefix.len()..].to_string();
        } else if !line.trim().is_empty() || !current.is_empty() {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        records.push(current.trim().to_string());
    }
    records
}

/// Parses the text between an `open_tag`/`close_tag` pair.
///
/// `index` is the 1-based statement index (or marker ordinal), used only to
/// make [`TagError::MissingName`] actionable.
pub fn parse_tag_body(
    body: &str,
    config: &Configuration,
    index: usize,
) -> Result<ParsedTag, TagError> {
    let trimmed = body.trim();
    let is_multiline = trimmed
        .lines()
        .any(|line| line.trim_start().starts_with(&config.record_prefix));

    if !is_multiline {
        return Ok(ParsedTag {
            name: Some(trimmed.to_string()),
            attrs: Vec::new(),
            flags: HashMap::new(),
        });
    }

    let records = split_records(trimmed, &config.record_prefix);
    let mut parsed = ParsedTag::default();

    for (i, record) in records.iter().enumerate() {
        match record.split_once(':') {
            Some((key, value)) => {
                let (display_key, flags) = config.wildcards.partition(key.trim());
                if display_key == "name" {
                    // Taken verbatim, not re-typed: no quote-stripping or
                    // list/float/bool coercion, unlike every other attribute.
                    parsed.name = Some(value.trim().to_string());
                } else {
                    let typed = parse_value(&display_key, value, config);
                    parsed.flags.insert(display_key.clone(), flags);
                    parsed.attrs.push((display_key, typed));
                }
            }
            None => {
                // A bare record with no `:` only makes sense as the leading
                // marker/statement name.
                if i == 0 && parsed.name.is_none() {
                    parsed.name = Some(record.trim().to_string());
                } else {
                    return Err(TagError::MalformedRecord {
                        index,
                        record: record.clone(),
                    });
                }
            }
        }
    }

    if parsed.name.is_none() {
        return Err(TagError::MissingName { index });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_body_is_verbatim_name() {
        let cfg = Configuration::default();
        let parsed = parse_tag_body("sample statement", &cfg, 1).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("sample statement"));
        assert!(parsed.attrs.is_empty());
    }

    #[test]
    fn multiline_body_splits_on_record_prefix() {
        let cfg = Configuration::default();
        let body = "__name: my statement\n__description: does a thing\n__tags: [a, b]";
        let parsed = parse_tag_body(body, &cfg, 1).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("my statement"));
        assert_eq!(
            parsed.get("description"),
            Some(&AttrValue::Str("does a thing".to_string()))
        );
        assert_eq!(
            parsed.get("tags"),
            Some(&AttrValue::List(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn leading_bare_record_becomes_name() {
        let cfg = Configuration::default();
        let body = "__my-marker\n__group: setup";
        let parsed = parse_tag_body(body, &cfg, 1).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("my-marker"));
        assert_eq!(parsed.get("group"), Some(&AttrValue::Str("setup".to_string())));
    }

    #[test]
    fn missing_name_is_an_error() {
        let cfg = Configuration::default();
        let body = "__description: no name key\n__other: value";
        let err = parse_tag_body(body, &cfg, 3).unwrap_err();
        assert!(matches!(err, TagError::MissingName { index: 3 }));
    }

    #[test]
    fn name_key_is_kept_verbatim_not_retyped() {
        let cfg = Configuration::default();
        let body = "__name: \"quoted\"\n__description: plain";
        let parsed = parse_tag_body(body, &cfg, 1).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("\"quoted\""));
    }

    #[test]
    fn wildcard_flags_propagate_from_key() {
        let cfg = Configuration::default();
        let body = "__name: n\n__notes*p: a free paragraph";
        let parsed = parse_tag_body(body, &cfg, 1).unwrap();
        assert_eq!(
            parsed.get("notes"),
            Some(&AttrValue::Str("a free paragraph".to_string()))
        );
        assert!(parsed.flags.get("notes").unwrap().is_paragraph);
    }
}
