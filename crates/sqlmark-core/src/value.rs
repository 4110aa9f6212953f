//! The typed value a tag attribute can hold, per the configured type table.

use std::fmt;

/// A parsed attribute value. Typing happens at parse time by consulting
/// `Configuration::types_as_{list,float,bool}`; anything not matched types
/// as `Str`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Parses a raw record value according to the configured type table.
///
/// `key` is the already-wildcard-stripped attribute key.
pub fn parse_value(key: &str, raw: &str, config: &sqlmark_config::Configuration) -> AttrValue {
    let trimmed = raw.trim();
    if config.types_as_list.iter().any(|k| k == key) {
        let inner = trimmed.trim_start_matches('[').trim_end_matches(']');
        let items = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner
                .split(',')
                .map(|item| strip_quotes(item.trim()).to_string())
                .collect()
        };
        return AttrValue::List(items);
    }
    if config.types_as_float.iter().any(|k| k == key) {
        if let Ok(f) = trimmed.parse::<f64>() {
            return AttrValue::Float(f);
        }
    }
    if config.types_as_bool.iter().any(|k| k == key) {
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => return AttrValue::Bool(true),
            "false" => return AttrValue::Bool(false),
            _ => {}
        }
    }
    AttrValue::Str(strip_quotes(trimmed).to_string())
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmark_config::Configuration;

    #[test]
    fn types_as_list_splits_and_strips() {
        let cfg = Configuration::default();
        let v = parse_value("tags", "[ \"a\", 'b', c ]", &cfg);
        assert_eq!(
            v,
            AttrValue::List(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn types_as_float_parses_real() {
        let cfg = Configuration::default();
        let v = parse_value("relative-tolerance", "0.001", &cfg);
        assert_eq!(v, AttrValue::Float(0.001));
    }

    #[test]
    fn types_as_bool_is_case_insensitive() {
        let cfg = Configuration::default();
        assert_eq!(parse_value("incl-idx-in-desc", "TRUE", &cfg), AttrValue::Bool(true));
        assert_eq!(parse_value("incl-idx-in-desc", "false", &cfg), AttrValue::Bool(false));
    }

    #[test]
    fn default_type_is_str_with_quotes_stripped() {
        let cfg = Configuration::default();
        let v = parse_value("description", "\"hello world\"", &cfg);
        assert_eq!(v, AttrValue::Str("hello world".to_string()));
    }
}
