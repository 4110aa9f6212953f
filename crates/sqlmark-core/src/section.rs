//! Section: a renderable block built from a tag's ordered attribute items,
//! with wildcard-flag formatting rules applied.

use std::collections::HashMap;

use sqlmark_config::{Configuration, WildcardFlags};

use crate::value::AttrValue;

/// One rendered attribute: a label (unless omitted) and its formatted
/// value, tagged as a paragraph or a labeled bullet.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionItem {
    pub key: String,
    pub label: Option<String>,
    pub value: String,
    pub is_paragraph: bool,
}

/// A renderable unit: one statement or one marker, as an ordered sequence
/// of [`SectionItem`]s under a heading.
#[derive(Debug, Clone)]
pub struct Section {
    pub heading_level: u8,
    pub heading_text: String,
    pub items: Vec<SectionItem>,
}

fn humanize(key: &str) -> String {
    key.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl Section {
    /// Builds a section from `attrs` (in attribute-declaration order),
    /// reordered per `config.attr_order` with any attributes absent from
    /// that list appended afterward in their original order. `extra`
    /// supplies reserved attributes (e.g. `Results`, `SQL`) the caller has
    /// already decided to inject, keyed the same way as `attrs`.
    pub fn build(
        heading_level: u8,
        heading_text: impl Into<String>,
        attrs: &[(String, AttrValue)],
        flags: &HashMap<String, WildcardFlags>,
        config: &Configuration,
        extra: &[(String, AttrValue)],
    ) -> Self {
        let mut all: Vec<&(String, AttrValue)> = attrs.iter().chain(extra.iter()).collect();
        let order_pos = |key: &str| -> usize {
            config
                .attr_order
                .iter()
                .position(|k| k == key)
                .unwrap_or(config.attr_order.len())
        };
        all.sort_by_key(|(k, _)| order_pos(k));

        let items = all
            .into_iter()
            .map(|(key, value)| {
                let f = flags.get(key).copied().unwrap_or_default();
                let label = if f.is_omit_name {
                    None
                } else if f.is_verbatim {
                    Some(key.clone())
                } else {
                    Some(humanize(key))
                };
                SectionItem {
                    key: key.clone(),
                    label,
                    value: value.to_string(),
                    is_paragraph: f.is_paragraph || f.is_omit_name,
                }
            })
            .collect();

        Self {
            heading_level,
            heading_text: heading_text.into(),
            items,
        }
    }
}
