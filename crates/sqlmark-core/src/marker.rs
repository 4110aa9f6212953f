//! A tag block that does not attach to any statement.

use std::collections::HashMap;

use sqlmark_config::WildcardFlags;

use crate::parse::ParsedTag;
use crate::value::AttrValue;

/// A free-standing tag block, ordered relative to the statements around it.
#[derive(Debug, Clone)]
pub struct Marker {
    pub name: String,
    pub group: Option<String>,
    pub attrs: Vec<(String, AttrValue)>,
    pub flags: HashMap<String, WildcardFlags>,
    pub raw: String,
    /// `slot * 10 + ordinal`, `ordinal` in `1..=9`. Integer ordering key
    /// standing in for a `n + ordinal/10` float index — see `DESIGN.md`.
    order_key: u64,
}

impl Marker {
    /// `slot` is the number of statements preceding this marker (`0` if
    /// it appears before the first statement), or `depth + 1` for markers
    /// after the last statement. `ordinal` is this marker's 1-based
    /// position among markers sharing that slot.
    pub fn new(parsed: ParsedTag, raw: String, slot: usize, ordinal: usize) -> Self {
        let statement_index = slot;
        debug_assert!((1..=9).contains(&ordinal), "at most 9 markers per slot");
        Self {
            name: parsed.name.unwrap_or_default(),
            group: parsed.get("group").and_then(AttrValue::as_str).map(str::to_string),
            attrs: parsed.attrs,
            flags: parsed.flags,
            raw,
            order_key: (statement_index as u64) * 10 + ordinal as u64,
        }
    }

    /// The float ordering index: `statement_index + ordinal/10`.
    pub fn index(&self) -> f64 {
        let n = self.order_key / 10;
        let i = self.order_key % 10;
        n as f64 + (i as f64) / 10.0
    }

    /// Monotonic ordering key usable directly in a `BTreeMap`, avoiding
    /// `f64: Ord` pitfalls.
    pub fn order_key(&self) -> u64 {
        self.order_key
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str) -> ParsedTag {
        ParsedTag {
            name: Some(name.to_string()),
            attrs: Vec::new(),
            flags: HashMap::new(),
        }
    }

    #[test]
    fn index_reflects_statement_and_ordinal() {
        let m = Marker::new(parsed("setup"), "raw".to_string(), 2, 1);
        assert_eq!(m.index(), 2.1);
        let m2 = Marker::new(parsed("setup2"), "raw".to_string(), 2, 2);
        assert_eq!(m2.index(), 2.2);
        assert!(m2.order_key() > m.order_key());
    }

    #[test]
    fn trailing_marker_uses_depth_plus_one() {
        let m = Marker::new(parsed("epilogue"), "raw".to_string(), 3, 1);
        assert_eq!(m.index(), 3.1);
    }
}
