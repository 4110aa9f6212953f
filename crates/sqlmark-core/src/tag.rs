//! Identity record for one statement: user-provided and inferred naming,
//! plus the five-component scope set.

use std::collections::HashMap;

use sqlmark_config::Configuration;

use crate::scope::{FilterArgs, Scope, ScopeComponent};

/// A statement's fully resolved identity: each of `kw`/`obj`/`desc`/
/// `anchor`/`nm` is either user-provided or inferred, independently.
#[derive(Debug, Clone)]
pub struct Tag {
    /// Raw user-provided name, `""` if the statement was untagged or the
    /// tag had no `name` key.
    pub nm_pr: String,
    /// 1-based position at parse time.
    pub index: usize,

    pub kw: String,
    pub obj: String,
    pub desc: String,
    pub anchor: String,
    pub nm: String,

    pub scopes: HashMap<ScopeComponent, Scope>,
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_anchor(kw: &str, obj: &str) -> String {
    collapse_ws(&format!("{kw} {obj}"))
}

struct Provided {
    kw: String,
    obj: String,
    desc: String,
    anchor: String,
}

fn decompose_provided(nm_pr: &str, config: &Configuration) -> Provided {
    if nm_pr.is_empty() || !nm_pr.contains(config.sep_desc.as_str()) {
        return Provided {
            kw: String::new(),
            obj: String::new(),
            desc: String::new(),
            anchor: String::new(),
        };
    }
    let (anchor_part, desc_part) = nm_pr.split_once(config.sep_desc.as_str()).unwrap();
    let anchor_part = anchor_part.trim();
    let mut words = anchor_part.split_whitespace();
    let kw = words.next().unwrap_or("").to_string();
    let obj = words.collect::<Vec<_>>().join(" ");
    Provided {
        anchor: collapse_ws(anchor_part),
        desc: collapse_ws(desc_part),
        kw,
        obj,
    }
}

struct Generated {
    kw: String,
    obj: String,
    desc: String,
    anchor: String,
    nm: String,
}

fn generate(first_sql_line: &str, index: usize, config: &Configuration) -> Generated {
    let normalized_line = collapse_ws(&first_sql_line.to_lowercase());
    let first_token = normalized_line.split_whitespace().next().unwrap_or("");
    let kw = config.normalize_keyword(first_token);
    let obj = config
        .object_within(&normalized_line)
        .unwrap_or_else(|| config.default_object.clone());
    let desc = format!("{} #{}", config.default_description, index);
    let anchor = if obj == config.default_object {
        if let Some(generic) = config.generic_anchors.get(&kw) {
            generic.clone()
        } else {
            join_anchor(&kw, &obj)
        }
    } else {
        join_anchor(&kw, &obj)
    };
    let nm = format!("{anchor}{}{desc}", config.sep_desc);
    Generated {
        kw,
        obj,
        desc,
        anchor,
        nm,
    }
}

impl Tag {
    /// Builds a `Tag` from an optional user-provided name, the statement's
    /// first SQL line, its 1-based index, and the active configuration.
    /// Each identity component is resolved independently: provided values
    /// win, generated ones fill the rest.
    pub fn infer(nm_pr: Option<&str>, first_sql_line: &str, index: usize, config: &Configuration) -> Self {
        let nm_pr = nm_pr.unwrap_or("").to_string();
        let provided = decompose_provided(&nm_pr, config);
        let generated = generate(first_sql_line, index, config);

        let kw = non_empty_or(&provided.kw, &generated.kw);
        let obj = non_empty_or(&provided.obj, &generated.obj);
        let desc = non_empty_or(&provided.desc, &generated.desc);
        let anchor = non_empty_or(&provided.anchor, &generated.anchor);
        let nm = if !nm_pr.is_empty() { nm_pr.clone() } else { generated.nm.clone() };

        let mut scopes = HashMap::new();
        for component in ScopeComponent::ALL {
            let base = match component {
                ScopeComponent::Kw => &kw,
                ScopeComponent::Obj => &obj,
                ScopeComponent::Desc => &desc,
                ScopeComponent::Anchor => &anchor,
                ScopeComponent::Nm => &nm,
            };
            scopes.insert(component, Scope::new(component, base.clone()));
        }

        Self {
            nm_pr,
            index,
            kw,
            obj,
            desc,
            anchor,
            nm,
            scopes,
        }
    }

    /// Applies a filter context's patterns to this tag's five scopes.
    pub fn apply_filter(&mut self, args: &FilterArgs) {
        for component in ScopeComponent::ALL {
            let scope = self.scopes.get_mut(&component).expect("all components present");
            args.apply(scope);
        }
    }

    /// `true` iff all five scopes currently include this tag.
    pub fn is_included(&self) -> bool {
        ScopeComponent::ALL
            .iter()
            .all(|c| self.scopes[c].is_included())
    }
}

fn non_empty_or(provided: &str, generated: &str) -> String {
    if provided.is_empty() {
        generated.to_string()
    } else {
        provided.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_select_infers_full_identity() {
        let cfg = Configuration::default();
        let tag = Tag::infer(None, "select 1", 1, &cfg);
        assert_eq!(tag.kw, "select");
        assert_eq!(tag.obj, "object");
        assert_eq!(tag.anchor, "select data");
        assert_eq!(tag.nm, "select data~statement #1");
    }

    #[test]
    fn create_table_infers_named_object() {
        let cfg = Configuration::default();
        let tag = Tag::infer(None, "create table t as select 1", 2, &cfg);
        assert_eq!(tag.kw, "create");
        assert_eq!(tag.obj, "table");
        assert_eq!(tag.anchor, "create table");
        assert!(tag.nm.starts_with("create table~"));
    }

    #[test]
    fn override_independence_anchor_only() {
        let cfg = Configuration::default();
        let tag = Tag::infer(Some("custom anchor~"), "select 1", 5, &cfg);
        assert_eq!(tag.anchor, "custom anchor");
        assert_eq!(tag.desc, format!("{} #5", cfg.default_description));
    }

    #[test]
    fn identity_components_are_never_empty() {
        let cfg = Configuration::default();
        let tag = Tag::infer(None, "drop schema x", 9, &cfg);
        assert!(!tag.kw.is_empty());
        assert!(!tag.obj.is_empty());
        assert!(!tag.desc.is_empty());
        assert!(!tag.anchor.is_empty());
        assert!(!tag.nm.is_empty());
    }

    #[test]
    fn no_filter_includes_everything() {
        let cfg = Configuration::default();
        let tag = Tag::infer(None, "select 1", 1, &cfg);
        assert!(tag.is_included());
    }
}
