//! Scope: a single inclusion/exclusion predicate over one identity
//! component of a statement.

use std::fmt;

use regex::Regex;

/// The five identity components a [`Scope`] can predicate on, in the fixed
/// order `Configuration::scope_attributes` declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeComponent {
    Kw,
    Obj,
    Desc,
    Anchor,
    Nm,
}

impl ScopeComponent {
    pub const ALL: [ScopeComponent; 5] = [
        ScopeComponent::Kw,
        ScopeComponent::Obj,
        ScopeComponent::Desc,
        ScopeComponent::Anchor,
        ScopeComponent::Nm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kw => "kw",
            Self::Obj => "obj",
            Self::Desc => "desc",
            Self::Anchor => "anchor",
            Self::Nm => "nm",
        }
    }
}

impl fmt::Display for ScopeComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single component's inclusion/exclusion predicate, re-evaluated on
/// every call to [`Scope::is_included`] — scopes never cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub component: ScopeComponent,
    /// The identity component's current value on the owning statement.
    pub base: String,
    pub incl_patterns: Vec<String>,
    pub excl_patterns: Vec<String>,
}

impl Scope {
    pub fn new(component: ScopeComponent, base: impl Into<String>) -> Self {
        Self {
            component,
            base: base.into(),
            incl_patterns: Vec::new(),
            excl_patterns: Vec::new(),
        }
    }

    /// Whether `base` matches `pattern`, either as a literal substring or,
    /// when `pattern` compiles, as a regex. An invalid regex is treated as
    /// literal-only — never a panic.
    fn pattern_matches(base: &str, pattern: &str) -> bool {
        if base.contains(pattern) {
            return true;
        }
        match Regex::new(pattern) {
            Ok(re) => re.is_match(base),
            Err(_) => {
                tracing::trace!(pattern, "scope pattern is not a valid regex; literal-only match");
                false
            }
        }
    }

    /// Evaluates the predicate against `base`'s current value. Inclusion
    /// defaults to a singleton of `base` itself (so "no filter" includes
    /// everything); exclusion defaults to empty.
    pub fn is_included(&self) -> bool {
        let included = if self.incl_patterns.is_empty() {
            true
        } else {
            self.incl_patterns
                .iter()
                .any(|p| Self::pattern_matches(&self.base, p))
        };
        if !included {
            return false;
        }
        !self
            .excl_patterns
            .iter()
            .any(|p| Self::pattern_matches(&self.base, p))
    }
}

/// One filter context's merged inclusion/exclusion lists, one pair per
/// identity component, plus the branching hints for nested contexts.
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub incl_kw: Option<Vec<String>>,
    pub excl_kw: Option<Vec<String>>,
    pub incl_obj: Option<Vec<String>>,
    pub excl_obj: Option<Vec<String>>,
    pub incl_desc: Option<Vec<String>>,
    pub excl_desc: Option<Vec<String>>,
    pub incl_anchor: Option<Vec<String>>,
    pub excl_anchor: Option<Vec<String>>,
    pub incl_nm: Option<Vec<String>>,
    pub excl_nm: Option<Vec<String>>,
    /// Name this context's scope so a later context can branch from it.
    pub as_id: Option<String>,
    /// Start from a previously named scope instead of the parent's.
    pub from_id: Option<String>,
}

impl FilterArgs {
    fn incl_for(&self, component: ScopeComponent) -> &Option<Vec<String>> {
        match component {
            ScopeComponent::Kw => &self.incl_kw,
            ScopeComponent::Obj => &self.incl_obj,
            ScopeComponent::Desc => &self.incl_desc,
            ScopeComponent::Anchor => &self.incl_anchor,
            ScopeComponent::Nm => &self.incl_nm,
        }
    }

    fn excl_for(&self, component: ScopeComponent) -> &Option<Vec<String>> {
        match component {
            ScopeComponent::Kw => &self.excl_kw,
            ScopeComponent::Obj => &self.excl_obj,
            ScopeComponent::Desc => &self.excl_desc,
            ScopeComponent::Anchor => &self.excl_anchor,
            ScopeComponent::Nm => &self.excl_nm,
        }
    }

    /// Applies this context's patterns for `component` onto `scope`,
    /// leaving `scope.base` untouched.
    pub fn apply(&self, scope: &mut Scope) {
        scope.incl_patterns = self.incl_for(scope.component).clone().unwrap_or_default();
        scope.excl_patterns = self.excl_for(scope.component).clone().unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_patterns_means_included() {
        let s = Scope::new(ScopeComponent::Kw, "select");
        assert!(s.is_included());
    }

    #[test]
    fn inclusion_by_literal_substring() {
        let mut s = Scope::new(ScopeComponent::Kw, "select");
        s.incl_patterns.push("sel".to_string());
        assert!(s.is_included());
    }

    #[test]
    fn inclusion_by_regex() {
        let mut s = Scope::new(ScopeComponent::Anchor, "create table");
        s.incl_patterns.push("^create.*".to_string());
        assert!(s.is_included());
    }

    #[test]
    fn exclusion_overrides_inclusion() {
        let mut s = Scope::new(ScopeComponent::Kw, "select");
        s.incl_patterns.push("select".to_string());
        s.excl_patterns.push("select".to_string());
        assert!(!s.is_included());
    }

    #[test]
    fn invalid_regex_falls_back_to_literal_no_panic() {
        let mut s = Scope::new(ScopeComponent::Kw, "select");
        s.incl_patterns.push("(unclosed".to_string());
        assert!(!s.is_included());
    }
}
