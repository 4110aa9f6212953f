//! Wildcard-character parsing for attribute keys.

use serde::{Deserialize, Serialize};

/// Delimiters and flag letters controlling attribute-key wildcard syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Wildcards {
    /// The character that introduces a wildcard flag suffix (e.g. `*`).
    #[serde(default = "default_char_wc")]
    pub char_wc: char,
    /// The character separating multiple wildcard flags (e.g. `_`).
    #[serde(default = "default_char_sep")]
    pub char_sep: char,
    /// Flag letter that marks a value as a free paragraph (no bullet, no label).
    #[serde(default = "default_flag_paragraph")]
    pub flag_paragraph: char,
    /// Flag letter that disables reformatting of the key for display.
    #[serde(default = "default_flag_verbatim")]
    pub flag_verbatim: char,
    /// Flag letter that suppresses the key label entirely (implies paragraph).
    #[serde(default = "default_flag_omit_name")]
    pub flag_omit_name: char,
}

fn default_char_wc() -> char {
    '*'
}
fn default_char_sep() -> char {
    '_'
}
fn default_flag_paragraph() -> char {
    'p'
}
fn default_flag_verbatim() -> char {
    'v'
}
fn default_flag_omit_name() -> char {
    'h'
}

impl Default for Wildcards {
    fn default() -> Self {
        Self {
            char_wc: default_char_wc(),
            char_sep: default_char_sep(),
            flag_paragraph: default_flag_paragraph(),
            flag_verbatim: default_flag_verbatim(),
            flag_omit_name: default_flag_omit_name(),
        }
    }
}

/// The decoded wildcard flags present on an attribute key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WildcardFlags {
    pub is_paragraph: bool,
    pub is_verbatim: bool,
    pub is_omit_name: bool,
}

impl Wildcards {
    /// Finds the index of the first unescaped wildcard character in `attr_nm`.
    ///
    /// Returns `0` if no unescaped wildcard character is present — a key can
    /// never validly start with the wildcard character itself, so `0` is
    /// unambiguous as a "none found" sentinel.
    fn find_first_wc_idx(&self, attr_nm: &str) -> usize {
        let chars: Vec<char> = attr_nm.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            if c == self.char_wc && (i == 0 || chars[i - 1] != '\\') {
                return i;
            }
        }
        0
    }

    /// Splits an attribute key into its display name and wildcard flags.
    ///
    /// Returns `(display_name, flags)`. Escaped wildcard characters
    /// (`\<char_wc>`) in the display name are unescaped back to a literal
    /// `<char_wc>`.
    pub fn partition(&self, attr_nm: &str) -> (String, WildcardFlags) {
        let idx = self.find_first_wc_idx(attr_nm);
        let chars: Vec<char> = attr_nm.chars().collect();

        if idx == 0 {
            let stripped = self.unescape(attr_nm);
            return (stripped, WildcardFlags::default());
        }

        let name_part: String = chars[..idx].iter().collect();
        let flag_part: String = chars[idx..].iter().collect();

        let mut flags = WildcardFlags::default();
        for token in flag_part.split(self.char_sep) {
            let letter = token.trim_start_matches(self.char_wc);
            if letter.len() != 1 {
                continue;
            }
            let c = letter.chars().next().unwrap();
            if c == self.flag_paragraph {
                flags.is_paragraph = true;
            } else if c == self.flag_verbatim {
                flags.is_verbatim = true;
            } else if c == self.flag_omit_name {
                flags.is_omit_name = true;
            }
        }
        if flags.is_omit_name {
            flags.is_paragraph = true;
        }

        (self.unescape(&name_part), flags)
    }

    fn unescape(&self, s: &str) -> String {
        s.replace(&format!("\\{}", self.char_wc), &self.char_wc.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_wildcard_is_passthrough() {
        let wc = Wildcards::default();
        let (nm, flags) = wc.partition("description");
        assert_eq!(nm, "description");
        assert_eq!(flags, WildcardFlags::default());
    }

    #[test]
    fn paragraph_flag() {
        let wc = Wildcards::default();
        let (nm, flags) = wc.partition("notes*p");
        assert_eq!(nm, "notes");
        assert!(flags.is_paragraph);
        assert!(!flags.is_verbatim);
    }

    #[test]
    fn combined_flags_split_on_delim() {
        let wc = Wildcards::default();
        let (nm, flags) = wc.partition("notes*p_*v");
        assert_eq!(nm, "notes");
        assert!(flags.is_paragraph);
        assert!(flags.is_verbatim);
    }

    #[test]
    fn omit_name_implies_paragraph() {
        let wc = Wildcards::default();
        let (_, flags) = wc.partition("notes*h");
        assert!(flags.is_omit_name);
        assert!(flags.is_paragraph);
    }

    #[test]
    fn escaped_wildcard_is_literal() {
        let wc = Wildcards::default();
        let (nm, flags) = wc.partition("notes\\*p");
        assert_eq!(nm, "notes*p");
        assert_eq!(flags, WildcardFlags::default());
    }
}
