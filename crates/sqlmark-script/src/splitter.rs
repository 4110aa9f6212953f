//! Minimal, dependency-free statement splitter and tag-block span finder.
//! Deliberately shallow: quote/comment state tracking and semicolon
//! splitting only, no dialect grammar.

use sqlmark_config::Configuration;
use sqlmark_core::InternalError;

/// A tag block's body text and its character-offset span, delimiters
/// included.
#[derive(Debug, Clone)]
pub struct TagSpan {
    pub start: usize,
    pub end: usize,
    pub body: String,
}

/// One SQL statement's text (delimiters/tags excluded) and its
/// character-offset span in the source, trailing `;` excluded.
#[derive(Debug, Clone)]
pub struct StatementSpan {
    pub sql: String,
    pub start: usize,
    pub end: usize,
}

/// Finds every `(open_tag, close_tag)` pair in `source`, left to right,
/// non-overlapping. Mismatched open/close counts is an internal error.
pub fn find_tag_spans(source: &str, config: &Configuration) -> Result<Vec<TagSpan>, InternalError> {
    let chars: Vec<char> = source.chars().collect();
    let open: Vec<char> = config.open_tag.chars().collect();
    let close: Vec<char> = config.close_tag.chars().collect();

    let open_count = count_occurrences(&chars, &open);
    let close_count = count_occurrences(&chars, &close);
    if open_count != close_count {
        return Err(InternalError::UnbalancedDelimiters {
            open: open_count,
            close: close_count,
        });
    }

    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if matches_at(&chars, i, &open) {
            let body_start = i + open.len();
            if let Some(close_start) = find_from(&chars, body_start, &close) {
                let body: String = chars[body_start..close_start].iter().collect();
                let end = close_start + close.len();
                spans.push(TagSpan { start: i, end, body });
                i = end;
                continue;
            }
        }
        i += 1;
    }
    Ok(spans)
}

fn matches_at(chars: &[char], pos: usize, needle: &[char]) -> bool {
    if pos + needle.len() > chars.len() {
        return false;
    }
    chars[pos..pos + needle.len()] == *needle
}

fn find_from(chars: &[char], from: usize, needle: &[char]) -> Option<usize> {
    if needle.is_empty() || from >= chars.len() {
        return None;
    }
    (from..=chars.len().saturating_sub(needle.len())).find(|&i| matches_at(chars, i, needle))
}

fn count_occurrences(chars: &[char], needle: &[char]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while let Some(pos) = find_from(chars, i, needle) {
        count += 1;
        i = pos + needle.len();
    }
    count
}

/// Splits `source` into statements, skipping over any `tag_spans` entirely
/// (their text never contributes to a statement's SQL and never affects
/// quote/comment/semicolon tracking).
pub fn split_statements(source: &str, tag_spans: &[TagSpan]) -> Vec<StatementSpan> {
    let chars: Vec<char> = source.chars().collect();
    let mut statements = Vec::new();

    let mut in_single = false;
    let mut in_double = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    let mut buf = String::new();
    let mut stmt_start: Option<usize> = None;

    let mut i = 0;
    while i < chars.len() {
        if let Some(span) = tag_spans.iter().find(|s| s.start == i) {
            i = span.end;
            continue;
        }
        let c = chars[i];

        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
            i += 1;
            continue;
        }
        if in_block_comment {
            if c == '*' && chars.get(i + 1) == Some(&'/') {
                in_block_comment = false;
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }
        if in_single {
            if c == '\'' {
                in_single = false;
            }
            buf.push(c);
            i += 1;
            continue;
        }
        if in_double {
            if c == '"' {
                in_double = false;
            }
            buf.push(c);
            i += 1;
            continue;
        }
        if c == '\'' {
            in_single = true;
            mark_start(&mut stmt_start, i, &buf);
            buf.push(c);
            i += 1;
            continue;
        }
        if c == '"' {
            in_double = true;
            mark_start(&mut stmt_start, i, &buf);
            buf.push(c);
            i += 1;
            continue;
        }
        if c == '-' && chars.get(i + 1) == Some(&'-') {
            in_line_comment = true;
            i += 2;
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            in_block_comment = true;
            i += 2;
            continue;
        }
        if c == ';' {
            let sql = buf.trim().to_string();
            if !sql.is_empty() {
                statements.push(StatementSpan {
                    sql,
                    start: stmt_start.unwrap_or(i),
                    end: i,
                });
            }
            buf.clear();
            stmt_start = None;
            i += 1;
            continue;
        }
        if !c.is_whitespace() {
            mark_start(&mut stmt_start, i, &buf);
        }
        buf.push(c);
        i += 1;
    }

    let trailing = buf.trim();
    if !trailing.is_empty() {
        statements.push(StatementSpan {
            sql: trailing.to_string(),
            start: stmt_start.unwrap_or(0),
            end: chars.len(),
        });
    }

    statements
}

fn mark_start(stmt_start: &mut Option<usize>, i: usize, buf: &str) {
    if stmt_start.is_none() && buf.trim().is_empty() {
        *stmt_start = Some(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_two_simple_statements() {
        let stmts = split_statements("select 1;\ncreate table t as select 1;", &[]);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].sql, "select 1");
        assert_eq!(stmts[1].sql, "create table t as select 1");
    }

    #[test]
    fn semicolon_inside_string_literal_does_not_split() {
        let stmts = split_statements("select ';' as x;", &[]);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].sql, "select ';' as x");
    }

    #[test]
    fn semicolon_inside_line_comment_does_not_split() {
        let stmts = split_statements("select 1; -- a;b\n", &[]);
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn semicolon_inside_block_comment_does_not_split() {
        let stmts = split_statements("select 1 /* a; b */;", &[]);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].sql, "select 1 /* a; b */");
    }

    #[test]
    fn trailing_statement_without_semicolon_is_kept() {
        let stmts = split_statements("select 1;\nselect 2", &[]);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1].sql, "select 2");
    }

    #[test]
    fn balanced_tag_spans_are_found() {
        let cfg = Configuration::default();
        let source = "/*-\n__name: a\n-*/\nselect 1;";
        let spans = find_tag_spans(source, &cfg).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].body.trim(), "__name: a");
    }

    #[test]
    fn unbalanced_tag_delimiters_error() {
        let cfg = Configuration::default();
        let source = "/*-\n__name: a\nselect 1;";
        assert!(find_tag_spans(source, &cfg).is_err());
    }
}
