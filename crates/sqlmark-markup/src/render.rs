//! Markup: the paired `.sql`/`.md` document built from a script's current
//! (filtered or unfiltered) contents.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use sqlmark_config::Configuration;
use sqlmark_core::{AttrValue, Section};
use sqlmark_query::{Tabular, Value};
use sqlmark_script::{ContentItem, Script};

use crate::errors::{MarkupError, Result};

/// Paths the last [`Markup::export`] call wrote to.
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub sql: PathBuf,
    pub md: PathBuf,
}

/// A rendered document: the `.sql` re-import form and the `.md` narrative
/// form, both built from the same ordered contents.
#[derive(Debug, Clone, Default)]
pub struct Markup {
    pub sql_text: String,
    pub md_text: String,
}

fn format_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn render_table_md(t: &Tabular) -> String {
    if t.columns().is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push('|');
    for c in t.columns() {
        out.push(' ');
        out.push_str(c);
        out.push_str(" |");
    }
    out.push('\n');
    out.push('|');
    for _ in t.columns() {
        out.push_str(" --- |");
    }
    out.push('\n');
    for row in t.rows() {
        out.push('|');
        for cell in row {
            out.push(' ');
            out.push_str(&format_value(cell));
            out.push_str(" |");
        }
        out.push('\n');
    }
    out
}

fn render_section_md(section: &Section) -> String {
    let mut out = String::new();
    out.push_str(&"#".repeat(section.heading_level.max(1) as usize));
    out.push(' ');
    out.push_str(&section.heading_text);
    out.push_str("\n\n");

    for item in &section.items {
        match item.key.as_str() {
            "sql" => {
                out.push_str("```sql\n");
                out.push_str(item.value.trim_end());
                out.push_str("\n```\n\n");
            }
            "results" => {
                if !item.value.is_empty() {
                    out.push_str(&item.value);
                    out.push('\n');
                }
            }
            _ => match &item.label {
                Some(label) if !item.is_paragraph => {
                    out.push_str(&format!("- **{label}**: {}\n", item.value));
                }
                Some(label) => {
                    out.push_str(&format!("**{label}**\n\n{}\n\n", item.value));
                }
                None => {
                    out.push_str(&item.value);
                    out.push_str("\n\n");
                }
            },
        }
    }
    out
}

fn canonical_tag_body(nm: &str, attrs_raw: &str) -> String {
    if attrs_raw.trim().is_empty() {
        nm.to_string()
    } else {
        attrs_raw.to_string()
    }
}

impl Markup {
    /// Builds a document from `script`'s current contents. `ignore_scope`
    /// includes statements excluded by an active filter; `markers`
    /// interleaves free-standing tag blocks.
    pub fn build(script: &Script, markers: bool, ignore_scope: bool) -> Result<Self> {
        let config = &script.config;
        let items = script.contents(markers, ignore_scope, true)?;

        let marker_by_key: HashMap<u64, usize> = script
            .markers()
            .iter()
            .enumerate()
            .map(|(i, m)| (m.order_key(), i))
            .collect();

        let mut sql_text = String::new();
        if let Some(disclaimer) = &config.disclaimer {
            sql_text.push_str(&config.open_tag);
            sql_text.push('\n');
            sql_text.push_str(disclaimer);
            sql_text.push('\n');
            sql_text.push_str(&config.close_tag);
            sql_text.push_str("\n\n");
        }

        let mut md_text = String::new();

        for item in &items {
            match item {
                ContentItem::Statement(i) => {
                    let stmt = &script.statements()[*i];
                    let body = canonical_tag_body(&stmt.tag.nm, &stmt.attrs_raw);
                    sql_text.push_str(&config.open_tag);
                    sql_text.push_str(&body);
                    sql_text.push_str(&config.close_tag);
                    sql_text.push('\n');
                    sql_text.push_str(stmt.sql.trim_end());
                    sql_text.push_str(";\n\n");

                    let mut extra: Vec<(String, AttrValue)> = Vec::new();
                    for (key, reserved) in &config.reserved {
                        if !reserved.include_by_default {
                            continue;
                        }
                        match key.as_str() {
                            "sql" => extra.push(("sql".to_string(), AttrValue::Str(stmt.sql.clone()))),
                            "results" => {
                                if stmt.executed {
                                    if let Some(results) = &stmt.results {
                                        extra.push(("results".to_string(), AttrValue::Str(render_table_md(results))));
                                    }
                                }
                            }
                            _ => {}
                        }
                    }

                    let section = Section::build(
                        config.statement_heading_level,
                        stmt.tag.nm.clone(),
                        &stmt.attrs_parsed.attrs,
                        &stmt.attrs_parsed.flags,
                        config,
                        &extra,
                    );
                    md_text.push_str(&render_section_md(&section));
                }
                ContentItem::Marker(key) => {
                    let Some(&mi) = marker_by_key.get(key) else { continue };
                    let marker = &script.markers()[mi];
                    sql_text.push_str(&config.open_tag);
                    sql_text.push_str(&marker.raw);
                    sql_text.push_str(&config.close_tag);
                    sql_text.push_str("\n\n");

                    let section = Section::build(
                        config.marker_heading_level,
                        marker.name.clone(),
                        &marker.attrs,
                        &marker.flags,
                        config,
                        &[],
                    );
                    md_text.push_str(&render_section_md(&section));
                }
            }
        }

        Ok(Self { sql_text, md_text })
    }

    /// Writes the paired `.sql`/`.md` files to
    /// `<source_dir>/<export_dir>/<stem>/<stem>.{sql,md}`, creating
    /// directories as needed.
    pub fn export(&self, source_path: &Path, config: &Configuration) -> Result<ExportPaths> {
        let stem = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "script".to_string());
        let source_dir = source_path.parent().unwrap_or_else(|| Path::new("."));
        let out_dir = source_dir.join(&config.export_dir).join(&stem);
        fs::create_dir_all(&out_dir).map_err(MarkupError::Io)?;

        let sql_path = out_dir.join(format!("{stem}.sql"));
        let md_path = out_dir.join(format!("{stem}.md"));
        fs::write(&sql_path, &self.sql_text).map_err(MarkupError::Io)?;
        fs::write(&md_path, &self.md_text).map_err(MarkupError::Io)?;

        Ok(ExportPaths { sql: sql_path, md: md_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmark_script::RunOptions;
    use sqlmark_query::{QueryError, QueryExecutor};
    use tempfile::tempdir;

    struct StubExecutor;
    impl QueryExecutor for StubExecutor {
        fn query(&self, _sql: &str, _results: bool, _lower: bool) -> std::result::Result<Tabular, QueryError> {
            Ok(Tabular::new(vec!["x".to_string()], vec![vec![Value::Integer(1)]]))
        }
        fn ex(&self, _sql: &str) -> std::result::Result<(), QueryError> {
            Ok(())
        }
    }

    #[test]
    fn build_renders_statement_heading_and_sql_block() {
        let cfg = Configuration::default();
        let script = Script::parse("select 1;", cfg).unwrap();
        let markup = Markup::build(&script, true, true).unwrap();
        assert!(markup.md_text.contains("## select data"));
        assert!(markup.md_text.contains("```sql"));
        assert!(markup.sql_text.contains("select 1;"));
    }

    #[test]
    fn build_includes_results_after_execution() {
        let cfg = Configuration::default();
        let mut script = Script::parse("select 1;", cfg).unwrap();
        script.run_all(&StubExecutor, &RunOptions::all_continue()).unwrap();
        let markup = Markup::build(&script, true, true).unwrap();
        assert!(markup.md_text.contains("| x |"));
    }

    #[test]
    fn export_writes_paired_files_under_export_dir() {
        let cfg = Configuration::default();
        let script = Script::parse("select 1;", cfg.clone()).unwrap();
        let markup = Markup::build(&script, true, true).unwrap();

        let dir = tempdir().unwrap();
        let source_path = dir.path().join("demo.sql");
        let paths = markup.export(&source_path, &cfg).unwrap();

        assert!(paths.sql.exists());
        assert!(paths.md.exists());
        assert_eq!(paths.sql.file_name().unwrap(), "demo.sql");
    }

    #[test]
    fn round_trip_sql_reparses_to_the_same_statement_count() {
        let cfg = Configuration::default();
        let script = Script::parse("select 1;\nselect 2;", cfg.clone()).unwrap();
        let markup = Markup::build(&script, true, true).unwrap();

        let reparsed = Script::parse(markup.sql_text.clone(), cfg).unwrap();
        assert_eq!(reparsed.statements().len(), script.statements().len());
    }

    #[test]
    fn round_trip_preserves_parsed_attributes_and_sql_for_a_tagged_statement() {
        let cfg = Configuration::default();
        let source = "/*- rt_demo\n__description: a demo row\n__tags: [a, b] -*/\nselect 1;";
        let script = Script::parse(source, cfg.clone()).unwrap();
        let original = &script.statements()[0];

        let markup = Markup::build(&script, true, true).unwrap();
        let reparsed = Script::parse(markup.sql_text.clone(), cfg).unwrap();
        let round_tripped = &reparsed.statements()[0];

        assert_eq!(original.tag.nm, round_tripped.tag.nm);
        assert_eq!(original.attrs_parsed.attrs, round_tripped.attrs_parsed.attrs);
        assert_eq!(
            original.sql.trim_end_matches(';').trim(),
            round_tripped.sql.trim_end_matches(';').trim()
        );
    }
}
