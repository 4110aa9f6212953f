//! Statement: the unit of execution, and its QA variants.

use chrono::{DateTime, Utc};

use sqlmark_config::Configuration;
use sqlmark_core::{parse_tag_body, AttrValue, ExceptionHandler, ExceptionRecord, ParsedTag, Section, Tag};
use sqlmark_query::{QueryExecutor, Tabular};

use crate::errors::{QaKind, ScriptError};

/// Outcome codes.
pub const OUTCOME_UNEXECUTED: i32 = 0;
pub const OUTCOME_EXECUTION_ERROR: i32 = 1;
pub const OUTCOME_EXECUTION_COMPLETE: i32 = 2;
pub const OUTCOME_POST_PROCESS_FAIL: i32 = -2;
pub const OUTCOME_POST_PROCESS_SUCCESS: i32 = -3;

/// Tolerances and column selectors for a `qa-diff` statement, resolved
/// from the statement's own tag attributes, falling back to
/// `Configuration::qa`.
#[derive(Debug, Clone)]
pub struct QaDiffConfig {
    pub partition_on: String,
    pub end_index_at: String,
    pub compare_patterns: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub relative_tolerance: Option<f64>,
    pub absolute_tolerance: Option<f64>,
}

impl QaDiffConfig {
    fn resolve(attrs: &[(String, AttrValue)], config: &Configuration) -> Self {
        let get_str = |key: &str| -> Option<String> {
            attrs.iter().find(|(k, _)| k == key).and_then(|(_, v)| v.as_str()).map(str::to_string)
        };
        let get_list = |key: &str| -> Option<Vec<String>> {
            attrs.iter().find(|(k, _)| k == key).and_then(|(_, v)| v.as_list()).map(<[String]>::to_vec)
        };
        let get_float = |key: &str| -> Option<f64> {
            attrs.iter().find(|(k, _)| k == key).and_then(|(_, v)| v.as_float())
        };
        Self {
            partition_on: get_str("partition-on").unwrap_or_else(|| config.qa.partition_on.clone()),
            end_index_at: get_str("end-index-at").unwrap_or_else(|| config.qa.end_index_at.clone()),
            compare_patterns: get_list("compare-patterns").unwrap_or_else(|| config.qa.compare_patterns.clone()),
            ignore_patterns: get_list("ignore-patterns").unwrap_or_else(|| config.qa.ignore_patterns.clone()),
            relative_tolerance: get_float("relative-tolerance").or(config.qa.tolerance.relative),
            absolute_tolerance: get_float("absolute-tolerance").or(config.qa.tolerance.absolute),
        }
    }
}

/// The kind-tagged union a statement's post-processing dispatches on: a
/// plain statement, or one of the two QA validation variants.
#[derive(Debug, Clone)]
pub enum StatementKind {
    Generic,
    QaEmpty,
    QaDiff(QaDiffConfig),
}

/// Per-run behavior toggles.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub results: bool,
    pub lower: bool,
    pub render: bool,
    /// Invoked with the statement's rendered [`Section`] when `render` is
    /// set. A plain function pointer rather than a boxed closure, since
    /// this crate sits below the rendering crate in the dependency graph
    /// and can't name its renderer type directly — callers that own both
    /// a `Script` and a renderer (e.g. `TerminalRenderer::render_section`)
    /// pass its associated function as a coercible `fn(&Section)`.
    pub render_sink: Option<fn(&Section)>,
    /// `Some("c")` continues past the first qualifying error; anything
    /// else (including `None`) raises.
    pub on_error: Option<String>,
    pub on_exception: Option<String>,
    pub on_failure: Option<String>,
}

impl RunOptions {
    pub fn all_continue() -> Self {
        Self {
            results: true,
            lower: false,
            render: false,
            render_sink: None,
            on_error: Some("c".to_string()),
            on_exception: Some("c".to_string()),
            on_failure: Some("c".to_string()),
        }
    }

    fn continues(flag: &Option<String>) -> bool {
        flag.as_deref() == Some("c")
    }
}

/// The unit of execution: owns raw SQL, parsed tag, results, lifecycle
/// timestamps, and an outcome code.
pub struct Statement {
    pub sql: String,
    pub attrs_raw: String,
    pub attrs_parsed: ParsedTag,
    pub tag: Tag,
    pub index: usize,
    pub orig_index: usize,
    pub config: Configuration,
    pub results: Option<Tabular>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub execution_time: Option<chrono::Duration>,
    pub outcome: i32,
    pub executed: bool,
    pub e: ExceptionHandler,
    pub kind: StatementKind,
}

fn first_line(sql: &str) -> &str {
    sql.lines().next().unwrap_or(sql)
}

impl Statement {
    /// Parses one statement's raw SQL and optional tag body.
    pub fn new(
        sql: impl Into<String>,
        attrs_raw: Option<String>,
        index: usize,
        config: &Configuration,
    ) -> Result<Self, ScriptError> {
        let sql = sql.into();
        let attrs_raw = attrs_raw.unwrap_or_default();
        let attrs_parsed = if attrs_raw.trim().is_empty() {
            ParsedTag::default()
        } else {
            parse_tag_body(&attrs_raw, config, index).map_err(|source| ScriptError::InvalidTags { index, source })?
        };

        let tag = Tag::infer(attrs_parsed.name.as_deref(), first_line(&sql), index, config);

        let kind = if config.is_qa_anchor(&tag.anchor) {
            match tag.anchor.as_str() {
                "qa-empty" => StatementKind::QaEmpty,
                "qa-diff" => StatementKind::QaDiff(QaDiffConfig::resolve(&attrs_parsed.attrs, config)),
                _ => StatementKind::Generic,
            }
        } else {
            StatementKind::Generic
        };

        Ok(Self {
            sql,
            attrs_raw,
            attrs_parsed,
            tag,
            index,
            orig_index: index,
            config: config.clone(),
            results: None,
            start_time: None,
            end_time: None,
            execution_time: None,
            outcome: OUTCOME_UNEXECUTED,
            executed: false,
            e: ExceptionHandler::new(),
            kind,
        })
    }

    /// Human-readable execution time: seconds if under a minute, else
    /// integer minutes.
    pub fn execution_time_txt(&self) -> Option<String> {
        let d = self.execution_time?;
        let secs = d.num_seconds();
        if secs < 60 {
            Some(format!("{secs}s"))
        } else {
            Some(format!("{}m", secs / 60))
        }
    }

    /// Runs this statement against `executor` if it is currently included
    /// in scope; a no-op otherwise.
    pub fn run(&mut self, executor: &dyn QueryExecutor, ctx_id: i64, opts: &RunOptions) -> Result<(), ScriptError> {
        if !self.tag.is_included() {
            return Ok(());
        }
        if self.e.ctx_id() != Some(ctx_id) {
            self.e.reset();
            let _ = self.e.set(Some(ctx_id), true, None);
        }

        self.start_time = Some(Utc::now());
        let query_result = executor.query(&self.sql, opts.results, opts.lower);
        self.executed = true;

        match query_result {
            Ok(tabular) => {
                self.results = Some(tabular);
                self.outcome = OUTCOME_EXECUTION_COMPLETE;
            }
            Err(source) => {
                let to_raise = !RunOptions::continues(&opts.on_error);
                self.e.collect(ExceptionRecord::new("execution", source.to_string(), self.tag.nm.clone(), to_raise));
                self.outcome = OUTCOME_EXECUTION_ERROR;
                self.end_time = Some(Utc::now());
                self.stamp_execution_time();
                if to_raise {
                    return Err(ScriptError::Execution { nm: self.tag.nm.clone(), index: self.index, source });
                }
                return Ok(());
            }
        }

        self.end_time = Some(Utc::now());
        self.stamp_execution_time();

        self.process(opts)?;

        if opts.render {
            match opts.render_sink {
                Some(sink) => {
                    let section = self.build_section();
                    sink(&section);
                }
                None => {
                    tracing::trace!(nm = %self.tag.nm, "render requested but no render_sink configured");
                }
            }
        }

        Ok(())
    }

    /// Builds this statement's renderable [`Section`], injecting the `sql`
    /// and `results` reserved attributes the same way `Markup::build` does.
    fn build_section(&self) -> Section {
        let mut extra: Vec<(String, AttrValue)> = Vec::new();
        for (key, reserved) in &self.config.reserved {
            if !reserved.include_by_default {
                continue;
            }
            match key.as_str() {
                "sql" => extra.push(("sql".to_string(), AttrValue::Str(self.sql.clone()))),
                "results" => {
                    if self.executed {
                        if let Some(results) = &self.results {
                            extra.push(("results".to_string(), AttrValue::Str(format!("{} row(s)", results.row_count()))));
                        }
                    }
                }
                _ => {}
            }
        }

        Section::build(
            self.config.statement_heading_level,
            self.tag.nm.clone(),
            &self.attrs_parsed.attrs,
            &self.attrs_parsed.flags,
            &self.config,
            &extra,
        )
    }

    fn stamp_execution_time(&mut self) {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            self.execution_time = Some(end - start);
        }
    }

    fn process(&mut self, opts: &RunOptions) -> Result<(), ScriptError> {
        match &self.kind {
            StatementKind::Generic => Ok(()),
            StatementKind::QaEmpty => {
                let row_count = self.results.as_ref().map(Tabular::row_count).unwrap_or(0);
                let passed = row_count == 0;
                if passed {
                    self.outcome = OUTCOME_POST_PROCESS_SUCCESS;
                    Ok(())
                } else {
                    self.outcome = OUTCOME_POST_PROCESS_FAIL;
                    let to_raise = !RunOptions::continues(&opts.on_failure);
                    let msg = format!("expected 0 rows, got {row_count}");
                    self.e.collect(ExceptionRecord::new("qa_empty", msg.clone(), self.tag.nm.clone(), to_raise));
                    if to_raise {
                        Err(ScriptError::QaFailure { kind: QaKind::Empty, nm: self.tag.nm.clone(), index: self.index, msg })
                    } else {
                        Ok(())
                    }
                }
            }
            StatementKind::QaDiff(cfg) => {
                let results = self.results.clone().unwrap_or_default();
                match run_qa_diff(&results, cfg) {
                    Ok(true) => {
                        self.outcome = OUTCOME_POST_PROCESS_SUCCESS;
                        Ok(())
                    }
                    Ok(false) => {
                        self.outcome = OUTCOME_POST_PROCESS_FAIL;
                        let to_raise = !RunOptions::continues(&opts.on_failure);
                        let msg = "partitions differ beyond configured tolerance".to_string();
                        self.e.collect(ExceptionRecord::new("qa_diff", msg.clone(), self.tag.nm.clone(), to_raise));
                        if to_raise {
                            Err(ScriptError::QaFailure { kind: QaKind::Diff, nm: self.tag.nm.clone(), index: self.index, msg })
                        } else {
                            Ok(())
                        }
                    }
                    Err(msg) => {
                        self.outcome = OUTCOME_POST_PROCESS_FAIL;
                        let to_raise = !RunOptions::continues(&opts.on_exception);
                        self.e.collect(ExceptionRecord::new("post_processing", msg.clone(), self.tag.nm.clone(), to_raise));
                        if to_raise {
                            Err(ScriptError::PostProcessing { nm: self.tag.nm.clone(), index: self.index, msg })
                        } else {
                            Ok(())
                        }
                    }
                }
            }
        }
    }
}

/// QA.Diff's validation algorithm. `Err` is a post-processing
/// error (setup invalid); `Ok(bool)` is the validation outcome.
fn run_qa_diff(results: &Tabular, cfg: &QaDiffConfig) -> Result<bool, String> {
    let columns = results.columns();
    let end_pos = columns
        .iter()
        .position(|c| c == &cfg.end_index_at)
        .ok_or_else(|| format!("end_index_at column '{}' not found", cfg.end_index_at))?;
    let idx_cols: Vec<String> = columns[..=end_pos]
        .iter()
        .filter(|c| **c != cfg.partition_on)
        .cloned()
        .collect();
    if idx_cols.is_empty() {
        return Err("idx_cols is empty".to_string());
    }

    let ignore_res: Vec<regex::Regex> = cfg
        .ignore_patterns
        .iter()
        .filter_map(|p| regex::Regex::new(p).ok())
        .collect();
    let drop_cols: Vec<String> = columns
        .iter()
        .filter(|c| ignore_res.iter().any(|re| re.is_match(c)))
        .cloned()
        .collect();

    let compare_res: Vec<regex::Regex> = cfg
        .compare_patterns
        .iter()
        .filter_map(|p| regex::Regex::new(p).ok())
        .collect();
    let compare_cols: Vec<String> = columns
        .iter()
        .filter(|c| {
            **c != cfg.partition_on
                && !idx_cols.contains(c)
                && !drop_cols.contains(c)
                && compare_res.iter().any(|re| re.is_match(c))
        })
        .cloned()
        .collect();
    if compare_cols.is_empty() {
        return Err("compare_cols is empty".to_string());
    }

    if !columns.iter().any(|c| c == &cfg.partition_on) {
        return Err(format!("partition_on column '{}' not found", cfg.partition_on));
    }

    let reduced = results.drop_columns(&drop_cols);
    let partitions = reduced.partition_by(&cfg.partition_on).map_err(|e| e.to_string())?;
    if partitions.len() < 2 {
        return Err(format!("expected >= 2 partitions, got {}", partitions.len()));
    }

    let mut all_pass = true;
    for window in partitions.windows(2) {
        let (_, a) = &window[0];
        let (_, b) = &window[1];
        for col in &compare_cols {
            let pass = if let Some(rel_tol) = cfg.relative_tolerance {
                a.max_rel_diff(b, col).unwrap_or(0.0) <= rel_tol
            } else {
                let abs_tol = cfg.absolute_tolerance.unwrap_or(0.0);
                a.max_abs_diff(b, col).unwrap_or(0.0) <= abs_tol
            };
            if !pass {
                all_pass = false;
            }
        }
    }
    Ok(all_pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubExecutor;
    impl QueryExecutor for StubExecutor {
        fn query(&self, _sql: &str, _results: bool, _lower: bool) -> Result<Tabular, sqlmark_query::QueryError> {
            Ok(Tabular::new(vec!["x".to_string()], vec![vec![Value::Integer(1)]]))
        }
        fn ex(&self, _sql: &str) -> Result<(), sqlmark_query::QueryError> {
            Ok(())
        }
    }

    static RENDER_SINK_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_sink(_section: &Section) {
        RENDER_SINK_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn render_true_invokes_the_configured_sink() {
        RENDER_SINK_CALLS.store(0, Ordering::SeqCst);
        let cfg = Configuration::default();
        let mut s = Statement::new("select 1", None, 1, &cfg).unwrap();
        let opts = RunOptions { render: true, render_sink: Some(counting_sink), ..RunOptions::all_continue() };
        s.run(&StubExecutor, 1, &opts).unwrap();
        assert_eq!(RENDER_SINK_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn render_true_without_a_sink_does_not_panic() {
        let cfg = Configuration::default();
        let mut s = Statement::new("select 1", None, 1, &cfg).unwrap();
        let opts = RunOptions { render: true, render_sink: None, ..RunOptions::all_continue() };
        s.run(&StubExecutor, 1, &opts).unwrap();
    }

    #[test]
    fn generic_statement_has_no_qa_kind() {
        let cfg = Configuration::default();
        let s = Statement::new("select 1", None, 1, &cfg).unwrap();
        assert!(matches!(s.kind, StatementKind::Generic));
        assert_eq!(s.outcome, OUTCOME_UNEXECUTED);
    }

    #[test]
    fn qa_empty_anchor_is_recognized_from_user_tag() {
        let cfg = Configuration::default();
        let s = Statement::new("select 1 where 1=0", Some("qa-empty~no rows expected".to_string()), 1, &cfg).unwrap();
        assert!(matches!(s.kind, StatementKind::QaEmpty));
    }

    #[test]
    fn qa_diff_passes_within_absolute_tolerance() {
        let cfg = Configuration::default();
        let table = Tabular::new(
            vec!["g".to_string(), "v".to_string()],
            vec![
                vec![Value::Text("a".to_string()), Value::Real(1.0)],
                vec![Value::Text("b".to_string()), Value::Real(1.0001)],
            ],
        );
        let diff_cfg = QaDiffConfig {
            partition_on: "g".to_string(),
            end_index_at: "g".to_string(),
            compare_patterns: vec![".*".to_string()],
            ignore_patterns: vec![],
            relative_tolerance: None,
            absolute_tolerance: Some(0.001),
        };
        assert!(run_qa_diff(&table, &diff_cfg).unwrap());
    }

    #[test]
    fn qa_diff_fails_outside_tight_tolerance() {
        let cfg_table = Tabular::new(
            vec!["g".to_string(), "v".to_string()],
            vec![
                vec![Value::Text("a".to_string()), Value::Real(1.0)],
                vec![Value::Text("b".to_string()), Value::Real(1.0001)],
            ],
        );
        let diff_cfg = QaDiffConfig {
            partition_on: "g".to_string(),
            end_index_at: "g".to_string(),
            compare_patterns: vec![".*".to_string()],
            ignore_patterns: vec![],
            relative_tolerance: None,
            absolute_tolerance: Some(0.00001),
        };
        assert!(!run_qa_diff(&cfg_table, &diff_cfg).unwrap());
    }

    #[test]
    fn qa_diff_requires_at_least_two_partitions() {
        let table = Tabular::new(
            vec!["g".to_string(), "v".to_string()],
            vec![vec![Value::Text("a".to_string()), Value::Real(1.0)]],
        );
        let diff_cfg = QaDiffConfig {
            partition_on: "g".to_string(),
            end_index_at: "g".to_string(),
            compare_patterns: vec![".*".to_string()],
            ignore_patterns: vec![],
            relative_tolerance: None,
            absolute_tolerance: Some(0.001),
        };
        assert!(run_qa_diff(&table, &diff_cfg).is_err());
    }
}
