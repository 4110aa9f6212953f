//! Script: the orchestrator that owns a parsed source file's statements and
//! markers, runs them, and exposes scoped filtering.

use std::collections::HashMap;

use sqlmark_config::Configuration;
use sqlmark_core::{ExceptionHandler, FilterArgs, Marker};
use sqlmark_query::QueryExecutor;

use crate::errors::ScriptError;
use crate::splitter::{find_tag_spans, split_statements, TagSpan};
use crate::statement::{RunOptions, Statement};

/// A statement lookup target: 1-based position (negative counts from the
/// end) or a unique name.
#[derive(Debug, Clone)]
pub enum RunTarget {
    Index(i64),
    Name(String),
}

fn whitespace_gap_single_newline(chars: &[char], from: usize, to: usize) -> bool {
    if to < from {
        return false;
    }
    let gap = &chars[from..to];
    gap.iter().all(|c| c.is_whitespace()) && gap.iter().filter(|&&c| c == '\n').count() == 1
}

/// One item in a script's rendered content order: either a statement (by
/// its position in `statements()`) or a marker (by its order key).
#[derive(Debug, Clone, Copy)]
pub enum ContentItem {
    Statement(usize),
    Marker(u64),
}

pub struct Script {
    pub config: Configuration,
    source: String,
    statements: Vec<Statement>,
    markers: Vec<Marker>,
    duplicates: HashMap<String, usize>,
    filter_stack: Vec<FilterArgs>,
    /// One saved `index` snapshot per active `filter()` nesting level,
    /// restored verbatim on that call's exit.
    index_stack: Vec<Vec<usize>>,
    named_scopes: HashMap<String, FilterArgs>,
    pub e: ExceptionHandler,
}

fn merge_filter(base: &FilterArgs, overlay: &FilterArgs) -> FilterArgs {
    FilterArgs {
        incl_kw: overlay.incl_kw.clone().or_else(|| base.incl_kw.clone()),
        excl_kw: overlay.excl_kw.clone().or_else(|| base.excl_kw.clone()),
        incl_obj: overlay.incl_obj.clone().or_else(|| base.incl_obj.clone()),
        excl_obj: overlay.excl_obj.clone().or_else(|| base.excl_obj.clone()),
        incl_desc: overlay.incl_desc.clone().or_else(|| base.incl_desc.clone()),
        excl_desc: overlay.excl_desc.clone().or_else(|| base.excl_desc.clone()),
        incl_anchor: overlay.incl_anchor.clone().or_else(|| base.incl_anchor.clone()),
        excl_anchor: overlay.excl_anchor.clone().or_else(|| base.excl_anchor.clone()),
        incl_nm: overlay.incl_nm.clone().or_else(|| base.incl_nm.clone()),
        excl_nm: overlay.excl_nm.clone().or_else(|| base.excl_nm.clone()),
        as_id: overlay.as_id.clone(),
        from_id: overlay.from_id.clone(),
    }
}

impl Script {
    /// Parses `source` into statements and markers, attaching a tag block
    /// to the statement that immediately follows it (separated only by
    /// whitespace containing exactly one newline); any other tag block is
    /// a free-standing marker.
    pub fn parse(source: impl Into<String>, config: Configuration) -> Result<Self, ScriptError> {
        let source = source.into();
        let tag_spans = find_tag_spans(&source, &config)?;
        let stmt_spans = split_statements(&source, &tag_spans);
        let chars: Vec<char> = source.chars().collect();

        let mut stmt_tag: Vec<Option<usize>> = vec![None; stmt_spans.len()];
        for (ti, tag) in tag_spans.iter().enumerate() {
            if let Some((si, _)) = stmt_spans
                .iter()
                .enumerate()
                .filter(|(_, s)| s.start >= tag.end)
                .min_by_key(|(_, s)| s.start)
            {
                if whitespace_gap_single_newline(&chars, tag.end, stmt_spans[si].start) {
                    stmt_tag[si] = Some(ti);
                }
            }
        }
        let attached: std::collections::HashSet<usize> = stmt_tag.iter().flatten().copied().collect();

        let mut statements = Vec::with_capacity(stmt_spans.len());
        for (si, span) in stmt_spans.iter().enumerate() {
            let attrs_raw = stmt_tag[si].map(|ti| tag_spans[ti].body.clone());
            statements.push(Statement::new(span.sql.clone(), attrs_raw, si + 1, &config)?);
        }

        let mut markers = Vec::new();
        let mut slot_ordinal: HashMap<usize, usize> = HashMap::new();
        for (ti, tag) in tag_spans.iter().enumerate() {
            if attached.contains(&ti) {
                continue;
            }
            let slot = stmt_spans.iter().filter(|s| s.end <= tag.start).count();
            let ordinal = slot_ordinal.entry(slot).or_insert(0);
            *ordinal += 1;
            let parsed =
                sqlmark_core::parse_tag_body(&tag.body, &config, ti).map_err(|source| ScriptError::InvalidTags { index: ti, source })?;
            markers.push(Marker::new(parsed, tag.body.clone(), slot, *ordinal));
        }

        let mut duplicates: HashMap<String, usize> = HashMap::new();
        for s in &statements {
            *duplicates.entry(s.tag.nm.clone()).or_insert(0) += 1;
        }

        Ok(Self {
            config,
            source,
            statements,
            markers,
            duplicates,
            filter_stack: Vec::new(),
            index_stack: Vec::new(),
            named_scopes: HashMap::new(),
            e: ExceptionHandler::new(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn is_filtered(&self) -> bool {
        !self.filter_stack.is_empty()
    }

    fn current_effective(&self) -> FilterArgs {
        self.filter_stack.last().cloned().unwrap_or_default()
    }

    fn apply_effective(&mut self) {
        let effective = self.current_effective();
        for s in &mut self.statements {
            s.tag.apply_filter(&effective);
        }
    }

    /// Renumbers every currently-included statement to `1..=K`, in their
    /// existing relative order, where `K` is the count of included
    /// statements. Excluded statements keep whatever `index` they carried
    /// coming in.
    fn renumber_included(&mut self) {
        let mut next = 0usize;
        for s in &mut self.statements {
            if s.tag.is_included() {
                next += 1;
                s.index = next;
            }
        }
    }

    /// Scopes every statement under `args` for the duration of `body`:
    /// applies the merged scope, renumbers the now-visible statements
    /// `1..K`, then restores both the prior scope and the prior `index`
    /// values on every exit path, including an early `Err` return from
    /// `body`.
    pub fn filter<R>(
        &mut self,
        args: FilterArgs,
        body: impl FnOnce(&mut Script) -> Result<R, ScriptError>,
    ) -> Result<R, ScriptError> {
        let base = match &args.from_id {
            Some(id) => self.named_scopes.get(id).cloned().unwrap_or_default(),
            None => self.current_effective(),
        };
        let effective = merge_filter(&base, &args);
        if let Some(id) = &args.as_id {
            self.named_scopes.insert(id.clone(), effective.clone());
        }
        self.filter_stack.push(effective);

        let snapshot: Vec<usize> = self.statements.iter().map(|s| s.index).collect();
        self.index_stack.push(snapshot);

        self.apply_effective();
        self.renumber_included();

        let result = body(self);

        self.filter_stack.pop();
        let snapshot = self.index_stack.pop().expect("index_stack pushed above");
        for (s, idx) in self.statements.iter_mut().zip(snapshot) {
            s.index = idx;
        }
        self.apply_effective();

        result
    }

    /// Resolves a 1-based (negative-from-end) position against the
    /// currently visible statements: inside a `filter()` context that's
    /// the renumbered `1..K` view; outside, the original source order.
    fn resolve_index(&self, index: i64) -> Option<usize> {
        if self.is_filtered() {
            let visible: Vec<usize> = self
                .statements
                .iter()
                .enumerate()
                .filter(|(_, s)| s.tag.is_included())
                .map(|(i, _)| i)
                .collect();
            let len = visible.len() as i64;
            let zero_based = if index > 0 { index - 1 } else { len + index };
            if zero_based < 0 || zero_based >= len {
                None
            } else {
                Some(visible[zero_based as usize])
            }
        } else {
            let len = self.statements.len() as i64;
            let zero_based = if index > 0 { index - 1 } else { len + index };
            if zero_based < 0 || zero_based >= len {
                None
            } else {
                Some(zero_based as usize)
            }
        }
    }

    pub fn statement(&self, target: &RunTarget) -> Result<&Statement, ScriptError> {
        match target {
            RunTarget::Index(i) => {
                let idx = self
                    .resolve_index(*i)
                    .ok_or_else(|| ScriptError::StatementNotFound { nm: format!("index {i}") })?;
                Ok(&self.statements[idx])
            }
            RunTarget::Name(nm) => {
                let count = *self.duplicates.get(nm).unwrap_or(&0);
                match count {
                    0 => Err(ScriptError::StatementNotFound { nm: nm.clone() }),
                    1 => self
                        .statements
                        .iter()
                        .find(|s| &s.tag.nm == nm)
                        .ok_or_else(|| ScriptError::StatementNotFound { nm: nm.clone() }),
                    n => Err(ScriptError::DuplicateTag { nm: nm.clone(), count: n }),
                }
            }
        }
    }

    fn statement_mut(&mut self, target: &RunTarget) -> Result<&mut Statement, ScriptError> {
        match target {
            RunTarget::Index(i) => {
                let idx = self
                    .resolve_index(*i)
                    .ok_or_else(|| ScriptError::StatementNotFound { nm: format!("index {i}") })?;
                Ok(&mut self.statements[idx])
            }
            RunTarget::Name(nm) => {
                let count = *self.duplicates.get(nm).unwrap_or(&0);
                match count {
                    0 => Err(ScriptError::StatementNotFound { nm: nm.clone() }),
                    1 => self
                        .statements
                        .iter_mut()
                        .find(|s| &s.tag.nm == nm)
                        .ok_or_else(|| ScriptError::StatementNotFound { nm: nm.clone() }),
                    n => Err(ScriptError::DuplicateTag { nm: nm.clone(), count: n }),
                }
            }
        }
    }

    /// Runs a single statement by index or name.
    pub fn run_one(&mut self, target: &RunTarget, executor: &dyn QueryExecutor, opts: &RunOptions) -> Result<(), ScriptError> {
        let ctx_id = self.e.set(None, true, None)?;
        let stmt = self.statement_mut(target)?;
        stmt.run(executor, ctx_id, opts)
    }

    /// Runs every statement currently in scope, in declaration order.
    pub fn run_all(&mut self, executor: &dyn QueryExecutor, opts: &RunOptions) -> Result<(), ScriptError> {
        let ctx_id = self.e.set(None, true, None)?;
        for stmt in &mut self.statements {
            stmt.run(executor, ctx_id, opts)?;
        }
        Ok(())
    }

    /// Runs a named/indexed subset, in the order given.
    pub fn run_many(&mut self, targets: &[RunTarget], executor: &dyn QueryExecutor, opts: &RunOptions) -> Result<(), ScriptError> {
        let ctx_id = self.e.set(None, true, None)?;
        for target in targets {
            let stmt = self.statement_mut(target)?;
            stmt.run(executor, ctx_id, opts)?;
        }
        Ok(())
    }

    /// The script's content in render order: statements interleaved with
    /// markers at their computed position. When `ignore_scope` is `false`,
    /// excluded statements are skipped. `validate` rejects duplicate
    /// statement names up front, since callers indexing by name need
    /// uniqueness.
    pub fn contents(&self, markers: bool, ignore_scope: bool, validate: bool) -> Result<Vec<ContentItem>, ScriptError> {
        if validate {
            if let Some((nm, count)) = self.duplicates.iter().find(|(_, &c)| c > 1) {
                return Err(ScriptError::DuplicateTag { nm: nm.clone(), count: *count });
            }
        }
        let mut items: Vec<(f64, ContentItem)> = self
            .statements
            .iter()
            .enumerate()
            .filter(|(_, s)| ignore_scope || s.tag.is_included())
            .map(|(i, s)| (s.index as f64, ContentItem::Statement(i)))
            .collect();
        if markers {
            items.extend(self.markers.iter().map(|m| (m.index(), ContentItem::Marker(m.order_key()))));
        }
        items.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(items.into_iter().map(|(_, item)| item).collect())
    }
}
