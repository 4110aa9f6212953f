//! Per-object exception ledger, keyed by context id with monotonic
//! ordering and typed, filterable retrieval.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::errors::InternalError;

/// One collected error. `kind` names the error class (`"execution"`,
/// `"post_processing"`, `"qa_empty"`, `"qa_diff"`, ...) for typed queries.
#[derive(Debug, Clone)]
pub struct ExceptionRecord {
    pub seq: i64,
    pub at: DateTime<Utc>,
    pub kind: String,
    pub msg: String,
    pub errno: Option<i32>,
    pub nm: String,
    pub to_raise: bool,
    pub raised: bool,
}

impl ExceptionRecord {
    pub fn new(kind: impl Into<String>, msg: impl Into<String>, nm: impl Into<String>, to_raise: bool) -> Self {
        Self {
            seq: 0,
            at: Utc::now(),
            kind: kind.into(),
            msg: msg.into(),
            errno: None,
            nm: nm.into(),
            to_raise,
            raised: false,
        }
    }
}

/// Optional filters for [`ExceptionHandler::seen`] / [`ExceptionHandler::get`].
#[derive(Debug, Clone, Default)]
pub struct Query<'a> {
    pub of_type: Option<&'a str>,
    pub to_raise: Option<bool>,
    pub with_ids: Option<&'a [i64]>,
    pub from_ctx: Option<i64>,
    pub all_time: bool,
}

/// A per-object ledger of collected errors keyed by context id.
#[derive(Debug, Default)]
pub struct ExceptionHandler {
    ctx_id: Option<i64>,
    in_context: bool,
    outcome: Option<bool>,
    by_ctx: BTreeMap<i64, BTreeMap<i64, ExceptionRecord>>,
    next_ctx_id: i64,
    next_seq: i64,
}

impl ExceptionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ctx_id(&self) -> Option<i64> {
        self.ctx_id
    }

    pub fn in_context(&self) -> bool {
        self.in_context
    }

    /// Opens or updates the current context. `ctx_id == Some(-1)` is
    /// replaced with a fresh monotonic id. Reusing an already-present
    /// context id is an internal error.
    pub fn set(&mut self, ctx_id: Option<i64>, in_context: bool, outcome: Option<bool>) -> Result<i64, InternalError> {
        let resolved = match ctx_id {
            Some(-1) | None => {
                self.next_ctx_id += 1;
                self.next_ctx_id
            }
            Some(id) => id,
        };
        if self.by_ctx.contains_key(&resolved) {
            return Err(InternalError::CtxIdReused(resolved));
        }
        self.by_ctx.entry(resolved).or_default();
        self.ctx_id = Some(resolved);
        self.in_context = in_context;
        self.outcome = outcome;
        Ok(resolved)
    }

    /// Clears context/outcome state without discarding collected records.
    pub fn reset(&mut self) {
        self.ctx_id = None;
        self.in_context = false;
        self.outcome = None;
    }

    /// Appends `record` under the current context, stamping it with a
    /// fresh monotonic sequence number.
    pub fn collect(&mut self, mut record: ExceptionRecord) {
        let ctx = self.ctx_id.unwrap_or(0);
        self.next_seq += 1;
        record.seq = self.next_seq;
        self.by_ctx.entry(ctx).or_default().insert(record.seq, record);
    }

    fn iter_matching<'a>(&'a self, q: &Query<'_>) -> Box<dyn Iterator<Item = &'a ExceptionRecord> + 'a> {
        let ctxs: Vec<i64> = if q.all_time {
            self.by_ctx.keys().copied().collect()
        } else {
            let ctx = q.from_ctx.or(self.ctx_id).unwrap_or(0);
            vec![ctx]
        };
        let records: Vec<&ExceptionRecord> = ctxs
            .into_iter()
            .filter_map(|c| self.by_ctx.get(&c))
            .flat_map(|m| m.values())
            .filter(|r| q.of_type.is_none_or(|t| r.kind == t))
            .filter(|r| q.to_raise.is_none_or(|want| r.to_raise == want))
            .filter(|r| q.with_ids.is_none_or(|ids| ids.contains(&r.seq)))
            .collect();
        Box::new(records.into_iter())
    }

    /// `true` iff at least one record matches `q`.
    pub fn seen(&self, q: &Query<'_>) -> bool {
        self.iter_matching(q).next().is_some()
    }

    /// Returns matching records, most recent first. If `last` is `true`
    /// and none match, returns an error rather than `None`.
    pub fn get(&self, q: &Query<'_>, last: bool) -> Result<Option<&ExceptionRecord>, InternalError> {
        let mut matches: Vec<&ExceptionRecord> = self.iter_matching(q).collect();
        matches.sort_by_key(|r| std::cmp::Reverse(r.seq));
        match matches.into_iter().next() {
            Some(r) => Ok(Some(r)),
            None if last => Err(InternalError::Invariant(
                "get(last=true) requested but no matching exception record exists".to_string(),
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_orders_by_monotonic_seq() {
        let mut h = ExceptionHandler::new();
        h.set(None, true, None).unwrap();
        h.collect(ExceptionRecord::new("execution", "first", "s1", true));
        h.collect(ExceptionRecord::new("execution", "second", "s1", true));
        let q = Query::default();
        let last = h.get(&q, true).unwrap().unwrap();
        assert_eq!(last.msg, "second");
    }

    #[test]
    fn seen_filters_by_to_raise_and_kind() {
        let mut h = ExceptionHandler::new();
        h.set(None, true, None).unwrap();
        h.collect(ExceptionRecord::new("qa_empty", "failed", "s1", true));
        let q = Query {
            of_type: Some("qa_empty"),
            to_raise: Some(true),
            ..Default::default()
        };
        assert!(h.seen(&q));
        let q2 = Query {
            of_type: Some("qa_diff"),
            ..Default::default()
        };
        assert!(!h.seen(&q2));
    }

    #[test]
    fn reusing_ctx_id_is_internal_error() {
        let mut h = ExceptionHandler::new();
        let id = h.set(None, true, None).unwrap();
        h.reset();
        let err = h.set(Some(id), true, None).unwrap_err();
        assert!(matches!(err, InternalError::CtxIdReused(_)));
    }

    #[test]
    fn get_last_raises_when_nothing_matches() {
        let h = ExceptionHandler::new();
        let q = Query::default();
        assert!(h.get(&q, true).is_err());
        assert!(h.get(&q, false).unwrap().is_none());
    }
}
