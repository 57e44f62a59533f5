//! Query evaluation over the identifier-space store
//!
//! Rows carry `Option<NodeId>` per variable; terms are only materialized
//! for FILTER evaluation and final output. The budget (deadline and
//! cancellation) is checked between operators and inside closure
//! expansions, so a runaway query aborts without corrupting anything;
//! evaluation is read-only.

use crate::algebra::*;
use crate::plan::{plan_bgp, NESTED_LOOP_THRESHOLD};
use crate::results::QueryResults;
use crate::{SparqlError, SparqlResult};
use rdf_model::{Dictionary, NodeId, Term, Vocabulary};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::HashSet;
use std::collections::VecDeque;
use std::time::Instant;
use storage::{TriplePattern as StorePattern, TripleStore};

/// Execution options: budget and cancellation
#[derive(Default)]
pub struct ExecOptions<'c> {
    /// Absolute deadline; exceeding it yields `Timeout`
    pub deadline: Option<Instant>,
    /// Cancellation probe; returning `true` aborts with `Cancelled`
    pub cancelled: Option<&'c (dyn Fn() -> bool + Send + Sync)>,
}

/// Executes parsed queries against one namespace's store and dictionary
pub struct Executor<'a> {
    store: &'a TripleStore,
    dict: &'a Dictionary,
}

type Row = Vec<Option<NodeId>>;

struct EvalCtx<'a, 'c> {
    store: &'a TripleStore,
    dict: &'a Dictionary,
    vars: Vec<String>,
    index: FxHashMap<String, usize>,
    deadline: Option<Instant>,
    cancelled: Option<&'c (dyn Fn() -> bool + Send + Sync)>,
}

#[derive(Clone, Debug, PartialEq)]
enum Value {
    Bool(bool),
    Term(Term),
}

impl<'a> Executor<'a> {
    /// Create an executor over a store and its dictionary
    pub fn new(store: &'a TripleStore, dict: &'a Dictionary) -> Self {
        Self { store, dict }
    }

    /// Evaluate a query
    pub fn execute(&self, query: &Query, opts: &ExecOptions<'_>) -> SparqlResult<QueryResults> {
        let vars = query.pattern.visible_vars();
        let index = vars
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();
        let ctx = EvalCtx {
            store: self.store,
            dict: self.dict,
            vars,
            index,
            deadline: opts.deadline,
            cancelled: opts.cancelled,
        };

        let rows = ctx.eval(&query.pattern)?;
        tracing::debug!(solutions = rows.len(), "pattern evaluation complete");

        match &query.form {
            QueryForm::Ask => Ok(QueryResults::Boolean(!rows.is_empty())),
            QueryForm::Construct { template } => {
                let rows = slice(rows, query.offset, query.limit);
                ctx.construct(template, rows)
            }
            QueryForm::Select {
                distinct,
                projection,
                group_by,
            } => {
                let has_aggregates = matches!(projection, Projection::Items(items)
                    if items.iter().any(|i| matches!(i, SelectItem::Count { .. })));
                if !group_by.is_empty() || has_aggregates {
                    ctx.select_grouped(query, projection, group_by, rows)
                } else {
                    ctx.select_plain(query, *distinct, projection, rows)
                }
            }
        }
    }
}

impl<'a, 'c> EvalCtx<'a, 'c> {
    fn check_budget(&self) -> SparqlResult<()> {
        if let Some(cancelled) = self.cancelled {
            if cancelled() {
                return Err(SparqlError::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SparqlError::Timeout);
            }
        }
        Ok(())
    }

    fn slot(&self, var: &str) -> Option<usize> {
        self.index.get(var).copied()
    }

    fn term(&self, id: NodeId) -> Option<&Term> {
        self.dict.resolve(id)
    }

    // --- operator evaluation ---------------------------------------------

    fn eval(&self, algebra: &Algebra) -> SparqlResult<Vec<Row>> {
        self.check_budget()?;
        match algebra {
            Algebra::Bgp(patterns) => self.eval_bgp(patterns),
            Algebra::Join(left, right) => {
                let left = self.eval(left)?;
                if left.is_empty() {
                    return Ok(left);
                }
                let right = self.eval(right)?;
                self.join(left, right)
            }
            Algebra::Union(left, right) => {
                let mut rows = self.eval(left)?;
                rows.extend(self.eval(right)?);
                Ok(rows)
            }
            Algebra::LeftJoin {
                left,
                right,
                filter,
            } => {
                let left_rows = self.eval(left)?;
                let right_rows = self.eval(right)?;
                let mut out = Vec::with_capacity(left_rows.len());
                for l in &left_rows {
                    self.check_budget()?;
                    let mut matched = false;
                    for r in &right_rows {
                        if let Some(merged) = merge_rows(l, r) {
                            let keep = match filter {
                                Some(expr) => self.eval_truth(expr, &merged),
                                None => true,
                            };
                            if keep {
                                matched = true;
                                out.push(merged);
                            }
                        }
                    }
                    if !matched {
                        out.push(l.clone());
                    }
                }
                Ok(out)
            }
            Algebra::Filter { expr, input } => {
                let rows = self.eval(input)?;
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    self.check_budget()?;
                    if self.eval_truth(expr, &row) {
                        out.push(row);
                    }
                }
                Ok(out)
            }
        }
    }

    fn eval_bgp(&self, patterns: &[TriplePattern]) -> SparqlResult<Vec<Row>> {
        let mut rows = vec![vec![None; self.vars.len()]];
        for idx in plan_bgp(patterns) {
            self.check_budget()?;
            rows = self.extend_rows(rows, &patterns[idx])?;
            if rows.is_empty() {
                break;
            }
        }
        Ok(rows)
    }

    fn extend_rows(&self, rows: Vec<Row>, pattern: &TriplePattern) -> SparqlResult<Vec<Row>> {
        let mut out = Vec::new();
        for row in rows {
            self.check_budget()?;
            self.extend_one(&row, pattern, &mut out)?;
        }
        Ok(out)
    }

    fn extend_one(
        &self,
        row: &Row,
        pattern: &TriplePattern,
        out: &mut Vec<Row>,
    ) -> SparqlResult<()> {
        // constants missing from the dictionary cannot match anything
        let subject = match self.resolve_slot(&pattern.subject, row) {
            Ok(slot) => slot,
            Err(()) => return Ok(()),
        };
        let object = match self.resolve_slot(&pattern.object, row) {
            Ok(slot) => slot,
            Err(()) => return Ok(()),
        };

        match &pattern.predicate {
            PredicatePattern::Var(v) => {
                let pred_slot = self
                    .slot(v)
                    .map(|i| (i, row[i]))
                    .map(|(i, bound)| Slot {
                        value: bound,
                        var: Some(i),
                    })
                    .unwrap_or(Slot {
                        value: None,
                        var: None,
                    });
                let store_pattern = StorePattern::new(subject.value, pred_slot.value, object.value);
                for t in self.store.matches(store_pattern) {
                    let mut new = row.clone();
                    if bind(&mut new, &subject, t.s)
                        && bind(&mut new, &pred_slot, t.p)
                        && bind(&mut new, &object, t.o)
                    {
                        out.push(new);
                    }
                }
            }
            PredicatePattern::Path(PropertyPath::Iri(iri)) => {
                let Some(pid) = self.dict.find_iri(iri) else {
                    return Ok(());
                };
                let store_pattern = StorePattern::new(subject.value, Some(pid), object.value);
                for t in self.store.matches(store_pattern) {
                    let mut new = row.clone();
                    if bind(&mut new, &subject, t.s) && bind(&mut new, &object, t.o) {
                        out.push(new);
                    }
                }
            }
            PredicatePattern::Path(path) => {
                for (s, o) in self.eval_path(path, subject.value, object.value)? {
                    let mut new = row.clone();
                    if bind(&mut new, &subject, s) && bind(&mut new, &object, o) {
                        out.push(new);
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve one pattern position against a row.
    ///
    /// `Err(())` means a constant term that is not in this namespace's
    /// dictionary, so the pattern cannot match.
    fn resolve_slot(&self, term: &TermOrVar, row: &Row) -> Result<Slot, ()> {
        match term {
            TermOrVar::Term(t) => match self.dict.find(t) {
                Some(id) => Ok(Slot {
                    value: Some(id),
                    var: None,
                }),
                None => Err(()),
            },
            TermOrVar::Var(v) => {
                let idx = self.slot(v);
                Ok(Slot {
                    value: idx.and_then(|i| row[i]),
                    var: idx,
                })
            }
        }
    }

    // --- property paths ---------------------------------------------------

    fn eval_path(
        &self,
        path: &PropertyPath,
        start: Option<NodeId>,
        end: Option<NodeId>,
    ) -> SparqlResult<Vec<(NodeId, NodeId)>> {
        self.check_budget()?;
        match path {
            PropertyPath::Iri(iri) => {
                let Some(pid) = self.dict.find_iri(iri) else {
                    return Ok(Vec::new());
                };
                Ok(self
                    .store
                    .matches(StorePattern::new(start, Some(pid), end))
                    .map(|t| (t.s, t.o))
                    .collect())
            }
            PropertyPath::Inverse(inner) => {
                let pairs = self.eval_path(inner, end, start)?;
                Ok(pairs.into_iter().map(|(a, b)| (b, a)).collect())
            }
            PropertyPath::Alternative(a, b) => {
                let mut pairs = self.eval_path(a, start, end)?;
                pairs.extend(self.eval_path(b, start, end)?);
                pairs.sort_unstable();
                pairs.dedup();
                Ok(pairs)
            }
            PropertyPath::Sequence(a, b) => {
                let first = self.eval_path(a, start, None)?;
                let mut pairs = Vec::new();
                for (x, mid) in first {
                    for (_, z) in self.eval_path(b, Some(mid), end)? {
                        pairs.push((x, z));
                    }
                }
                pairs.sort_unstable();
                pairs.dedup();
                Ok(pairs)
            }
            PropertyPath::ZeroOrOne(inner) => {
                let mut pairs = self.identity_pairs(start, end)?;
                pairs.extend(self.eval_path(inner, start, end)?);
                pairs.sort_unstable();
                pairs.dedup();
                Ok(pairs)
            }
            PropertyPath::ZeroOrMore(inner) => self.closure(inner, start, end, true),
            PropertyPath::OneOrMore(inner) => self.closure(inner, start, end, false),
        }
    }

    fn identity_pairs(
        &self,
        start: Option<NodeId>,
        end: Option<NodeId>,
    ) -> SparqlResult<Vec<(NodeId, NodeId)>> {
        match (start, end) {
            (Some(s), Some(e)) => Ok(if s == e { vec![(s, s)] } else { Vec::new() }),
            (Some(s), None) => Ok(vec![(s, s)]),
            (None, Some(e)) => Ok(vec![(e, e)]),
            (None, None) => Ok(self.graph_nodes().into_iter().map(|n| (n, n)).collect()),
        }
    }

    fn graph_nodes(&self) -> Vec<NodeId> {
        let mut nodes = FxHashSet::default();
        for (_, t) in self.store.iter() {
            nodes.insert(t.s);
            nodes.insert(t.o);
        }
        let mut nodes: Vec<_> = nodes.into_iter().collect();
        nodes.sort_unstable();
        nodes
    }

    fn closure(
        &self,
        inner: &PropertyPath,
        start: Option<NodeId>,
        end: Option<NodeId>,
        include_zero: bool,
    ) -> SparqlResult<Vec<(NodeId, NodeId)>> {
        let starts: Vec<NodeId> = match (start, end) {
            (Some(s), _) => vec![s],
            (None, Some(_)) | (None, None) => self.graph_nodes(),
        };

        let mut pairs = Vec::new();
        for s in starts {
            let mut seen: FxHashSet<NodeId> = FxHashSet::default();
            let mut queue = VecDeque::new();
            if include_zero {
                seen.insert(s);
                pairs.push((s, s));
            }
            queue.push_back(s);
            while let Some(node) = queue.pop_front() {
                self.check_budget()?;
                for (_, next) in self.eval_path(inner, Some(node), None)? {
                    if seen.insert(next) {
                        pairs.push((s, next));
                        queue.push_back(next);
                    }
                }
            }
        }

        pairs.sort_unstable();
        pairs.dedup();
        if let Some(e) = end {
            pairs.retain(|(_, o)| *o == e);
        }
        Ok(pairs)
    }

    // --- joins -------------------------------------------------------------

    fn join(&self, left: Vec<Row>, right: Vec<Row>) -> SparqlResult<Vec<Row>> {
        if left.len().min(right.len()) < NESTED_LOOP_THRESHOLD {
            return self.nested_loop_join(left, right);
        }

        // hash on the columns bound in every row of both sides
        let key_cols: Vec<usize> = (0..self.vars.len())
            .filter(|&i| {
                left.iter().all(|r| r[i].is_some()) && right.iter().all(|r| r[i].is_some())
            })
            .collect();
        if key_cols.is_empty() {
            return self.nested_loop_join(left, right);
        }

        let mut table: FxHashMap<Vec<NodeId>, Vec<&Row>> = FxHashMap::default();
        for row in &left {
            let key: Vec<NodeId> = key_cols.iter().map(|&i| row[i].unwrap_or(NodeId::SENTINEL)).collect();
            table.entry(key).or_default().push(row);
        }

        let mut out = Vec::new();
        for row in &right {
            self.check_budget()?;
            let key: Vec<NodeId> = key_cols.iter().map(|&i| row[i].unwrap_or(NodeId::SENTINEL)).collect();
            if let Some(candidates) = table.get(&key) {
                for l in candidates {
                    if let Some(merged) = merge_rows(l, row) {
                        out.push(merged);
                    }
                }
            }
        }
        Ok(out)
    }

    fn nested_loop_join(&self, left: Vec<Row>, right: Vec<Row>) -> SparqlResult<Vec<Row>> {
        let mut out = Vec::new();
        for l in &left {
            self.check_budget()?;
            for r in &right {
                if let Some(merged) = merge_rows(l, r) {
                    out.push(merged);
                }
            }
        }
        Ok(out)
    }

    // --- expressions -------------------------------------------------------

    fn eval_truth(&self, expr: &Expression, row: &Row) -> bool {
        matches!(self.effective_bool(expr, row), Some(true))
    }

    fn effective_bool(&self, expr: &Expression, row: &Row) -> Option<bool> {
        match self.eval_expr(expr, row)? {
            Value::Bool(b) => Some(b),
            Value::Term(Term::Literal(lit)) => {
                if lit.datatype_iri() == Vocabulary::XSD_BOOLEAN {
                    Some(lit.lexical == "true" || lit.lexical == "1")
                } else if Vocabulary::is_numeric_datatype(lit.datatype_iri()) {
                    lit.as_f64().map(|n| n != 0.0)
                } else {
                    Some(!lit.lexical.is_empty())
                }
            }
            Value::Term(_) => None,
        }
    }

    fn eval_expr(&self, expr: &Expression, row: &Row) -> Option<Value> {
        match expr {
            Expression::Var(v) => {
                let id = self.slot(v).and_then(|i| row[i])?;
                Some(Value::Term(self.term(id)?.clone()))
            }
            Expression::Constant(t) => Some(Value::Term(t.clone())),
            Expression::And(a, b) => {
                match (self.effective_bool(a, row), self.effective_bool(b, row)) {
                    (Some(false), _) | (_, Some(false)) => Some(Value::Bool(false)),
                    (Some(true), Some(true)) => Some(Value::Bool(true)),
                    _ => None,
                }
            }
            Expression::Or(a, b) => {
                match (self.effective_bool(a, row), self.effective_bool(b, row)) {
                    (Some(true), _) | (_, Some(true)) => Some(Value::Bool(true)),
                    (Some(false), Some(false)) => Some(Value::Bool(false)),
                    _ => None,
                }
            }
            Expression::Not(inner) => Some(Value::Bool(!self.effective_bool(inner, row)?)),
            Expression::Compare(op, a, b) => {
                let a = self.eval_expr(a, row)?;
                let b = self.eval_expr(b, row)?;
                compare_values(*op, &a, &b).map(Value::Bool)
            }
            Expression::Regex(text, pattern, flags) => {
                let text = self.string_value(text, row)?;
                let Value::Term(pattern) = self.eval_expr(pattern, row)? else {
                    return None;
                };
                let mut source = pattern.value().to_string();
                if let Some(flags) = flags {
                    if self.string_value(flags, row)?.contains('i') {
                        source = format!("(?i){source}");
                    }
                }
                let re = regex::Regex::new(&source).ok()?;
                Some(Value::Bool(re.is_match(&text)))
            }
            Expression::Bound(v) => {
                let bound = self.slot(v).map(|i| row[i].is_some()).unwrap_or(false);
                Some(Value::Bool(bound))
            }
            Expression::IsIri(inner) => match self.eval_expr(inner, row)? {
                Value::Term(t) => Some(Value::Bool(t.is_iri())),
                Value::Bool(_) => Some(Value::Bool(false)),
            },
            Expression::IsLiteral(inner) => match self.eval_expr(inner, row)? {
                Value::Term(t) => Some(Value::Bool(t.is_literal())),
                Value::Bool(_) => Some(Value::Bool(false)),
            },
        }
    }

    fn string_value(&self, expr: &Expression, row: &Row) -> Option<String> {
        match self.eval_expr(expr, row)? {
            Value::Term(t) => Some(t.value().to_string()),
            Value::Bool(b) => Some(b.to_string()),
        }
    }

    // --- result shaping ----------------------------------------------------

    fn select_plain(
        &self,
        query: &Query,
        distinct: bool,
        projection: &Projection,
        mut rows: Vec<Row>,
    ) -> SparqlResult<QueryResults> {
        self.order_rows(&mut rows, &query.order_by)?;

        let out_vars: Vec<String> = match projection {
            Projection::All => self.vars.clone(),
            Projection::Items(items) => items
                .iter()
                .map(|item| match item {
                    SelectItem::Var(v) => Ok(v.clone()),
                    SelectItem::Count { .. } => Err(SparqlError::Unsupported(
                        "aggregate without GROUP BY handled separately".to_string(),
                    )),
                })
                .collect::<SparqlResult<_>>()?,
        };
        let cols: Vec<usize> = out_vars
            .iter()
            .map(|v| self.slot(v).unwrap_or(usize::MAX))
            .collect();

        let mut term_rows: Vec<Vec<Option<Term>>> = rows
            .iter()
            .map(|row| {
                cols.iter()
                    .map(|&i| {
                        if i == usize::MAX {
                            None
                        } else {
                            row[i].and_then(|id| self.term(id).cloned())
                        }
                    })
                    .collect()
            })
            .collect();

        if distinct {
            let mut seen = HashSet::new();
            term_rows.retain(|row| seen.insert(row.clone()));
        }
        let term_rows = slice(term_rows, query.offset, query.limit);
        Ok(QueryResults::Bindings {
            vars: out_vars,
            rows: term_rows,
        })
    }

    fn select_grouped(
        &self,
        query: &Query,
        projection: &Projection,
        group_by: &[String],
        rows: Vec<Row>,
    ) -> SparqlResult<QueryResults> {
        let Projection::Items(items) = projection else {
            return Err(SparqlError::Unsupported(
                "SELECT * with GROUP BY".to_string(),
            ));
        };

        let key_cols: Vec<usize> = group_by
            .iter()
            .map(|v| {
                self.slot(v).ok_or_else(|| {
                    SparqlError::Eval(format!("GROUP BY variable ?{v} not in pattern"))
                })
            })
            .collect::<SparqlResult<_>>()?;

        let mut groups: FxHashMap<Vec<Option<NodeId>>, Vec<Row>> = FxHashMap::default();
        for row in rows {
            let key = key_cols.iter().map(|&i| row[i]).collect();
            groups.entry(key).or_default().push(row);
        }

        let out_vars: Vec<String> = items
            .iter()
            .map(|item| match item {
                SelectItem::Var(v) => v.clone(),
                SelectItem::Count { alias, .. } => alias.clone(),
            })
            .collect();

        let mut term_rows = Vec::with_capacity(groups.len());
        for (key, members) in &groups {
            self.check_budget()?;
            let mut out_row = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    SelectItem::Var(v) => {
                        let pos = group_by.iter().position(|g| g == v).ok_or_else(|| {
                            SparqlError::Eval(format!(
                                "?{v} selected but not grouped or aggregated"
                            ))
                        })?;
                        out_row.push(key[pos].and_then(|id| self.term(id).cloned()));
                    }
                    SelectItem::Count { var, distinct, .. } => {
                        let n = match var {
                            None => members.len(),
                            Some(v) => {
                                let col = self.slot(v).unwrap_or(usize::MAX);
                                if col == usize::MAX {
                                    0
                                } else if *distinct {
                                    members
                                        .iter()
                                        .filter_map(|r| r[col])
                                        .collect::<FxHashSet<_>>()
                                        .len()
                                } else {
                                    members.iter().filter(|r| r[col].is_some()).count()
                                }
                            }
                        };
                        out_row.push(Some(Term::literal_typed(
                            n.to_string(),
                            Vocabulary::XSD_INTEGER,
                        )));
                    }
                }
            }
            term_rows.push(out_row);
        }

        // order grouped output by the projected columns named in ORDER BY
        if !query.order_by.is_empty() {
            let order: Vec<(usize, bool)> = query
                .order_by
                .iter()
                .filter_map(|c| match &c.expr {
                    Expression::Var(v) => out_vars
                        .iter()
                        .position(|o| o == v)
                        .map(|i| (i, c.descending)),
                    _ => None,
                })
                .collect();
            term_rows.sort_by(|a, b| {
                for (col, desc) in &order {
                    let ord = compare_terms_for_order(&a[*col], &b[*col]);
                    let ord = if *desc { ord.reverse() } else { ord };
                    if ord != std::cmp::Ordering::Equal {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        let term_rows = slice(term_rows, query.offset, query.limit);
        Ok(QueryResults::Bindings {
            vars: out_vars,
            rows: term_rows,
        })
    }

    fn order_rows(&self, rows: &mut [Row], conditions: &[OrderCondition]) -> SparqlResult<()> {
        if conditions.is_empty() {
            return Ok(());
        }
        rows.sort_by(|a, b| {
            for condition in conditions {
                let va = self.eval_expr(&condition.expr, a);
                let vb = self.eval_expr(&condition.expr, b);
                let ta = match va {
                    Some(Value::Term(t)) => Some(t),
                    _ => None,
                };
                let tb = match vb {
                    Some(Value::Term(t)) => Some(t),
                    _ => None,
                };
                let ord = compare_terms_for_order(&ta, &tb);
                let ord = if condition.descending {
                    ord.reverse()
                } else {
                    ord
                };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
        Ok(())
    }

    fn construct(
        &self,
        template: &[TriplePattern],
        rows: Vec<Row>,
    ) -> SparqlResult<QueryResults> {
        let mut triples = Vec::new();
        let mut seen = HashSet::new();
        for row in &rows {
            self.check_budget()?;
            for pattern in template {
                let subject = self.instantiate(&pattern.subject, row);
                let predicate = match &pattern.predicate {
                    PredicatePattern::Var(v) => self
                        .slot(v)
                        .and_then(|i| row[i])
                        .and_then(|id| self.term(id).cloned()),
                    PredicatePattern::Path(path) => {
                        path.as_iri().map(|iri| Term::iri(iri.to_string()))
                    }
                };
                let object = self.instantiate(&pattern.object, row);
                if let (Some(s), Some(p), Some(o)) = (subject, predicate, object) {
                    let triple = (s, p, o);
                    if seen.insert(triple.clone()) {
                        triples.push(triple);
                    }
                }
            }
        }
        Ok(QueryResults::Graph(triples))
    }

    fn instantiate(&self, term: &TermOrVar, row: &Row) -> Option<Term> {
        match term {
            TermOrVar::Term(t) => Some(t.clone()),
            TermOrVar::Var(v) => self
                .slot(v)
                .and_then(|i| row[i])
                .and_then(|id| self.term(id).cloned()),
        }
    }
}

/// One pattern position resolved against a row
struct Slot {
    /// Bound value (constant or already-bound variable)
    value: Option<NodeId>,
    /// Column to write when unbound
    var: Option<usize>,
}

fn bind(row: &mut Row, slot: &Slot, value: NodeId) -> bool {
    match slot.value {
        Some(bound) => bound == value,
        None => match slot.var {
            Some(i) => match row[i] {
                // the same variable may appear twice in one pattern
                Some(existing) => existing == value,
                None => {
                    row[i] = Some(value);
                    true
                }
            },
            None => true,
        },
    }
}

fn merge_rows(left: &Row, right: &Row) -> Option<Row> {
    let mut out = left.clone();
    for (i, value) in right.iter().enumerate() {
        match (out[i], value) {
            (Some(a), Some(b)) if a != *b => return None,
            (None, Some(b)) => out[i] = Some(*b),
            _ => {}
        }
    }
    Some(out)
}

fn slice<T>(rows: Vec<T>, offset: usize, limit: Option<usize>) -> Vec<T> {
    rows.into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

fn numeric(term: &Term) -> Option<f64> {
    match term {
        Term::Literal(lit) => lit.as_f64(),
        _ => None,
    }
}

fn compare_values(op: CompareOp, a: &Value, b: &Value) -> Option<bool> {
    use std::cmp::Ordering;
    let ord = match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Term(x), Value::Term(y)) => {
            match (numeric(x), numeric(y)) {
                (Some(nx), Some(ny)) => nx.partial_cmp(&ny)?,
                _ => {
                    // non-numeric equality is structural; ordering is lexical
                    match op {
                        CompareOp::Eq => return Some(x == y),
                        CompareOp::Ne => return Some(x != y),
                        _ => x.value().cmp(y.value()),
                    }
                }
            }
        }
        _ => return None,
    };
    Some(match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Ge => ord != Ordering::Less,
    })
}

fn compare_terms_for_order(a: &Option<Term>, b: &Option<Term>) -> std::cmp::Ordering {
    match (a, b) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(x), Some(y)) => match (numeric(x), numeric(y)) {
            (Some(nx), Some(ny)) => nx.partial_cmp(&ny).unwrap_or(std::cmp::Ordering::Equal),
            _ => x.value().cmp(y.value()),
        },
    }
}
