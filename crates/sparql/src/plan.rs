//! Physical planning
//!
//! Two decisions live here: the order in which a BGP's patterns execute
//! (greedy, most-bound-first, so each pattern runs against the smallest
//! index range), and the join strategy between groups (hash join unless
//! an input is small enough that a nested loop is cheaper).

use crate::algebra::{PredicatePattern, PropertyPath, TermOrVar, TriplePattern};
use rustc_hash::FxHashSet;

/// Inputs smaller than this run through a nested-loop join
pub(crate) const NESTED_LOOP_THRESHOLD: usize = 16;

fn position_score(term: &TermOrVar, bound: &FxHashSet<String>) -> usize {
    match term {
        TermOrVar::Term(_) => 1,
        TermOrVar::Var(v) => usize::from(bound.contains(v)),
    }
}

fn pattern_score(pattern: &TriplePattern, bound: &FxHashSet<String>) -> usize {
    let mut score = position_score(&pattern.subject, bound) * 4
        + position_score(&pattern.object, bound) * 2;
    score += match &pattern.predicate {
        PredicatePattern::Var(v) => usize::from(bound.contains(v)),
        // a plain predicate narrows the scan; closures have to expand
        PredicatePattern::Path(PropertyPath::Iri(_)) => 3,
        PredicatePattern::Path(_) => 0,
    };
    score
}

fn add_vars(pattern: &TriplePattern, bound: &mut FxHashSet<String>) {
    if let TermOrVar::Var(v) = &pattern.subject {
        bound.insert(v.clone());
    }
    if let PredicatePattern::Var(v) = &pattern.predicate {
        bound.insert(v.clone());
    }
    if let TermOrVar::Var(v) = &pattern.object {
        bound.insert(v.clone());
    }
}

/// Order the patterns of a BGP for execution.
///
/// Greedy: always pick the remaining pattern with the most positions
/// bound by constants or previously chosen patterns; ties keep query
/// order. The per-pattern index inside the store is then chosen from the
/// actually bound positions at runtime.
pub(crate) fn plan_bgp(patterns: &[TriplePattern]) -> Vec<usize> {
    let mut order = Vec::with_capacity(patterns.len());
    let mut remaining: Vec<usize> = (0..patterns.len()).collect();
    let mut bound = FxHashSet::default();

    while !remaining.is_empty() {
        let best = remaining
            .iter()
            .enumerate()
            .max_by_key(|(slot, &idx)| {
                // earlier patterns win ties
                (pattern_score(&patterns[idx], &bound), usize::MAX - slot)
            })
            .map(|(slot, _)| slot)
            .unwrap_or(0);
        let idx = remaining.remove(best);
        add_vars(&patterns[idx], &mut bound);
        order.push(idx);
    }
    order
}
