//! Per-namespace quad store with three permutation indexes
//!
//! A pattern `(s?, p?, o?)` is answered by the index whose key order puts
//! the bound positions first, turning every lookup into a sorted range
//! scan. Insertion keeps all three indexes and the provenance ledger in
//! step.

use crate::provenance::{Provenance, ProvenanceLedger};
use crate::{StorageError, StorageResult};
use rdf_model::{NodeId, TripleId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A triple in identifier space; the namespace is the graph component
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct IdTriple {
    /// Subject id
    pub s: NodeId,
    /// Predicate id
    pub p: NodeId,
    /// Object id
    pub o: NodeId,
}

impl IdTriple {
    /// Create a new id triple
    pub fn new(s: NodeId, p: NodeId, o: NodeId) -> Self {
        Self { s, p, o }
    }
}

/// Match pattern over identifier triples; `None` is a wildcard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriplePattern {
    /// Subject constraint
    pub s: Option<NodeId>,
    /// Predicate constraint
    pub p: Option<NodeId>,
    /// Object constraint
    pub o: Option<NodeId>,
}

impl TriplePattern {
    /// Create a pattern from optional positions
    pub fn new(s: Option<NodeId>, p: Option<NodeId>, o: Option<NodeId>) -> Self {
        Self { s, p, o }
    }

    /// Pattern matching every triple
    pub fn all() -> Self {
        Self::default()
    }

    /// Number of bound positions
    pub fn bound_count(&self) -> usize {
        self.s.is_some() as usize + self.p.is_some() as usize + self.o.is_some() as usize
    }

    /// Check a triple against the pattern
    pub fn matches(&self, t: &IdTriple) -> bool {
        self.s.map_or(true, |s| s == t.s)
            && self.p.map_or(true, |p| p == t.p)
            && self.o.map_or(true, |o| o == t.o)
    }
}

/// Result of a single insert
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Whether the quad was new
    pub added: bool,
    /// Id of the quad (existing id when `added` is false)
    pub id: TripleId,
}

/// Result of a batch insert
#[derive(Clone, Debug, Default)]
pub struct BatchOutcome {
    /// Newly stored quads in insertion order
    pub added: Vec<(TripleId, IdTriple)>,
    /// Number of quads skipped as duplicates
    pub duplicates: usize,
}

/// The authoritative quad set of one namespace.
///
/// Owns the provenance ledger; deleting a quad cascades to every quad
/// whose inference chain reaches it.
#[derive(Debug, Default)]
pub struct TripleStore {
    spo: BTreeSet<(NodeId, NodeId, NodeId)>,
    pos: BTreeSet<(NodeId, NodeId, NodeId)>,
    osp: BTreeSet<(NodeId, NodeId, NodeId)>,
    ids: FxHashMap<IdTriple, TripleId>,
    by_id: FxHashMap<TripleId, IdTriple>,
    ledger: ProvenanceLedger,
    next_triple_id: u64,
}

impl TripleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            next_triple_id: 1,
            ..Self::default()
        }
    }

    /// Insert one quad with its provenance.
    ///
    /// Returns `added=false` and the existing id when the quad is already
    /// present; the supplied provenance is dropped in that case.
    pub fn insert(&mut self, triple: IdTriple, provenance: Provenance) -> InsertOutcome {
        if let Some(&id) = self.ids.get(&triple) {
            return InsertOutcome { added: false, id };
        }
        let id = TripleId::new(self.next_triple_id);
        self.next_triple_id += 1;
        self.store(id, triple, provenance);
        InsertOutcome { added: true, id }
    }

    /// Insert a batch of quads under a single index pass.
    ///
    /// The store itself cannot partially fail here; callers validate the
    /// batch before handing it over so the all-or-nothing contract holds.
    pub fn insert_batch(
        &mut self,
        batch: Vec<(IdTriple, Provenance)>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (triple, provenance) in batch {
            let result = self.insert(triple, provenance);
            if result.added {
                outcome.added.push((result.id, triple));
            } else {
                outcome.duplicates += 1;
            }
        }
        outcome
    }

    /// Re-insert a quad under its original id during log replay
    pub fn restore(
        &mut self,
        id: TripleId,
        triple: IdTriple,
        provenance: Provenance,
    ) -> StorageResult<()> {
        if self.by_id.contains_key(&id) || self.ids.contains_key(&triple) {
            return Err(StorageError::Corrupt(format!(
                "duplicate quad record for id {id}"
            )));
        }
        self.store(id, triple, provenance);
        if id.as_u64() >= self.next_triple_id {
            self.next_triple_id = id.as_u64() + 1;
        }
        Ok(())
    }

    fn store(&mut self, id: TripleId, t: IdTriple, provenance: Provenance) {
        self.spo.insert((t.s, t.p, t.o));
        self.pos.insert((t.p, t.o, t.s));
        self.osp.insert((t.o, t.s, t.p));
        self.ids.insert(t, id);
        self.by_id.insert(id, t);
        self.ledger.append(id, provenance);
    }

    /// Delete a quad and every quad inferred (transitively) from it.
    ///
    /// Returns the ids removed, the root first.
    pub fn delete(&mut self, root: TripleId) -> StorageResult<Vec<TripleId>> {
        if !self.by_id.contains_key(&root) {
            return Err(StorageError::UnknownTriple(root));
        }
        let mut removed = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(t) = self.by_id.remove(&id) else {
                // already gone: a dependent reachable through two premises
                continue;
            };
            self.spo.remove(&(t.s, t.p, t.o));
            self.pos.remove(&(t.p, t.o, t.s));
            self.osp.remove(&(t.o, t.s, t.p));
            self.ids.remove(&t);
            stack.extend(self.ledger.remove(id));
            removed.push(id);
        }
        Ok(removed)
    }

    /// Check whether a quad is present
    pub fn contains(&self, triple: &IdTriple) -> bool {
        self.ids.contains_key(triple)
    }

    /// Id of a stored quad
    pub fn triple_id(&self, triple: &IdTriple) -> Option<TripleId> {
        self.ids.get(triple).copied()
    }

    /// Quad for a stored id
    pub fn get(&self, id: TripleId) -> Option<IdTriple> {
        self.by_id.get(&id).copied()
    }

    /// Provenance row for a stored id
    pub fn provenance(&self, id: TripleId) -> Option<&Provenance> {
        self.ledger.get(id)
    }

    /// Read access to the ledger (explanation, debugging)
    pub fn ledger(&self) -> &ProvenanceLedger {
        &self.ledger
    }

    /// Number of stored quads
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterate over all stored quads with their ids
    pub fn iter(&self) -> impl Iterator<Item = (TripleId, IdTriple)> + '_ {
        self.by_id.iter().map(|(id, t)| (*id, *t))
    }

    /// Match a pattern, choosing the index by its bound prefix.
    ///
    /// The iterator is lazy, finite, and borrows the store.
    pub fn matches(&self, pattern: TriplePattern) -> MatchIter<'_> {
        let inner: Box<dyn Iterator<Item = IdTriple> + '_> = match (pattern.s, pattern.p, pattern.o)
        {
            (Some(s), Some(p), Some(o)) => {
                let t = IdTriple::new(s, p, o);
                if self.ids.contains_key(&t) {
                    Box::new(std::iter::once(t))
                } else {
                    Box::new(std::iter::empty())
                }
            }
            (Some(s), Some(p), None) => Box::new(
                self.spo
                    .range((s, p, NodeId::SENTINEL)..=(s, p, NodeId::MAX))
                    .map(|&(s, p, o)| IdTriple::new(s, p, o)),
            ),
            (Some(s), None, Some(o)) => Box::new(
                self.osp
                    .range((o, s, NodeId::SENTINEL)..=(o, s, NodeId::MAX))
                    .map(|&(o, s, p)| IdTriple::new(s, p, o)),
            ),
            (None, Some(p), Some(o)) => Box::new(
                self.pos
                    .range((p, o, NodeId::SENTINEL)..=(p, o, NodeId::MAX))
                    .map(|&(p, o, s)| IdTriple::new(s, p, o)),
            ),
            (Some(s), None, None) => Box::new(
                self.spo
                    .range((s, NodeId::SENTINEL, NodeId::SENTINEL)..=(s, NodeId::MAX, NodeId::MAX))
                    .map(|&(s, p, o)| IdTriple::new(s, p, o)),
            ),
            (None, Some(p), None) => Box::new(
                self.pos
                    .range((p, NodeId::SENTINEL, NodeId::SENTINEL)..=(p, NodeId::MAX, NodeId::MAX))
                    .map(|&(p, o, s)| IdTriple::new(s, p, o)),
            ),
            (None, None, Some(o)) => Box::new(
                self.osp
                    .range((o, NodeId::SENTINEL, NodeId::SENTINEL)..=(o, NodeId::MAX, NodeId::MAX))
                    .map(|&(o, s, p)| IdTriple::new(s, p, o)),
            ),
            (None, None, None) => {
                Box::new(self.spo.iter().map(|&(s, p, o)| IdTriple::new(s, p, o)))
            }
        };
        MatchIter { inner }
    }

    /// Cross-check the permutation indexes after replay.
    ///
    /// A cardinality mismatch means a partial write slipped through; the
    /// secondary indexes are rebuilt from the id map.
    pub fn verify_and_repair(&mut self) -> bool {
        let n = self.by_id.len();
        if self.spo.len() == n && self.pos.len() == n && self.osp.len() == n {
            return false;
        }
        tracing::warn!(
            spo = self.spo.len(),
            pos = self.pos.len(),
            osp = self.osp.len(),
            quads = n,
            "index cardinality mismatch, rebuilding indexes"
        );
        self.spo.clear();
        self.pos.clear();
        self.osp.clear();
        for t in self.by_id.values() {
            self.spo.insert((t.s, t.p, t.o));
            self.pos.insert((t.p, t.o, t.s));
            self.osp.insert((t.o, t.s, t.p));
        }
        true
    }
}

/// Lazy iterator over quads matching a pattern
pub struct MatchIter<'a> {
    inner: Box<dyn Iterator<Item = IdTriple> + 'a>,
}

impl Iterator for MatchIter<'_> {
    type Item = IdTriple;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::Provenance;

    fn t(s: u64, p: u64, o: u64) -> IdTriple {
        IdTriple::new(NodeId::new(s), NodeId::new(p), NodeId::new(o))
    }

    fn prov() -> Provenance {
        Provenance::ingested("test", "unit")
    }

    #[test]
    fn test_insert_and_duplicate() {
        let mut store = TripleStore::new();
        let first = store.insert(t(1, 2, 3), prov());
        assert!(first.added);

        let second = store.insert(t(1, 2, 3), prov());
        assert!(!second.added);
        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_match_by_subject() {
        let mut store = TripleStore::new();
        store.insert(t(1, 2, 3), prov());
        store.insert(t(1, 4, 5), prov());
        store.insert(t(2, 2, 3), prov());

        let hits: Vec<_> = store
            .matches(TriplePattern::new(Some(NodeId::new(1)), None, None))
            .collect();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|q| q.s == NodeId::new(1)));
    }

    #[test]
    fn test_match_by_predicate_object() {
        let mut store = TripleStore::new();
        store.insert(t(1, 2, 3), prov());
        store.insert(t(4, 2, 3), prov());
        store.insert(t(4, 2, 9), prov());

        let hits: Vec<_> = store
            .matches(TriplePattern::new(
                None,
                Some(NodeId::new(2)),
                Some(NodeId::new(3)),
            ))
            .collect();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_match_subject_object_uses_osp() {
        let mut store = TripleStore::new();
        store.insert(t(1, 2, 3), prov());
        store.insert(t(1, 7, 3), prov());
        store.insert(t(1, 7, 4), prov());

        let hits: Vec<_> = store
            .matches(TriplePattern::new(
                Some(NodeId::new(1)),
                None,
                Some(NodeId::new(3)),
            ))
            .collect();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|q| q.o == NodeId::new(3)));
    }

    #[test]
    fn test_delete_removes_all_indexes() {
        let mut store = TripleStore::new();
        let outcome = store.insert(t(1, 2, 3), prov());
        let removed = store.delete(outcome.id).unwrap();
        assert_eq!(removed, vec![outcome.id]);
        assert!(store.is_empty());
        assert_eq!(store.matches(TriplePattern::all()).count(), 0);
        assert!(store.provenance(outcome.id).is_none());
    }

    #[test]
    fn test_delete_cascades_through_inference_chain() {
        let mut store = TripleStore::new();
        let base = store.insert(t(1, 2, 3), prov());
        let inferred = store.insert(
            t(3, 2, 1),
            Provenance::inferred("symmetric", vec![base.id]),
        );
        let second_level = store.insert(
            t(3, 4, 1),
            Provenance::inferred("chain", vec![inferred.id]),
        );

        let removed = store.delete(base.id).unwrap();
        assert_eq!(removed.len(), 3);
        assert!(store.is_empty());
        assert!(store.get(second_level.id).is_none());
    }

    #[test]
    fn test_delete_unknown_id() {
        let mut store = TripleStore::new();
        assert!(matches!(
            store.delete(TripleId::new(42)),
            Err(StorageError::UnknownTriple(_))
        ));
    }

    #[test]
    fn test_batch_reports_duplicates() {
        let mut store = TripleStore::new();
        store.insert(t(1, 2, 3), prov());
        let outcome = store.insert_batch(vec![
            (t(1, 2, 3), prov()),
            (t(4, 5, 6), prov()),
        ]);
        assert_eq!(outcome.added.len(), 1);
        assert_eq!(outcome.duplicates, 1);
    }

    #[test]
    fn test_verify_and_repair() {
        let mut store = TripleStore::new();
        store.insert(t(1, 2, 3), prov());
        store.insert(t(4, 5, 6), prov());
        store.pos.clear();
        assert!(store.verify_and_repair());
        assert_eq!(
            store
                .matches(TriplePattern::new(None, Some(NodeId::new(5)), None))
                .count(),
            1
        );
    }
}
