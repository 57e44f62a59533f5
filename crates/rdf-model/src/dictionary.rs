//! Identifier dictionary: bidirectional term-to-id mapping per namespace
//!
//! The dictionary is the sole allocator of [`NodeId`]s. Ids are handed out
//! monotonically starting at 1 and stay stable for the lifetime of the
//! namespace, even when every quad mentioning them is deleted. Callers
//! serialize `intern` through the namespace write lock; lookups only need
//! the read half.

use crate::{NodeId, Term};
use rustc_hash::FxHashMap;

/// Bidirectional `Term ↔ NodeId` mapping for one namespace.
///
/// Forward lookups go through a hash map; reverse lookups index a dense
/// table (id 1 lives at slot 0). The mapping is bijective: interning the
/// same term twice returns the same id.
#[derive(Debug, Default)]
pub struct Dictionary {
    /// Term to id
    forward: FxHashMap<Term, NodeId>,

    /// Id to term; slot `i` holds the term for id `i + 1`
    reverse: Vec<Term>,
}

impl Dictionary {
    /// Create a new empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a term, returning its existing id or allocating the next.
    ///
    /// Idempotent: the same term always maps to the same id.
    pub fn intern(&mut self, term: &Term) -> NodeId {
        if let Some(id) = self.forward.get(term) {
            return *id;
        }
        let id = NodeId::new(self.reverse.len() as u64 + 1);
        self.forward.insert(term.clone(), id);
        self.reverse.push(term.clone());
        id
    }

    /// Restore a mapping read back from the dictionary log.
    ///
    /// Ids in the log are dense and replayed in allocation order; a gap or
    /// an id collision means the log is corrupt.
    pub fn restore(&mut self, id: NodeId, term: Term) -> bool {
        if id.as_u64() != self.reverse.len() as u64 + 1 {
            return false;
        }
        self.forward.insert(term.clone(), id);
        self.reverse.push(term);
        true
    }

    /// Non-allocating lookup
    pub fn find(&self, term: &Term) -> Option<NodeId> {
        self.forward.get(term).copied()
    }

    /// Reverse lookup
    pub fn resolve(&self, id: NodeId) -> Option<&Term> {
        if !id.is_valid() {
            return None;
        }
        self.reverse.get(id.as_u64() as usize - 1)
    }

    /// Convenience: find the id of an IRI given as a string
    pub fn find_iri(&self, iri: &str) -> Option<NodeId> {
        self.find(&Term::iri(iri))
    }

    /// Number of interned terms
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    /// Check if the dictionary is empty
    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Iterate over `(id, term)` pairs in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Term)> {
        self.reverse
            .iter()
            .enumerate()
            .map(|(i, t)| (NodeId::new(i as u64 + 1), t))
    }

    /// Approximate memory used by the stored terms, in bytes
    pub fn memory_usage(&self) -> usize {
        self.reverse
            .iter()
            .map(|t| match t {
                Term::Iri(s) | Term::BlankNode(s) => s.len(),
                Term::Literal(lit) => {
                    lit.lexical.len()
                        + lit.datatype.as_ref().map_or(0, |d| d.len())
                        + lit.language.as_ref().map_or(0, |l| l.len())
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_same_term() {
        let mut dict = Dictionary::new();
        let a = dict.intern(&Term::iri("http://example.org/a"));
        let b = dict.intern(&Term::iri("http://example.org/a"));
        assert_eq!(a, b);
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_intern_allocates_monotonically() {
        let mut dict = Dictionary::new();
        let a = dict.intern(&Term::iri("http://example.org/a"));
        let b = dict.intern(&Term::iri("http://example.org/b"));
        assert_eq!(a, NodeId::new(1));
        assert_eq!(b, NodeId::new(2));
    }

    #[test]
    fn test_resolve_round_trip() {
        let mut dict = Dictionary::new();
        let term = Term::literal_lang("hola", "es");
        let id = dict.intern(&term);
        assert_eq!(dict.resolve(id), Some(&term));
    }

    #[test]
    fn test_sentinel_never_resolves() {
        let mut dict = Dictionary::new();
        dict.intern(&Term::iri("http://example.org/a"));
        assert_eq!(dict.resolve(NodeId::SENTINEL), None);
    }

    #[test]
    fn test_find_does_not_allocate() {
        let dict = Dictionary::new();
        assert_eq!(dict.find(&Term::iri("http://example.org/a")), None);
        assert!(dict.is_empty());
    }

    #[test]
    fn test_memory_usage_counts_term_bytes() {
        let mut dict = Dictionary::new();
        dict.intern(&Term::iri("http://a"));
        dict.intern(&Term::literal("hello"));
        assert_eq!(dict.memory_usage(), "http://a".len() + "hello".len());
    }

    #[test]
    fn test_restore_rejects_gap() {
        let mut dict = Dictionary::new();
        assert!(dict.restore(NodeId::new(1), Term::iri("http://example.org/a")));
        assert!(!dict.restore(NodeId::new(3), Term::iri("http://example.org/c")));
        assert_eq!(dict.len(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn intern_resolve_is_identity(lexical in "[a-zA-Z0-9 ]{0,32}") {
                let mut dict = Dictionary::new();
                let term = Term::literal(lexical);
                let id = dict.intern(&term);
                prop_assert_eq!(dict.resolve(id), Some(&term));
            }

            #[test]
            fn intern_is_idempotent(iris in proptest::collection::vec("[a-z]{1,12}", 1..32)) {
                let mut dict = Dictionary::new();
                let ids: Vec<_> = iris
                    .iter()
                    .map(|s| dict.intern(&Term::iri(format!("http://example.org/{s}"))))
                    .collect();
                let again: Vec<_> = iris
                    .iter()
                    .map(|s| dict.intern(&Term::iri(format!("http://example.org/{s}"))))
                    .collect();
                prop_assert_eq!(ids, again);
            }
        }
    }
}
