//! Fixpoint driver
//!
//! Semi-naive forward chaining: every round joins the freshly derived
//! facts (the delta) against the full fact set, so no rule instance is
//! evaluated twice. The rule set is range-restricted and monotone, which
//! guarantees termination; the round ceiling guards against pathological
//! ontologies anyway.

use crate::rules::{Candidate, RuleIndex};
use crate::{
    InferredQuad, PremiseRef, ReasonerConfig, ReasonerError, ReasonerResult, ReasoningOutcome,
    RuleSet,
};
use rdf_model::{Dictionary, NodeId, Term, Vocabulary};
use storage::TripleStore;

/// Dictionary ids of the schema vocabulary the rules match on.
///
/// Interned once per run; `intern` allocates ids for the vocabulary terms
/// that can appear in rule consequents, so derivation never needs a
/// mutable dictionary.
#[derive(Clone, Copy, Debug)]
pub struct SchemaIds {
    /// rdf:type
    pub rdf_type: NodeId,
    /// rdfs:subClassOf
    pub subclass_of: NodeId,
    /// rdfs:subPropertyOf
    pub subproperty_of: NodeId,
    /// rdfs:domain
    pub domain: NodeId,
    /// rdfs:range
    pub range: NodeId,
    /// owl:inverseOf
    pub inverse_of: NodeId,
    /// owl:TransitiveProperty
    pub transitive_property: NodeId,
    /// owl:SymmetricProperty
    pub symmetric_property: NodeId,
    /// owl:equivalentClass
    pub equivalent_class: NodeId,
    /// owl:equivalentProperty
    pub equivalent_property: NodeId,
    /// owl:sameAs
    pub same_as: NodeId,
}

impl SchemaIds {
    /// Intern the schema vocabulary into the namespace dictionary
    pub fn intern(dict: &mut Dictionary) -> Self {
        let mut id = |iri: &str| dict.intern(&Term::iri(iri));
        Self {
            rdf_type: id(Vocabulary::RDF_TYPE),
            subclass_of: id(Vocabulary::RDFS_SUBCLASSOF),
            subproperty_of: id(Vocabulary::RDFS_SUBPROPERTYOF),
            domain: id(Vocabulary::RDFS_DOMAIN),
            range: id(Vocabulary::RDFS_RANGE),
            inverse_of: id(Vocabulary::OWL_INVERSE_OF),
            transitive_property: id(Vocabulary::OWL_TRANSITIVE_PROPERTY),
            symmetric_property: id(Vocabulary::OWL_SYMMETRIC_PROPERTY),
            equivalent_class: id(Vocabulary::OWL_EQUIVALENT_CLASS),
            equivalent_property: id(Vocabulary::OWL_EQUIVALENT_PROPERTY),
            same_as: id(Vocabulary::OWL_SAME_AS),
        }
    }
}

/// Run the fixpoint over a snapshot of the store.
///
/// `is_literal` reports whether a node id names a literal, which gates
/// rules that would otherwise put a literal in subject position.
/// `cancelled` is polled between rounds; a `true` aborts the run and
/// discards everything derived so far.
pub fn derive<F, C>(
    store: &TripleStore,
    schema: &SchemaIds,
    rule_set: RuleSet,
    config: &ReasonerConfig,
    is_literal: F,
    mut cancelled: C,
) -> ReasonerResult<ReasoningOutcome>
where
    F: Fn(NodeId) -> bool,
    C: FnMut() -> bool,
{
    let mut outcome = ReasoningOutcome::default();
    if rule_set == RuleSet::None || store.is_empty() {
        return Ok(outcome);
    }

    let mut index = RuleIndex::new(*schema, rule_set);
    let mut delta = Vec::with_capacity(store.len());
    for (id, triple) in store.iter() {
        index.register(triple, PremiseRef::Stored(id));
        delta.push(triple);
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    while !delta.is_empty() {
        outcome.rounds += 1;
        if outcome.rounds > config.max_rounds {
            return Err(ReasonerError::BudgetExceeded {
                rounds: outcome.rounds,
            });
        }
        if cancelled() {
            return Err(ReasonerError::Cancelled);
        }

        candidates.clear();
        for fact in &delta {
            index.candidates_for(*fact, &is_literal, &mut candidates);
        }

        let mut next = Vec::new();
        for candidate in candidates.drain(..) {
            if index.contains(&candidate.triple) {
                continue;
            }
            if outcome.inferred.len() >= config.max_inferred {
                return Err(ReasonerError::InferenceLimit {
                    limit: config.max_inferred,
                });
            }
            let premises = candidate
                .premises
                .iter()
                .map(|t| {
                    index
                        .premise_ref(t)
                        .expect("premise must be a registered fact")
                })
                .collect();
            index.register(candidate.triple, PremiseRef::Derived(outcome.inferred.len()));
            outcome.inferred.push(InferredQuad {
                triple: candidate.triple,
                rule: candidate.rule,
                premises,
            });
            next.push(candidate.triple);
        }

        tracing::debug!(
            round = outcome.rounds,
            novel = next.len(),
            "reasoning round complete"
        );
        delta = next;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{IdTriple, Provenance, TriplePattern};

    struct Fixture {
        dict: Dictionary,
        store: TripleStore,
        schema: SchemaIds,
    }

    impl Fixture {
        fn new() -> Self {
            let mut dict = Dictionary::new();
            let schema = SchemaIds::intern(&mut dict);
            Self {
                dict,
                store: TripleStore::new(),
                schema,
            }
        }

        fn id(&mut self, iri: &str) -> NodeId {
            self.dict.intern(&Term::iri(iri))
        }

        fn fact(&mut self, s: &str, p: &str, o: &str) {
            let t = IdTriple::new(self.id(s), self.id(p), self.id(o));
            self.store.insert(t, Provenance::ingested("test", "unit"));
        }

        fn run(&self, rule_set: RuleSet) -> ReasoningOutcome {
            derive(
                &self.store,
                &self.schema,
                rule_set,
                &ReasonerConfig::default(),
                |id| {
                    self.dict
                        .resolve(id)
                        .map(|t| t.is_literal())
                        .unwrap_or(false)
                },
                || false,
            )
            .unwrap()
        }

        fn contains(&self, outcome: &ReasoningOutcome, s: &str, p: &str, o: &str) -> bool {
            let t = IdTriple::new(
                self.dict.find_iri(s).unwrap(),
                self.dict.find_iri(p).unwrap(),
                self.dict.find_iri(o).unwrap(),
            );
            outcome.inferred.iter().any(|q| q.triple == t)
        }
    }

    const EX: &str = "http://ex.org/";

    #[test]
    fn test_subclass_transitivity_and_type_propagation() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}Dog"),
            Vocabulary::RDFS_SUBCLASSOF,
            &format!("{EX}Mammal"),
        );
        fx.fact(
            &format!("{EX}Mammal"),
            Vocabulary::RDFS_SUBCLASSOF,
            &format!("{EX}Animal"),
        );
        fx.fact(&format!("{EX}Fido"), Vocabulary::RDF_TYPE, &format!("{EX}Dog"));

        let outcome = fx.run(RuleSet::Rdfs);
        assert!(fx.contains(
            &outcome,
            &format!("{EX}Dog"),
            Vocabulary::RDFS_SUBCLASSOF,
            &format!("{EX}Animal")
        ));
        assert!(fx.contains(
            &outcome,
            &format!("{EX}Fido"),
            Vocabulary::RDF_TYPE,
            &format!("{EX}Mammal")
        ));
        assert!(fx.contains(
            &outcome,
            &format!("{EX}Fido"),
            Vocabulary::RDF_TYPE,
            &format!("{EX}Animal")
        ));
    }

    #[test]
    fn test_domain_and_range() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}hasPet"),
            Vocabulary::RDFS_DOMAIN,
            &format!("{EX}Person"),
        );
        fx.fact(
            &format!("{EX}hasPet"),
            Vocabulary::RDFS_RANGE,
            &format!("{EX}Animal"),
        );
        fx.fact(&format!("{EX}alice"), &format!("{EX}hasPet"), &format!("{EX}rex"));

        let outcome = fx.run(RuleSet::Rdfs);
        assert!(fx.contains(
            &outcome,
            &format!("{EX}alice"),
            Vocabulary::RDF_TYPE,
            &format!("{EX}Person")
        ));
        assert!(fx.contains(
            &outcome,
            &format!("{EX}rex"),
            Vocabulary::RDF_TYPE,
            &format!("{EX}Animal")
        ));
    }

    #[test]
    fn test_range_skips_literal_objects() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}name"),
            Vocabulary::RDFS_RANGE,
            &format!("{EX}Name"),
        );
        let s = fx.id(&format!("{EX}alice"));
        let p = fx.id(&format!("{EX}name"));
        let lit = fx.dict.intern(&Term::literal("Alice"));
        fx.store.insert(
            IdTriple::new(s, p, lit),
            Provenance::ingested("test", "unit"),
        );

        let outcome = fx.run(RuleSet::Rdfs);
        assert!(outcome
            .inferred
            .iter()
            .all(|q| q.triple.s != lit));
    }

    #[test]
    fn test_symmetric_property() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}spouse"),
            Vocabulary::RDF_TYPE,
            Vocabulary::OWL_SYMMETRIC_PROPERTY,
        );
        fx.fact(&format!("{EX}Dave"), &format!("{EX}spouse"), &format!("{EX}Eve"));

        let outcome = fx.run(RuleSet::OwlRl);
        assert!(fx.contains(
            &outcome,
            &format!("{EX}Eve"),
            &format!("{EX}spouse"),
            &format!("{EX}Dave")
        ));
        // premises point at both the schema fact and the edge
        let derived = outcome
            .inferred
            .iter()
            .find(|q| q.rule == "prp-symp")
            .unwrap();
        assert_eq!(derived.premises.len(), 2);
    }

    #[test]
    fn test_rdfs_does_not_apply_owl_rules() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}spouse"),
            Vocabulary::RDF_TYPE,
            Vocabulary::OWL_SYMMETRIC_PROPERTY,
        );
        fx.fact(&format!("{EX}Dave"), &format!("{EX}spouse"), &format!("{EX}Eve"));

        let outcome = fx.run(RuleSet::Rdfs);
        assert!(!fx.contains(
            &outcome,
            &format!("{EX}Eve"),
            &format!("{EX}spouse"),
            &format!("{EX}Dave")
        ));
    }

    #[test]
    fn test_transitive_property() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}ancestor"),
            Vocabulary::RDF_TYPE,
            Vocabulary::OWL_TRANSITIVE_PROPERTY,
        );
        fx.fact(&format!("{EX}a"), &format!("{EX}ancestor"), &format!("{EX}b"));
        fx.fact(&format!("{EX}b"), &format!("{EX}ancestor"), &format!("{EX}c"));
        fx.fact(&format!("{EX}c"), &format!("{EX}ancestor"), &format!("{EX}d"));

        let outcome = fx.run(RuleSet::OwlRl);
        assert!(fx.contains(
            &outcome,
            &format!("{EX}a"),
            &format!("{EX}ancestor"),
            &format!("{EX}d")
        ));
    }

    #[test]
    fn test_inverse_of() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}hasChild"),
            Vocabulary::OWL_INVERSE_OF,
            &format!("{EX}hasParent"),
        );
        fx.fact(&format!("{EX}ann"), &format!("{EX}hasChild"), &format!("{EX}bob"));

        let outcome = fx.run(RuleSet::OwlRl);
        assert!(fx.contains(
            &outcome,
            &format!("{EX}bob"),
            &format!("{EX}hasParent"),
            &format!("{EX}ann")
        ));
    }

    #[test]
    fn test_equivalent_class_feeds_subclass_rules() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}Human"),
            Vocabulary::OWL_EQUIVALENT_CLASS,
            &format!("{EX}Person"),
        );
        fx.fact(&format!("{EX}sam"), Vocabulary::RDF_TYPE, &format!("{EX}Human"));

        let outcome = fx.run(RuleSet::OwlRl);
        assert!(fx.contains(
            &outcome,
            &format!("{EX}sam"),
            Vocabulary::RDF_TYPE,
            &format!("{EX}Person")
        ));
    }

    #[test]
    fn test_same_as_propagation() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}clark"),
            Vocabulary::OWL_SAME_AS,
            &format!("{EX}superman"),
        );
        fx.fact(
            &format!("{EX}clark"),
            &format!("{EX}worksAt"),
            &format!("{EX}DailyPlanet"),
        );

        let outcome = fx.run(RuleSet::OwlRl);
        assert!(fx.contains(
            &outcome,
            &format!("{EX}superman"),
            Vocabulary::OWL_SAME_AS,
            &format!("{EX}clark")
        ));
        assert!(fx.contains(
            &outcome,
            &format!("{EX}superman"),
            &format!("{EX}worksAt"),
            &format!("{EX}DailyPlanet")
        ));
    }

    #[test]
    fn test_fixpoint_is_idempotent() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}Dog"),
            Vocabulary::RDFS_SUBCLASSOF,
            &format!("{EX}Animal"),
        );
        fx.fact(&format!("{EX}Fido"), Vocabulary::RDF_TYPE, &format!("{EX}Dog"));

        let first = fx.run(RuleSet::Rdfs);
        assert!(!first.inferred.is_empty());

        // materialize everything, then run again
        for quad in &first.inferred {
            fx.store
                .insert(quad.triple, Provenance::inferred(quad.rule, vec![]));
        }
        let second = fx.run(RuleSet::Rdfs);
        assert_eq!(second.inferred.len(), 0);
    }

    #[test]
    fn test_round_ceiling() {
        let mut fx = Fixture::new();
        // long subclass chain forces one round per level
        for i in 0..12 {
            fx.fact(
                &format!("{EX}C{i}"),
                Vocabulary::RDFS_SUBCLASSOF,
                &format!("{EX}C{}", i + 1),
            );
        }
        let config = ReasonerConfig {
            max_rounds: 2,
            ..Default::default()
        };
        let err = derive(
            &fx.store,
            &fx.schema,
            RuleSet::Rdfs,
            &config,
            |_| false,
            || false,
        )
        .unwrap_err();
        assert!(matches!(err, ReasonerError::BudgetExceeded { .. }));
    }

    #[test]
    fn test_cancellation_between_rounds() {
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}Dog"),
            Vocabulary::RDFS_SUBCLASSOF,
            &format!("{EX}Animal"),
        );
        let err = derive(
            &fx.store,
            &fx.schema,
            RuleSet::Rdfs,
            &ReasonerConfig::default(),
            |_| false,
            || true,
        )
        .unwrap_err();
        assert!(matches!(err, ReasonerError::Cancelled));
    }

    #[test]
    fn test_none_rule_set_is_identity() {
        let mut fx = Fixture::new();
        fx.fact(&format!("{EX}a"), &format!("{EX}p"), &format!("{EX}b"));
        let outcome = fx.run(RuleSet::None);
        assert_eq!(outcome.inferred.len(), 0);
        assert_eq!(outcome.rounds, 0);
    }

    #[test]
    fn test_store_pattern_still_clean() {
        // the reasoner must not mutate the store it borrows
        let mut fx = Fixture::new();
        fx.fact(
            &format!("{EX}Dog"),
            Vocabulary::RDFS_SUBCLASSOF,
            &format!("{EX}Animal"),
        );
        let before = fx.store.len();
        let _ = fx.run(RuleSet::Rdfs);
        assert_eq!(fx.store.len(), before);
        assert_eq!(fx.store.matches(TriplePattern::all()).count(), before);
    }
}
