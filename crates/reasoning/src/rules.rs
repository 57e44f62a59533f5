//! Rule evaluation state and per-fact candidate generation
//!
//! The index keeps adjacency maps for the schema predicates and the
//! instance edges, updated as facts register. `candidates_for` joins one
//! delta fact against them and emits every consequent the active rule
//! set licenses, together with the premise facts that produced it.

use crate::engine::SchemaIds;
use crate::{PremiseRef, RuleSet};
use ahash::{AHashMap, AHashSet};
use rdf_model::NodeId;
use storage::IdTriple;

/// One rule consequent plus the facts it was derived from
pub(crate) struct Candidate {
    pub triple: IdTriple,
    pub rule: &'static str,
    pub premises: Vec<IdTriple>,
}

/// Join state for one fixpoint run
pub(crate) struct RuleIndex {
    schema: SchemaIds,
    rule_set: RuleSet,

    /// Every known fact and how to cite it as a premise
    refs: AHashMap<IdTriple, PremiseRef>,

    // schema adjacency
    sc_fwd: AHashMap<NodeId, Vec<NodeId>>,
    sc_rev: AHashMap<NodeId, Vec<NodeId>>,
    sp_fwd: AHashMap<NodeId, Vec<NodeId>>,
    sp_rev: AHashMap<NodeId, Vec<NodeId>>,
    domain: AHashMap<NodeId, Vec<NodeId>>,
    range: AHashMap<NodeId, Vec<NodeId>>,
    /// property → (inverse property, the inverseOf fact asserting it)
    inv: AHashMap<NodeId, Vec<(NodeId, IdTriple)>>,
    trans_props: AHashSet<NodeId>,
    sym_props: AHashSet<NodeId>,
    same_fwd: AHashMap<NodeId, Vec<NodeId>>,
    same_rev: AHashMap<NodeId, Vec<NodeId>>,

    // instance data
    /// class → instances
    type_of: AHashMap<NodeId, Vec<NodeId>>,
    /// predicate → subject → objects
    edge_fwd: AHashMap<NodeId, AHashMap<NodeId, Vec<NodeId>>>,
    /// predicate → object → subjects
    edge_rev: AHashMap<NodeId, AHashMap<NodeId, Vec<NodeId>>>,
    /// subject → (predicate, object)
    subj_edges: AHashMap<NodeId, Vec<(NodeId, NodeId)>>,
    /// object → (predicate, subject)
    obj_edges: AHashMap<NodeId, Vec<(NodeId, NodeId)>>,
}

impl RuleIndex {
    pub fn new(schema: SchemaIds, rule_set: RuleSet) -> Self {
        Self {
            schema,
            rule_set,
            refs: AHashMap::new(),
            sc_fwd: AHashMap::new(),
            sc_rev: AHashMap::new(),
            sp_fwd: AHashMap::new(),
            sp_rev: AHashMap::new(),
            domain: AHashMap::new(),
            range: AHashMap::new(),
            inv: AHashMap::new(),
            trans_props: AHashSet::new(),
            sym_props: AHashSet::new(),
            same_fwd: AHashMap::new(),
            same_rev: AHashMap::new(),
            type_of: AHashMap::new(),
            edge_fwd: AHashMap::new(),
            edge_rev: AHashMap::new(),
            subj_edges: AHashMap::new(),
            obj_edges: AHashMap::new(),
        }
    }

    pub fn contains(&self, triple: &IdTriple) -> bool {
        self.refs.contains_key(triple)
    }

    pub fn premise_ref(&self, triple: &IdTriple) -> Option<PremiseRef> {
        self.refs.get(triple).copied()
    }

    /// Register a fact in every join map it participates in
    pub fn register(&mut self, t: IdTriple, premise: PremiseRef) {
        if self.refs.insert(t, premise).is_some() {
            return;
        }
        let s = self.schema;
        if t.p == s.subclass_of {
            self.sc_fwd.entry(t.s).or_default().push(t.o);
            self.sc_rev.entry(t.o).or_default().push(t.s);
        } else if t.p == s.subproperty_of {
            self.sp_fwd.entry(t.s).or_default().push(t.o);
            self.sp_rev.entry(t.o).or_default().push(t.s);
        } else if t.p == s.domain {
            self.domain.entry(t.s).or_default().push(t.o);
        } else if t.p == s.range {
            self.range.entry(t.s).or_default().push(t.o);
        } else if t.p == s.inverse_of {
            self.inv.entry(t.s).or_default().push((t.o, t));
            self.inv.entry(t.o).or_default().push((t.s, t));
        } else if t.p == s.same_as {
            self.same_fwd.entry(t.s).or_default().push(t.o);
            self.same_rev.entry(t.o).or_default().push(t.s);
        } else if t.p == s.rdf_type {
            self.type_of.entry(t.o).or_default().push(t.s);
            if t.o == s.transitive_property {
                self.trans_props.insert(t.s);
            } else if t.o == s.symmetric_property {
                self.sym_props.insert(t.s);
            }
        }

        self.edge_fwd
            .entry(t.p)
            .or_default()
            .entry(t.s)
            .or_default()
            .push(t.o);
        self.edge_rev
            .entry(t.p)
            .or_default()
            .entry(t.o)
            .or_default()
            .push(t.s);
        self.subj_edges.entry(t.s).or_default().push((t.p, t.o));
        self.obj_edges.entry(t.o).or_default().push((t.p, t.s));
    }

    /// Emit every consequent of rules in which `f` participates
    pub fn candidates_for<F>(&self, f: IdTriple, is_literal: &F, out: &mut Vec<Candidate>)
    where
        F: Fn(NodeId) -> bool,
    {
        let s = self.schema;
        let owl = self.rule_set == RuleSet::OwlRl;
        let push = |out: &mut Vec<Candidate>,
                    triple: IdTriple,
                    rule: &'static str,
                    premises: Vec<IdTriple>| {
            out.push(Candidate {
                triple,
                rule,
                premises,
            });
        };

        // schema-fact side of the joins
        if f.p == s.subclass_of {
            for &c in self.sc_fwd.get(&f.o).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(f.s, s.subclass_of, c),
                    "rdfs11",
                    vec![f, IdTriple::new(f.o, s.subclass_of, c)],
                );
            }
            for &a in self.sc_rev.get(&f.s).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(a, s.subclass_of, f.o),
                    "rdfs11",
                    vec![IdTriple::new(a, s.subclass_of, f.s), f],
                );
            }
            for &x in self.type_of.get(&f.s).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(x, s.rdf_type, f.o),
                    "rdfs9",
                    vec![f, IdTriple::new(x, s.rdf_type, f.s)],
                );
            }
        } else if f.p == s.subproperty_of {
            for &r in self.sp_fwd.get(&f.o).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(f.s, s.subproperty_of, r),
                    "rdfs5",
                    vec![f, IdTriple::new(f.o, s.subproperty_of, r)],
                );
            }
            for &a in self.sp_rev.get(&f.s).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(a, s.subproperty_of, f.o),
                    "rdfs5",
                    vec![IdTriple::new(a, s.subproperty_of, f.s), f],
                );
            }
            if let Some(edges) = self.edge_fwd.get(&f.s) {
                for (&x, objects) in edges {
                    for &y in objects {
                        push(
                            out,
                            IdTriple::new(x, f.o, y),
                            "rdfs7",
                            vec![f, IdTriple::new(x, f.s, y)],
                        );
                    }
                }
            }
        } else if f.p == s.domain {
            if let Some(edges) = self.edge_fwd.get(&f.s) {
                for (&x, objects) in edges {
                    for &y in objects {
                        push(
                            out,
                            IdTriple::new(x, s.rdf_type, f.o),
                            "rdfs2",
                            vec![f, IdTriple::new(x, f.s, y)],
                        );
                    }
                }
            }
        } else if f.p == s.range {
            if let Some(edges) = self.edge_fwd.get(&f.s) {
                for (&x, objects) in edges {
                    for &y in objects {
                        if !is_literal(y) {
                            push(
                                out,
                                IdTriple::new(y, s.rdf_type, f.o),
                                "rdfs3",
                                vec![f, IdTriple::new(x, f.s, y)],
                            );
                        }
                    }
                }
            }
        } else if f.p == s.rdf_type {
            for &d in self.sc_fwd.get(&f.o).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(f.s, s.rdf_type, d),
                    "rdfs9",
                    vec![IdTriple::new(f.o, s.subclass_of, d), f],
                );
            }
            if owl && f.o == s.transitive_property {
                if let Some(edges) = self.edge_fwd.get(&f.s) {
                    for (&x, objects) in edges {
                        for &y in objects {
                            for &z in edges.get(&y).map(Vec::as_slice).unwrap_or(&[]) {
                                push(
                                    out,
                                    IdTriple::new(x, f.s, z),
                                    "prp-trp",
                                    vec![
                                        f,
                                        IdTriple::new(x, f.s, y),
                                        IdTriple::new(y, f.s, z),
                                    ],
                                );
                            }
                        }
                    }
                }
            }
            if owl && f.o == s.symmetric_property {
                if let Some(edges) = self.edge_fwd.get(&f.s) {
                    for (&x, objects) in edges {
                        for &y in objects {
                            if !is_literal(y) {
                                push(
                                    out,
                                    IdTriple::new(y, f.s, x),
                                    "prp-symp",
                                    vec![f, IdTriple::new(x, f.s, y)],
                                );
                            }
                        }
                    }
                }
            }
        } else if owl && f.p == s.inverse_of {
            for (pred, other, rule) in [(f.s, f.o, "prp-inv1"), (f.o, f.s, "prp-inv2")] {
                if let Some(edges) = self.edge_fwd.get(&pred) {
                    for (&x, objects) in edges {
                        for &y in objects {
                            if !is_literal(y) {
                                push(
                                    out,
                                    IdTriple::new(y, other, x),
                                    rule,
                                    vec![f, IdTriple::new(x, pred, y)],
                                );
                            }
                        }
                    }
                }
            }
        } else if owl && f.p == s.equivalent_class {
            push(
                out,
                IdTriple::new(f.s, s.subclass_of, f.o),
                "scm-eqc1",
                vec![f],
            );
            push(
                out,
                IdTriple::new(f.o, s.subclass_of, f.s),
                "scm-eqc2",
                vec![f],
            );
        } else if owl && f.p == s.equivalent_property {
            push(
                out,
                IdTriple::new(f.s, s.subproperty_of, f.o),
                "scm-eqp1",
                vec![f],
            );
            push(
                out,
                IdTriple::new(f.o, s.subproperty_of, f.s),
                "scm-eqp2",
                vec![f],
            );
        } else if owl && f.p == s.same_as {
            if !is_literal(f.o) {
                push(out, IdTriple::new(f.o, s.same_as, f.s), "eq-sym", vec![f]);
            }
            for &z in self.same_fwd.get(&f.o).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(f.s, s.same_as, z),
                    "eq-trans",
                    vec![f, IdTriple::new(f.o, s.same_as, z)],
                );
            }
            for &w in self.same_rev.get(&f.s).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(w, s.same_as, f.o),
                    "eq-trans",
                    vec![IdTriple::new(w, s.same_as, f.s), f],
                );
            }
            for &(p, z) in self.subj_edges.get(&f.s).into_iter().flatten() {
                if p != s.same_as {
                    push(
                        out,
                        IdTriple::new(f.o, p, z),
                        "eq-rep-s",
                        vec![f, IdTriple::new(f.s, p, z)],
                    );
                }
            }
            for &(p, w) in self.obj_edges.get(&f.s).into_iter().flatten() {
                if p != s.same_as {
                    push(
                        out,
                        IdTriple::new(w, p, f.o),
                        "eq-rep-o",
                        vec![f, IdTriple::new(w, p, f.s)],
                    );
                }
            }
        }

        // instance-fact side: f = (x, p, y) joined against the schema maps
        for &q in self.sp_fwd.get(&f.p).into_iter().flatten() {
            push(
                out,
                IdTriple::new(f.s, q, f.o),
                "rdfs7",
                vec![IdTriple::new(f.p, s.subproperty_of, q), f],
            );
        }
        for &c in self.domain.get(&f.p).into_iter().flatten() {
            push(
                out,
                IdTriple::new(f.s, s.rdf_type, c),
                "rdfs2",
                vec![IdTriple::new(f.p, s.domain, c), f],
            );
        }
        for &c in self.range.get(&f.p).into_iter().flatten() {
            if !is_literal(f.o) {
                push(
                    out,
                    IdTriple::new(f.o, s.rdf_type, c),
                    "rdfs3",
                    vec![IdTriple::new(f.p, s.range, c), f],
                );
            }
        }

        if !owl {
            return;
        }

        for &(q, premise) in self.inv.get(&f.p).into_iter().flatten() {
            if !is_literal(f.o) {
                push(out, IdTriple::new(f.o, q, f.s), "prp-inv1", vec![premise, f]);
            }
        }
        if self.sym_props.contains(&f.p) && !is_literal(f.o) {
            push(
                out,
                IdTriple::new(f.o, f.p, f.s),
                "prp-symp",
                vec![IdTriple::new(f.p, s.rdf_type, s.symmetric_property), f],
            );
        }
        if self.trans_props.contains(&f.p) {
            let schema_fact = IdTriple::new(f.p, s.rdf_type, s.transitive_property);
            if let Some(by_subject) = self.edge_fwd.get(&f.p) {
                for &z in by_subject.get(&f.o).map(Vec::as_slice).unwrap_or(&[]) {
                    push(
                        out,
                        IdTriple::new(f.s, f.p, z),
                        "prp-trp",
                        vec![schema_fact, f, IdTriple::new(f.o, f.p, z)],
                    );
                }
            }
            if let Some(by_object) = self.edge_rev.get(&f.p) {
                for &w in by_object.get(&f.s).map(Vec::as_slice).unwrap_or(&[]) {
                    push(
                        out,
                        IdTriple::new(w, f.p, f.o),
                        "prp-trp",
                        vec![schema_fact, IdTriple::new(w, f.p, f.s), f],
                    );
                }
            }
        }
        if f.p != s.same_as {
            for &x2 in self.same_fwd.get(&f.s).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(x2, f.p, f.o),
                    "eq-rep-s",
                    vec![IdTriple::new(f.s, s.same_as, x2), f],
                );
            }
            for &y2 in self.same_fwd.get(&f.o).into_iter().flatten() {
                push(
                    out,
                    IdTriple::new(f.s, f.p, y2),
                    "eq-rep-o",
                    vec![IdTriple::new(f.o, s.same_as, y2), f],
                );
            }
        }
    }
}
