//! Canonical SPARQL JSON results
//!
//! A small explicit writer with a fixed algebra: SELECT produces
//! `{head: {vars}, results: {bindings}}`, ASK produces
//! `{head: {}, boolean}`, CONSTRUCT a list of triples. No reflection,
//! no serializer derive on query internals.

use rdf_model::Term;
use serde_json::{json, Map, Value};

/// Evaluated query results
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResults {
    /// SELECT bindings: column names and rows of optional terms
    Bindings {
        /// Projected variable names
        vars: Vec<String>,
        /// One entry per solution; `None` marks an unbound variable
        rows: Vec<Vec<Option<Term>>>,
    },
    /// ASK result
    Boolean(bool),
    /// CONSTRUCT result
    Graph(Vec<(Term, Term, Term)>),
}

impl QueryResults {
    /// Number of solutions (rows, 0/1 for booleans, triples for graphs)
    pub fn len(&self) -> usize {
        match self {
            QueryResults::Bindings { rows, .. } => rows.len(),
            QueryResults::Boolean(b) => usize::from(*b),
            QueryResults::Graph(triples) => triples.len(),
        }
    }

    /// Check whether the result is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize to the canonical SPARQL JSON shape
    pub fn to_json(&self) -> Value {
        match self {
            QueryResults::Boolean(b) => json!({ "head": {}, "boolean": b }),
            QueryResults::Bindings { vars, rows } => {
                let bindings: Vec<Value> = rows
                    .iter()
                    .map(|row| {
                        let mut obj = Map::new();
                        for (var, term) in vars.iter().zip(row) {
                            if let Some(term) = term {
                                obj.insert(var.clone(), term_to_json(term));
                            }
                        }
                        Value::Object(obj)
                    })
                    .collect();
                json!({
                    "head": { "vars": vars },
                    "results": { "bindings": bindings }
                })
            }
            QueryResults::Graph(triples) => {
                let list: Vec<Value> = triples
                    .iter()
                    .map(|(s, p, o)| {
                        json!({
                            "subject": term_to_json(s),
                            "predicate": term_to_json(p),
                            "object": term_to_json(o),
                        })
                    })
                    .collect();
                json!({ "triples": list })
            }
        }
    }
}

fn term_to_json(term: &Term) -> Value {
    match term {
        Term::Iri(iri) => json!({ "type": "uri", "value": iri }),
        Term::BlankNode(label) => json!({ "type": "bnode", "value": label }),
        Term::Literal(lit) => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), Value::String("literal".to_string()));
            obj.insert("value".to_string(), Value::String(lit.lexical.clone()));
            if let Some(lang) = &lit.language {
                obj.insert("xml:lang".to_string(), Value::String(lang.clone()));
            } else if let Some(dt) = &lit.datatype {
                obj.insert("datatype".to_string(), Value::String(dt.clone()));
            }
            Value::Object(obj)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_json_shape() {
        let results = QueryResults::Bindings {
            vars: vec!["o".to_string()],
            rows: vec![vec![Some(Term::literal("v"))], vec![None]],
        };
        let json = results.to_json();
        assert_eq!(json["head"]["vars"][0], "o");
        assert_eq!(json["results"]["bindings"][0]["o"]["type"], "literal");
        assert_eq!(json["results"]["bindings"][0]["o"]["value"], "v");
        // unbound variables are simply absent
        assert!(json["results"]["bindings"][1]
            .as_object()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_ask_json_shape() {
        let json = QueryResults::Boolean(true).to_json();
        assert_eq!(json["boolean"], true);
        assert!(json["head"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_literal_annotations() {
        let lang = term_to_json(&Term::literal_lang("hi", "en"));
        assert_eq!(lang["xml:lang"], "en");

        let typed = term_to_json(&Term::literal_typed(
            "42",
            "http://www.w3.org/2001/XMLSchema#integer",
        ));
        assert_eq!(typed["datatype"], "http://www.w3.org/2001/XMLSchema#integer");
    }

    #[test]
    fn test_graph_json() {
        let results = QueryResults::Graph(vec![(
            Term::iri("http://ex/s"),
            Term::iri("http://ex/p"),
            Term::literal("o"),
        )]);
        let json = results.to_json();
        assert_eq!(json["triples"][0]["subject"]["type"], "uri");
        assert_eq!(json["triples"][0]["object"]["value"], "o");
    }
}
