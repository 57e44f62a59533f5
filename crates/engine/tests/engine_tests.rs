//! End-to-end engine scenarios: ingest, query, reasoning, search,
//! isolation, cascade retraction, and persistence.

use engine::{
    Direction, EngineConfig, EngineError, HybridParams, NodeRef, Quotas, RuleSet, SearchMode,
    SemanticEngine, TripleInput,
};
use tokio_util::sync::CancellationToken;

fn triple(s: &str, p: &str, o: &str) -> TripleInput {
    TripleInput {
        subject: s.to_string(),
        predicate: p.to_string(),
        object: o.to_string(),
        provenance: None,
    }
}

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const SUBCLASS: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
const SYMMETRIC: &str = "http://www.w3.org/2002/07/owl#SymmetricProperty";

async fn ingest(engine: &SemanticEngine, ns: &str, triples: Vec<TripleInput>) {
    engine
        .ingest_triples(ns, triples, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn round_trip_ingest_and_query() {
    let engine = SemanticEngine::in_memory();
    let report = engine
        .ingest_triples(
            "ns1",
            vec![triple("http://ex/A", "http://ex/p", "v")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(report.edges_added, 1);
    assert!(report.nodes_added >= 3);

    // list_triples sees the quad
    let listed = engine.list_triples("ns1", None).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].2.value(), "v");

    // SELECT returns the binding
    let results = engine
        .sparql(
            "ns1",
            "SELECT ?o WHERE { <http://ex/A> <http://ex/p> ?o }",
            &CancellationToken::new(),
        )
        .unwrap();
    let json = results.to_json();
    let bindings = json["results"]["bindings"].as_array().unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0]["o"]["value"], "v");

    // ASK agrees
    let ask = engine
        .sparql(
            "ns1",
            "ASK { <http://ex/A> <http://ex/p> \"v\" }",
            &CancellationToken::new(),
        )
        .unwrap();
    assert_eq!(ask.to_json()["boolean"], true);
}

#[tokio::test]
async fn duplicate_quads_are_not_stored_twice() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "ns1",
        vec![triple("http://ex/A", "http://ex/p", "http://ex/B")],
    )
    .await;
    let second = engine
        .ingest_triples(
            "ns1",
            vec![triple("http://ex/A", "http://ex/p", "http://ex/B")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(second.edges_added, 0);
    assert_eq!(engine.count("ns1"), 1);
}

#[tokio::test]
async fn symmetric_inference_feeds_neighbors() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "ns2",
        vec![
            triple("http://ex/spouse", RDF_TYPE, SYMMETRIC),
            triple("http://ex/Dave", "http://ex/spouse", "http://ex/Eve"),
        ],
    )
    .await;

    let report = engine
        .apply_reasoning("ns2", RuleSet::OwlRl, true, &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.triples_inferred >= 1);

    let neighbors = engine
        .get_neighbors(
            "ns2",
            NodeRef::Uri("http://ex/Eve".to_string()),
            Direction::Outgoing,
        )
        .unwrap();
    let spouse_edge = neighbors
        .iter()
        .find(|n| n.edge_type == "http://ex/spouse")
        .expect("inferred outgoing spouse edge");
    assert_eq!(spouse_edge.uri, "http://ex/Dave");
}

#[tokio::test]
async fn subclass_type_propagation() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "ns3",
        vec![
            triple("http://ex/Dog", SUBCLASS, "http://ex/Mammal"),
            triple("http://ex/Mammal", SUBCLASS, "http://ex/Animal"),
            triple("http://ex/Fido", RDF_TYPE, "http://ex/Dog"),
        ],
    )
    .await;

    engine
        .apply_reasoning("ns3", RuleSet::Rdfs, true, &CancellationToken::new())
        .await
        .unwrap();

    let results = engine
        .sparql(
            "ns3",
            "SELECT ?t WHERE { <http://ex/Fido> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ?t }",
            &CancellationToken::new(),
        )
        .unwrap();
    let json = results.to_json();
    let types: Vec<String> = json["results"]["bindings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["t"]["value"].as_str().unwrap().to_string())
        .collect();
    for expected in ["http://ex/Dog", "http://ex/Mammal", "http://ex/Animal"] {
        assert!(types.contains(&expected.to_string()), "missing {expected}");
    }
}

#[tokio::test]
async fn reasoning_fixpoint_is_idempotent() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "ns",
        vec![
            triple("http://ex/Dog", SUBCLASS, "http://ex/Animal"),
            triple("http://ex/Fido", RDF_TYPE, "http://ex/Dog"),
        ],
    )
    .await;

    let first = engine
        .apply_reasoning("ns", RuleSet::Rdfs, true, &CancellationToken::new())
        .await
        .unwrap();
    assert!(first.triples_inferred >= 1);

    let second = engine
        .apply_reasoning("ns", RuleSet::Rdfs, true, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.triples_inferred, 0);
}

#[tokio::test]
async fn materialize_false_returns_but_does_not_store() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "ns",
        vec![
            triple("http://ex/Dog", SUBCLASS, "http://ex/Animal"),
            triple("http://ex/Fido", RDF_TYPE, "http://ex/Dog"),
        ],
    )
    .await;
    let before = engine.count("ns");

    let report = engine
        .apply_reasoning("ns", RuleSet::Rdfs, false, &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.triples_inferred >= 1);
    assert_eq!(
        report.inferred.as_ref().map(Vec::len),
        Some(report.triples_inferred)
    );
    assert_eq!(engine.count("ns"), before);
}

#[tokio::test]
async fn namespace_isolation() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "ns_a",
        vec![triple("http://ex/A", "http://ex/p", "http://ex/B")],
    )
    .await;

    assert!(engine.list_triples("ns_b", None).unwrap().is_empty());
    let results = engine
        .sparql(
            "ns_b",
            "SELECT * WHERE { ?s ?p ?o }",
            &CancellationToken::new(),
        )
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn cascade_retraction_removes_entailments() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "ns6",
        vec![
            triple("http://ex/spouse", RDF_TYPE, SYMMETRIC),
            triple("http://ex/Dave", "http://ex/spouse", "http://ex/Eve"),
        ],
    )
    .await;
    engine
        .apply_reasoning("ns6", RuleSet::OwlRl, true, &CancellationToken::new())
        .await
        .unwrap();

    // the inferred inverse edge is visible
    let ask = engine
        .sparql(
            "ns6",
            "ASK { <http://ex/Eve> <http://ex/spouse> <http://ex/Dave> }",
            &CancellationToken::new(),
        )
        .unwrap();
    assert_eq!(ask.to_json()["boolean"], true);

    // retract the premise; the entailment must go with it
    let removed = engine
        .delete_triple(
            "ns6",
            &triple("http://ex/Dave", "http://ex/spouse", "http://ex/Eve"),
        )
        .unwrap();
    assert!(removed >= 2, "premise and entailment, got {removed}");

    let ask = engine
        .sparql(
            "ns6",
            "ASK { <http://ex/Eve> <http://ex/spouse> <http://ex/Dave> }",
            &CancellationToken::new(),
        )
        .unwrap();
    assert_eq!(ask.to_json()["boolean"], false);

    // rerunning reasoning does not resurrect it
    engine
        .apply_reasoning("ns6", RuleSet::OwlRl, true, &CancellationToken::new())
        .await
        .unwrap();
    let ask = engine
        .sparql(
            "ns6",
            "ASK { <http://ex/Eve> <http://ex/spouse> <http://ex/Dave> }",
            &CancellationToken::new(),
        )
        .unwrap();
    assert_eq!(ask.to_json()["boolean"], false);
}

#[tokio::test]
async fn text_ingestion_powers_hybrid_search() {
    let engine = SemanticEngine::in_memory();
    engine
        .ingest_text(
            "mem",
            "Rust ownership prevents data races. Paris is the capital of France.",
            Some("notes".to_string()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let hits = engine
        .hybrid_search(
            "mem",
            "Rust ownership prevents data races",
            None,
            HybridParams {
                k: 1,
                graph_depth: 0,
                mode: SearchMode::VectorOnly,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits[0].score >= 0.999, "score was {}", hits[0].score);
    assert!(hits[0]
        .content
        .as_deref()
        .unwrap_or_default()
        .contains("ownership"));
}

#[tokio::test]
async fn hybrid_search_expands_through_graph() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "kg",
        vec![
            triple("http://ex/rust", "http://ex/label", "rust language"),
            triple("http://ex/rust", "http://ex/creator", "http://ex/graydon"),
        ],
    )
    .await;

    let hits = engine
        .hybrid_search(
            "kg",
            "rust language",
            None,
            HybridParams {
                k: 3,
                graph_depth: 1,
                mode: SearchMode::Hybrid,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // the seed literal ranks first; the graph brings in the subject's
    // other neighborhood at a diluted score
    assert!(hits.len() >= 2);
    assert!(hits[0].score >= hits[hits.len() - 1].score);
    assert!(hits.iter().any(|h| h.uri == "http://ex/graydon"));
}

#[tokio::test]
async fn deleted_namespace_reads_as_empty() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "gone",
        vec![triple("http://ex/A", "http://ex/p", "http://ex/B")],
    )
    .await;
    assert!(engine.delete_namespace("gone").unwrap());

    assert_eq!(engine.count("gone"), 0);
    assert!(engine.list_triples("gone", None).unwrap().is_empty());
    let results = engine
        .sparql(
            "gone",
            "SELECT * WHERE { ?s ?p ?o }",
            &CancellationToken::new(),
        )
        .unwrap();
    assert!(results.is_empty());
    assert!(matches!(
        engine
            .apply_reasoning("gone", RuleSet::Rdfs, true, &CancellationToken::new())
            .await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn triple_quota_is_enforced() {
    let config = EngineConfig {
        quotas: Quotas {
            max_triples: 2,
            max_vectors: 100,
        },
        ..EngineConfig::in_memory()
    };
    let engine = SemanticEngine::open(config).unwrap();
    ingest(
        &engine,
        "small",
        vec![
            triple("http://ex/a", "http://ex/p", "http://ex/b"),
            triple("http://ex/b", "http://ex/p", "http://ex/c"),
        ],
    )
    .await;

    let err = engine
        .ingest_triples(
            "small",
            vec![triple("http://ex/c", "http://ex/p", "http://ex/d")],
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded(_)));
    assert_eq!(engine.count("small"), 2);
}

#[tokio::test]
async fn malformed_input_is_rejected_atomically() {
    let engine = SemanticEngine::in_memory();
    let err = engine
        .ingest_triples(
            "ns",
            vec![
                triple("http://ex/ok", "http://ex/p", "v"),
                triple("http://ex/bad", "not an iri", "v"),
            ],
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    // nothing from the batch landed
    assert_eq!(engine.count("ns"), 0);
}

#[tokio::test]
async fn neighbors_respect_direction() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "dir",
        vec![
            triple("http://ex/a", "http://ex/p", "http://ex/b"),
            triple("http://ex/c", "http://ex/q", "http://ex/a"),
        ],
    )
    .await;

    let outgoing = engine
        .get_neighbors(
            "dir",
            NodeRef::Uri("http://ex/a".to_string()),
            Direction::Outgoing,
        )
        .unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].uri, "http://ex/b");

    let incoming = engine
        .get_neighbors(
            "dir",
            NodeRef::Uri("http://ex/a".to_string()),
            Direction::Incoming,
        )
        .unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].uri, "http://ex/c");

    let both = engine
        .get_neighbors(
            "dir",
            NodeRef::Uri("http://ex/a".to_string()),
            Direction::Both,
        )
        .unwrap();
    assert_eq!(both.len(), 2);

    assert!(matches!(
        engine.get_neighbors(
            "dir",
            NodeRef::Uri("http://ex/unknown".to_string()),
            Direction::Both
        ),
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn persistence_across_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        data_dir: Some(tmp.path().to_path_buf()),
        ..EngineConfig::in_memory()
    };

    {
        let engine = SemanticEngine::open(config.clone()).unwrap();
        ingest(
            &engine,
            "durable",
            vec![triple("http://ex/A", "http://ex/p", "stored value")],
        )
        .await;
        engine.flush().unwrap();
    }

    let engine = SemanticEngine::open(config).unwrap();
    assert_eq!(engine.count("durable"), 1);
    let results = engine
        .sparql(
            "durable",
            "SELECT ?o WHERE { <http://ex/A> <http://ex/p> ?o }",
            &CancellationToken::new(),
        )
        .unwrap();
    assert_eq!(
        results.to_json()["results"]["bindings"][0]["o"]["value"],
        "stored value"
    );

    // vectors replayed too: the literal is findable again
    let hits = engine
        .hybrid_search(
            "durable",
            "stored value",
            None,
            HybridParams {
                k: 1,
                graph_depth: 0,
                mode: SearchMode::VectorOnly,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits[0].score >= 0.999);
}

#[tokio::test]
async fn resolve_id_round_trip() {
    let engine = SemanticEngine::in_memory();
    ingest(
        &engine,
        "ids",
        vec![triple("http://ex/A", "http://ex/p", "http://ex/B")],
    )
    .await;

    let id = engine.resolve_id("ids", "http://ex/A").unwrap().unwrap();
    let neighbors = engine
        .get_neighbors("ids", NodeRef::Id(id), Direction::Outgoing)
        .unwrap();
    assert_eq!(neighbors.len(), 1);
    assert!(engine.resolve_id("ids", "http://ex/missing").unwrap().is_none());
}
