//! The engine facade
//!
//! One `SemanticEngine` value is shared by reference across every
//! transport handler; there is no process-wide mutable state. The write
//! path follows the store protocol: intern, probe, insert, append
//! provenance, then hand literal objects and fresh IRIs to the embedding
//! pool.

use crate::namespace::{Namespace, NamespaceManager};
use crate::{EngineConfig, EngineError, EngineResult};
use rdf_model::{Dictionary, NodeId, Term, TermPosition, TripleId};
use reasoning::{derive, PremiseRef, ReasonerConfig, ReasonerError, RuleSet, SchemaIds};
use serde::{Deserialize, Serialize};
use sparql::{ExecOptions, Executor, QueryResults};
use std::sync::Arc;
use std::time::Instant;
use storage::{IdTriple, Provenance, TriplePattern, TripleStore};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use vector_index::{Embedder, SearchHit, VectorKind, VectorPayload};

/// Predicate linking a source node to an ingested text observation
pub const OBSERVATION_PREDICATE: &str = "urn:graphmind:observation";

/// Per-hop score decay during graph expansion
const EXPANSION_DECAY: f32 = 0.7;

/// One triple in the tool-facing string shape
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TripleInput {
    /// Subject IRI (or `_:label` blank node)
    pub subject: String,
    /// Predicate IRI
    pub predicate: String,
    /// Object: IRI-shaped strings become IRIs, everything else a literal
    pub object: String,
    /// Optional source attribution
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub provenance: Option<String>,
}

/// Ingest outcome
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Dictionary entries allocated
    pub nodes_added: usize,
    /// Quads stored
    pub edges_added: usize,
}

/// Traversal direction for neighbor queries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow subject → object edges
    Outgoing,
    /// Follow object → subject edges
    Incoming,
    /// Both directions
    Both,
}

impl std::str::FromStr for Direction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "outgoing" => Ok(Direction::Outgoing),
            "incoming" => Ok(Direction::Incoming),
            "both" => Ok(Direction::Both),
            other => Err(EngineError::Validation(format!(
                "bad direction: {other:?}"
            ))),
        }
    }
}

/// One neighbor entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeighborEntry {
    /// Neighbor node id
    pub node_id: u64,
    /// Neighbor IRI or lexical form
    pub uri: String,
    /// Connecting predicate IRI
    pub edge_type: String,
    /// `outgoing` or `incoming` relative to the queried node
    pub direction: Direction,
}

/// Node reference accepted by neighbor/resolve operations
#[derive(Clone, Debug)]
pub enum NodeRef {
    /// By IRI
    Uri(String),
    /// By dictionary id
    Id(u64),
}

/// Hybrid search composition mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Vector seeds only
    VectorOnly,
    /// Graph-expanded nodes only
    GraphOnly,
    /// Seeds plus expansion (default)
    Hybrid,
}

impl std::str::FromStr for SearchMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vector_only" | "vector" => Ok(SearchMode::VectorOnly),
            "graph_only" | "graph" => Ok(SearchMode::GraphOnly),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(EngineError::Validation(format!("bad mode: {other:?}"))),
        }
    }
}

/// Hybrid search parameters
#[derive(Clone, Copy, Debug)]
pub struct HybridParams {
    /// Vector stage fan-out
    pub k: usize,
    /// Expansion hops through SPO
    pub graph_depth: usize,
    /// Composition mode
    pub mode: SearchMode,
}

impl Default for HybridParams {
    fn default() -> Self {
        Self {
            k: 5,
            graph_depth: 1,
            mode: SearchMode::Hybrid,
        }
    }
}

/// One hybrid search result
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    /// IRI or lexical form of the node
    pub uri: String,
    /// Composite score in [0, 1]
    pub score: f32,
    /// Snippet or literal content, when available
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
}

/// Reasoning outcome
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReasoningReport {
    /// Novel quads derived this run
    pub triples_inferred: usize,
    /// Fixpoint rounds executed
    pub rounds: usize,
    /// The derived triples, returned instead of stored when
    /// materialization was off
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inferred: Option<Vec<(Term, Term, Term)>>,
}

/// The multi-tenant semantic engine
pub struct SemanticEngine {
    config: EngineConfig,
    namespaces: NamespaceManager,
    embedder: Arc<Embedder>,
    embed_permits: Arc<Semaphore>,
    reasoner_permits: Arc<Semaphore>,
}

impl SemanticEngine {
    /// Open the engine: load persisted namespaces, pick the embedder
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        let namespaces = NamespaceManager::open(&config)?;
        let embedder = Arc::new(Embedder::from_config(
            config.embedder_url.clone(),
            config.embedding_dim,
            config.embed_rate_per_sec,
        ));
        let embed_permits = Arc::new(Semaphore::new(config.embed_queue.max(1)));
        let reasoner_permits = Arc::new(Semaphore::new(config.reasoner_workers.max(1)));
        Ok(Self {
            config,
            namespaces,
            embedder,
            embed_permits,
            reasoner_permits,
        })
    }

    /// In-memory engine for tests and ephemeral runs
    pub fn in_memory() -> Self {
        Self::open(EngineConfig::in_memory()).expect("in-memory engine cannot fail to open")
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Namespace descriptors
    pub fn namespaces(&self) -> Vec<crate::NamespaceInfo> {
        self.namespaces.list()
    }

    /// Flush all namespaces (shutdown, checkpoint)
    pub fn flush(&self) -> EngineResult<()> {
        self.namespaces.flush_all()
    }

    /// Compact every namespace's logs, dropping tombstoned rows
    pub fn compact(&self) -> EngineResult<()> {
        self.namespaces.compact_all()
    }

    // --- write path -------------------------------------------------------

    /// Ingest a batch of triples into a namespace.
    ///
    /// All-or-nothing: the whole batch is validated before any write.
    /// Literal objects and newly seen IRIs are embedded before the call
    /// returns; the embedding pool's token bucket is what bounds the
    /// rate.
    pub async fn ingest_triples(
        &self,
        namespace: &str,
        triples: Vec<TripleInput>,
        cancel: &CancellationToken,
    ) -> EngineResult<IngestReport> {
        let parsed = triples
            .iter()
            .map(|input| {
                (
                    node_term(&input.subject),
                    Term::iri(input.predicate.clone()),
                    object_term(&input.object),
                    input.provenance.clone(),
                )
            })
            .collect();
        self.ingest_parsed(namespace, parsed, "ingest_triples", cancel)
            .await
    }

    /// Ingest already-parsed terms (CLI file loading, internal callers)
    pub async fn ingest_terms(
        &self,
        namespace: &str,
        triples: Vec<(Term, Term, Term)>,
        source: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<IngestReport> {
        let parsed = triples
            .into_iter()
            .map(|(s, p, o)| (s, p, o, Some(source.to_string())))
            .collect();
        self.ingest_parsed(namespace, parsed, "ingest_file", cancel)
            .await
    }

    async fn ingest_parsed(
        &self,
        namespace: &str,
        triples: Vec<(Term, Term, Term, Option<String>)>,
        method: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<IngestReport> {
        if triples.is_empty() {
            return Err(EngineError::Validation("empty triple batch".to_string()));
        }

        // validate the full batch up front
        let mut parsed = Vec::with_capacity(triples.len());
        for (subject, predicate, object, provenance) in triples {
            subject.validate_for_position(TermPosition::Subject)?;
            predicate.validate_for_position(TermPosition::Predicate)?;
            object.validate_for_position(TermPosition::Object)?;
            parsed.push((subject, predicate, object, provenance));
        }

        let ns = self.namespaces.get_or_create(namespace)?;
        let mut report = IngestReport::default();
        let mut to_embed: Vec<(NodeId, Term)> = Vec::new();

        {
            let mut graph = ns.graph.write();
            if graph.store.len() + parsed.len() > self.config.quotas.max_triples {
                return Err(EngineError::QuotaExceeded(format!(
                    "namespace {namespace} triple quota ({})",
                    self.config.quotas.max_triples
                )));
            }

            // one lock cycle: intern everything, then a single batch insert
            let mut batch = Vec::with_capacity(parsed.len());
            let mut candidates: Vec<(NodeId, Term)> = Vec::new();
            for (subject, predicate, object, provenance) in parsed {
                let dict_before = graph.dictionary.len();
                let s = graph.intern(&subject)?;
                let p = graph.intern(&predicate)?;
                let o = graph.intern(&object)?;
                let new_nodes = graph.dictionary.len() - dict_before;
                report.nodes_added += new_nodes;

                if object.is_literal() {
                    candidates.push((o, object.clone()));
                }
                if new_nodes > 0 {
                    for (id, term) in [(s, &subject), (o, &object)] {
                        if term.is_iri() {
                            candidates.push((id, term.clone()));
                        }
                    }
                }

                let source = provenance.unwrap_or_else(|| "api".to_string());
                batch.push((IdTriple::new(s, p, o), Provenance::ingested(source, method)));
            }

            let outcome = graph.insert_batch(batch)?;
            report.edges_added = outcome.added.len();
            if report.edges_added > 0 {
                let added: rustc_hash::FxHashSet<NodeId> = outcome
                    .added
                    .iter()
                    .flat_map(|(_, t)| [t.s, t.p, t.o])
                    .collect();
                to_embed = candidates
                    .into_iter()
                    .filter(|(id, _)| added.contains(id))
                    .collect();
            }
        }

        let deadline = tokio::time::Instant::now() + self.config.timeouts.ingest;
        tokio::time::timeout_at(deadline, self.embed_nodes(&ns, to_embed, cancel))
            .await
            .map_err(|_| EngineError::Timeout("ingest".to_string()))??;

        tracing::debug!(
            namespace,
            nodes = report.nodes_added,
            edges = report.edges_added,
            "ingest complete"
        );
        Ok(report)
    }

    /// Ingest free text as sentence-level observations.
    ///
    /// Deterministic splitting only; each sentence becomes a literal
    /// object of the source node and is embedded for hybrid search.
    pub async fn ingest_text(
        &self,
        namespace: &str,
        text: &str,
        source: Option<String>,
        cancel: &CancellationToken,
    ) -> EngineResult<IngestReport> {
        let sentences: Vec<&str> = text
            .split(['.', '!', '?', '\n'])
            .map(str::trim)
            .filter(|s| s.len() >= 3)
            .collect();
        if sentences.is_empty() {
            return Err(EngineError::Validation(
                "no ingestible sentences in text".to_string(),
            ));
        }

        let source = source.unwrap_or_else(|| "conversation".to_string());
        let subject = format!(
            "urn:graphmind:source:{}",
            source.replace(|c: char| !c.is_ascii_alphanumeric() && c != '-', "_")
        );
        let triples = sentences
            .iter()
            .map(|sentence| TripleInput {
                subject: subject.clone(),
                predicate: OBSERVATION_PREDICATE.to_string(),
                object: (*sentence).to_string(),
                provenance: Some(source.clone()),
            })
            .collect();
        self.ingest_triples(namespace, triples, cancel).await
    }

    async fn embed_nodes(
        &self,
        ns: &Arc<Namespace>,
        nodes: Vec<(NodeId, Term)>,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        for (node_id, term) in nodes {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            if ns.vectors.len() >= self.config.quotas.max_vectors {
                return Err(EngineError::QuotaExceeded(format!(
                    "namespace {} vector quota ({})",
                    ns.name, self.config.quotas.max_vectors
                )));
            }
            let _permit = self
                .embed_permits
                .acquire()
                .await
                .map_err(|_| EngineError::Fatal("embedding pool closed".to_string()))?;

            let (text, payload) = match &term {
                Term::Literal(lit) => (
                    lit.lexical.clone(),
                    VectorPayload {
                        uri: lit.lexical.clone(),
                        snippet: Some(lit.lexical.clone()),
                        kind: VectorKind::Literal,
                    },
                ),
                other => (
                    other.value().to_string(),
                    VectorPayload {
                        uri: other.value().to_string(),
                        snippet: None,
                        kind: VectorKind::Iri,
                    },
                ),
            };
            let vector = self.embedder.embed(&text).await?;
            ns.vectors.upsert(node_id, vector, payload)?;
        }
        Ok(())
    }

    /// Delete one quad (given in the tool string shape), cascading to
    /// everything inferred from it
    pub fn delete_triple(
        &self,
        namespace: &str,
        input: &TripleInput,
    ) -> EngineResult<usize> {
        let ns = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| EngineError::NotFound(format!("namespace {namespace}")))?;
        let mut graph = ns.graph.write();

        let subject = node_term(&input.subject);
        let predicate = Term::iri(input.predicate.clone());
        let object = object_term(&input.object);
        let triple = {
            let dict = &graph.dictionary;
            let (Some(s), Some(p), Some(o)) = (
                dict.find(&subject),
                dict.find(&predicate),
                dict.find(&object),
            ) else {
                return Err(EngineError::NotFound(format!(
                    "triple {} {} {}",
                    input.subject, input.predicate, input.object
                )));
            };
            IdTriple::new(s, p, o)
        };
        let id = graph.store.triple_id(&triple).ok_or_else(|| {
            EngineError::NotFound(format!(
                "triple {} {} {}",
                input.subject, input.predicate, input.object
            ))
        })?;
        let removed = graph.delete(id)?;
        Ok(removed.len())
    }

    /// Destroy a namespace and everything it owns
    pub fn delete_namespace(&self, namespace: &str) -> EngineResult<bool> {
        self.namespaces.delete(namespace)
    }

    // --- read path --------------------------------------------------------

    /// List stored triples, resolved to terms
    pub fn list_triples(
        &self,
        namespace: &str,
        limit: Option<usize>,
    ) -> EngineResult<Vec<(Term, Term, Term)>> {
        let Some(ns) = self.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        let graph = ns.graph.read();
        let limit = limit.unwrap_or(100);
        let mut out = Vec::new();
        for t in graph.store.matches(TriplePattern::all()).take(limit) {
            if let (Some(s), Some(p), Some(o)) = (
                graph.dictionary.resolve(t.s),
                graph.dictionary.resolve(t.p),
                graph.dictionary.resolve(t.o),
            ) {
                out.push((s.clone(), p.clone(), o.clone()));
            }
        }
        Ok(out)
    }

    /// Number of stored triples
    pub fn count(&self, namespace: &str) -> usize {
        self.namespaces
            .get(namespace)
            .map_or(0, |ns| ns.graph.read().store.len())
    }

    /// Resolve an IRI to its node id
    pub fn resolve_id(&self, namespace: &str, uri: &str) -> EngineResult<Option<u64>> {
        let Some(ns) = self.namespaces.get(namespace) else {
            return Ok(None);
        };
        let graph = ns.graph.read();
        Ok(graph.dictionary.find_iri(uri).map(|id| id.as_u64()))
    }

    /// Neighbors of a node through the SPO/OSP indexes
    pub fn get_neighbors(
        &self,
        namespace: &str,
        node: NodeRef,
        direction: Direction,
    ) -> EngineResult<Vec<NeighborEntry>> {
        let Some(ns) = self.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        let graph = ns.graph.read();

        let node_id = match &node {
            NodeRef::Uri(uri) => graph
                .dictionary
                .find_iri(uri)
                .ok_or_else(|| EngineError::NotFound(format!("node {uri}")))?,
            NodeRef::Id(raw) => {
                let id = NodeId::new(*raw);
                if graph.dictionary.resolve(id).is_none() {
                    return Err(EngineError::NotFound(format!("node id {raw}")));
                }
                id
            }
        };

        let mut out = Vec::new();
        if direction != Direction::Incoming {
            for t in graph
                .store
                .matches(TriplePattern::new(Some(node_id), None, None))
            {
                if let (Some(edge), Some(neighbor)) =
                    (graph.dictionary.resolve(t.p), graph.dictionary.resolve(t.o))
                {
                    out.push(NeighborEntry {
                        node_id: t.o.as_u64(),
                        uri: neighbor.value().to_string(),
                        edge_type: edge.value().to_string(),
                        direction: Direction::Outgoing,
                    });
                }
            }
        }
        if direction != Direction::Outgoing {
            for t in graph
                .store
                .matches(TriplePattern::new(None, None, Some(node_id)))
            {
                if let (Some(edge), Some(neighbor)) =
                    (graph.dictionary.resolve(t.p), graph.dictionary.resolve(t.s))
                {
                    out.push(NeighborEntry {
                        node_id: t.s.as_u64(),
                        uri: neighbor.value().to_string(),
                        edge_type: edge.value().to_string(),
                        direction: Direction::Incoming,
                    });
                }
            }
        }
        Ok(out)
    }

    /// Evaluate a SPARQL query under the per-query budget.
    ///
    /// A namespace that was never written behaves as an empty graph, so
    /// reads after deletion stay consistent.
    pub fn sparql(
        &self,
        namespace: &str,
        query: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<QueryResults> {
        let parsed = sparql::parse_query(query)?;
        let deadline = Instant::now() + self.config.timeouts.sparql;
        let cancelled = move || cancel.is_cancelled();
        let opts = ExecOptions {
            deadline: Some(deadline),
            cancelled: Some(&cancelled),
        };

        match self.namespaces.get(namespace) {
            Some(ns) => {
                let graph = ns.graph.read();
                Ok(Executor::new(&graph.store, &graph.dictionary).execute(&parsed, &opts)?)
            }
            None => {
                let store = TripleStore::new();
                let dictionary = Dictionary::new();
                Ok(Executor::new(&store, &dictionary).execute(&parsed, &opts)?)
            }
        }
    }

    // --- reasoning --------------------------------------------------------

    /// Run the reasoner over a namespace.
    ///
    /// With `materialize` the derived batch is written atomically with
    /// inferred provenance; premises that vanished between derivation
    /// and write drop their consequents instead of dangling.
    pub async fn apply_reasoning(
        &self,
        namespace: &str,
        rule_set: RuleSet,
        materialize: bool,
        cancel: &CancellationToken,
    ) -> EngineResult<ReasoningReport> {
        let ns = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| EngineError::NotFound(format!("namespace {namespace}")))?;
        let deadline = Instant::now() + self.config.timeouts.reasoning;
        let _worker = self
            .reasoner_permits
            .acquire()
            .await
            .map_err(|_| EngineError::Fatal("reasoner pool closed".to_string()))?;

        let schema = {
            let mut graph = ns.graph.write();
            let before = graph.dictionary.len();
            let schema = SchemaIds::intern(&mut graph.dictionary);
            graph.sync_dictionary_log(before)?;
            schema
        };

        let outcome = {
            let graph = ns.graph.read();
            let cancelled = || cancel.is_cancelled() || Instant::now() >= deadline;
            let is_literal = |id: NodeId| {
                graph
                    .dictionary
                    .resolve(id)
                    .map(Term::is_literal)
                    .unwrap_or(false)
            };
            match derive(
                &graph.store,
                &schema,
                rule_set,
                &ReasonerConfig::default(),
                is_literal,
                cancelled,
            ) {
                Ok(outcome) => outcome,
                Err(ReasonerError::Cancelled) if Instant::now() >= deadline => {
                    return Err(EngineError::Timeout("reasoning".to_string()))
                }
                Err(e) => return Err(e.into()),
            }
        };

        let mut report = ReasoningReport {
            triples_inferred: outcome.inferred.len(),
            rounds: outcome.rounds,
            inferred: None,
        };

        if !materialize {
            let graph = ns.graph.read();
            let mut preview = Vec::with_capacity(outcome.inferred.len());
            for quad in &outcome.inferred {
                if let (Some(s), Some(p), Some(o)) = (
                    graph.dictionary.resolve(quad.triple.s),
                    graph.dictionary.resolve(quad.triple.p),
                    graph.dictionary.resolve(quad.triple.o),
                ) {
                    preview.push((s.clone(), p.clone(), o.clone()));
                }
            }
            report.inferred = Some(preview);
            return Ok(report);
        }

        if !outcome.inferred.is_empty() {
            let mut graph = ns.graph.write();
            if graph.store.len() + outcome.inferred.len() > self.config.quotas.max_triples {
                return Err(EngineError::QuotaExceeded(format!(
                    "namespace {namespace} triple quota ({})",
                    self.config.quotas.max_triples
                )));
            }

            let mut materialized: Vec<Option<TripleId>> =
                Vec::with_capacity(outcome.inferred.len());
            for quad in &outcome.inferred {
                let premises: Option<Vec<TripleId>> = quad
                    .premises
                    .iter()
                    .map(|premise| match premise {
                        PremiseRef::Stored(id) => graph.store.get(*id).map(|_| *id),
                        PremiseRef::Derived(idx) => materialized[*idx],
                    })
                    .collect();
                match premises {
                    Some(premises) => {
                        let inserted = graph
                            .insert(quad.triple, Provenance::inferred(quad.rule, premises))?;
                        materialized.push(Some(inserted.id));
                    }
                    None => {
                        // a premise was retracted mid-run; drop the consequent
                        materialized.push(None);
                        report.triples_inferred -= 1;
                    }
                }
            }
        }
        *ns.reasoning_state.lock() = Some(rule_set);

        tracing::info!(
            namespace,
            rule_set = ?rule_set,
            inferred = report.triples_inferred,
            rounds = report.rounds,
            "reasoning complete"
        );
        Ok(report)
    }

    // --- hybrid search ----------------------------------------------------

    /// Vector ranking composed with graph expansion.
    ///
    /// When no query vector is supplied the configured embedder encodes
    /// the query text; seeds then BFS outward through SPO, diluting the
    /// seed score by `0.7` per hop.
    pub async fn hybrid_search(
        &self,
        namespace: &str,
        query: &str,
        query_vector: Option<Vec<f32>>,
        params: HybridParams,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<SearchResult>> {
        let Some(ns) = self.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        let deadline = tokio::time::Instant::now() + self.config.timeouts.search;

        let vector = match query_vector {
            Some(v) => v,
            None => {
                let _permit = self
                    .embed_permits
                    .acquire()
                    .await
                    .map_err(|_| EngineError::Fatal("embedding pool closed".to_string()))?;
                tokio::time::timeout_at(deadline, self.embedder.embed(query))
                    .await
                    .map_err(|_| EngineError::Timeout("hybrid_search".to_string()))??
            }
        };
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let seeds: Vec<SearchHit> = ns.vectors.search(&vector, params.k)?;

        // node_id → (score, uri, content)
        let mut merged: rustc_hash::FxHashMap<NodeId, SearchResult> =
            rustc_hash::FxHashMap::default();
        if params.mode != SearchMode::GraphOnly {
            for hit in &seeds {
                merged
                    .entry(hit.node_id)
                    .and_modify(|r| r.score = r.score.max(hit.score))
                    .or_insert_with(|| SearchResult {
                        uri: hit.payload.uri.clone(),
                        score: hit.score,
                        content: hit.payload.snippet.clone(),
                    });
            }
        }

        if params.mode != SearchMode::VectorOnly && params.graph_depth > 0 {
            let graph = ns.graph.read();
            for hit in &seeds {
                let mut frontier = vec![hit.node_id];
                let mut score = hit.score;
                for _ in 0..params.graph_depth {
                    if cancel.is_cancelled() {
                        return Err(EngineError::Cancelled);
                    }
                    score *= EXPANSION_DECAY;
                    let mut next = Vec::new();
                    for &node in &frontier {
                        for t in graph
                            .store
                            .matches(TriplePattern::new(Some(node), None, None))
                        {
                            next.push(t.o);
                            if let Some(term) = graph.dictionary.resolve(t.o) {
                                let entry = merged.entry(t.o).or_insert_with(|| SearchResult {
                                    uri: term.value().to_string(),
                                    score: 0.0,
                                    content: term
                                        .is_literal()
                                        .then(|| term.value().to_string()),
                                });
                                entry.score = entry.score.max(score);
                            }
                        }
                    }
                    frontier = next;
                    if frontier.is_empty() {
                        break;
                    }
                }
            }
        }

        let mut results: Vec<SearchResult> = merged.into_values().collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(results)
    }
}

fn node_term(s: &str) -> Term {
    match s.strip_prefix("_:") {
        Some(label) => Term::blank(label),
        None => Term::iri(s),
    }
}

fn object_term(s: &str) -> Term {
    if let Some(label) = s.strip_prefix("_:") {
        return Term::blank(label);
    }
    if s.contains("://") || s.starts_with("urn:") || s.starts_with("mailto:") {
        return Term::iri(s);
    }
    Term::literal(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_term_heuristic() {
        assert!(object_term("http://ex.org/a").is_iri());
        assert!(object_term("urn:graphmind:x").is_iri());
        assert!(object_term("_:b1").is_blank_node());
        assert!(object_term("plain text value").is_literal());
        assert!(object_term("42").is_literal());
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("both".parse::<Direction>().unwrap(), Direction::Both);
        assert_eq!(
            "OUTGOING".parse::<Direction>().unwrap(),
            Direction::Outgoing
        );
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "vector_only".parse::<SearchMode>().unwrap(),
            SearchMode::VectorOnly
        );
        assert_eq!("hybrid".parse::<SearchMode>().unwrap(), SearchMode::Hybrid);
    }
}
