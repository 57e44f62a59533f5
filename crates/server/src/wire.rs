//! Binary RPC message schema
//!
//! One request and one response enum cover every engine operation; the
//! transport frames them with a length prefix and bincode bodies. Every
//! request names its namespace and the envelope carries the bearer
//! token, which is all the server needs for scoping.

use engine::{NeighborEntry, SearchResult, TripleInput};
use rdf_model::Term;
use serde::{Deserialize, Serialize};

/// A request with its auth metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// `Bearer <token>`; absent means anonymous
    pub authorization: Option<String>,
    /// The operation
    pub request: RpcRequest,
}

impl RequestEnvelope {
    /// Extract the bearer token, if any
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization
            .as_deref()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
    }
}

/// Operations of the RPC service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RpcRequest {
    /// Store a triple batch
    IngestTriples {
        /// Target namespace
        namespace: String,
        /// Batch in the tool string shape
        triples: Vec<TripleInput>,
    },
    /// Store text observations
    IngestText {
        /// Target namespace
        namespace: String,
        /// Raw text, split into sentences server-side
        text: String,
        /// Source attribution
        source: Option<String>,
    },
    /// Evaluate SPARQL
    QuerySparql {
        /// Target namespace
        namespace: String,
        /// Query text
        query: String,
    },
    /// Run the reasoner
    ApplyReasoning {
        /// Target namespace
        namespace: String,
        /// `rdfs` or `owlrl`
        strategy: String,
        /// Write entailments back
        materialize: bool,
    },
    /// Vector + graph search
    HybridSearch {
        /// Target namespace
        namespace: String,
        /// Query text
        query: String,
        /// Vector stage fan-out
        vector_k: Option<usize>,
        /// Expansion hops
        graph_depth: Option<usize>,
        /// `vector_only` / `graph_only` / `hybrid`
        mode: Option<String>,
    },
    /// Graph neighbors
    GetNeighbors {
        /// Target namespace
        namespace: String,
        /// Node IRI
        uri: Option<String>,
        /// Node id (used when `uri` is absent)
        node_id: Option<u64>,
        /// `outgoing` / `incoming` / `both`
        direction: Option<String>,
    },
    /// IRI → node id
    ResolveId {
        /// Target namespace
        namespace: String,
        /// IRI to resolve
        uri: String,
    },
    /// Full dump, bounded
    GetAllTriples {
        /// Target namespace
        namespace: String,
        /// Row cap
        limit: Option<usize>,
    },
    /// Full dump, streamed in batches
    StreamTriples {
        /// Target namespace
        namespace: String,
        /// Triples per frame
        batch_size: u32,
    },
    /// Remove one quad with cascade
    DeleteTriple {
        /// Target namespace
        namespace: String,
        /// The quad in the tool string shape
        triple: TripleInput,
    },
    /// Destroy a namespace
    DeleteNamespace {
        /// Target namespace
        namespace: String,
    },
}

impl RpcRequest {
    /// The namespace this request touches (for auth scoping)
    pub fn namespace(&self) -> &str {
        match self {
            RpcRequest::IngestTriples { namespace, .. }
            | RpcRequest::IngestText { namespace, .. }
            | RpcRequest::QuerySparql { namespace, .. }
            | RpcRequest::ApplyReasoning { namespace, .. }
            | RpcRequest::HybridSearch { namespace, .. }
            | RpcRequest::GetNeighbors { namespace, .. }
            | RpcRequest::ResolveId { namespace, .. }
            | RpcRequest::GetAllTriples { namespace, .. }
            | RpcRequest::StreamTriples { namespace, .. }
            | RpcRequest::DeleteTriple { namespace, .. }
            | RpcRequest::DeleteNamespace { namespace } => namespace,
        }
    }
}

/// One triple on the wire, N-Triples formatted terms
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireTriple {
    /// Subject
    pub subject: String,
    /// Predicate
    pub predicate: String,
    /// Object
    pub object: String,
}

impl WireTriple {
    /// Format a resolved triple
    pub fn from_terms(s: &Term, p: &Term, o: &Term) -> Self {
        Self {
            subject: s.to_string(),
            predicate: p.to_string(),
            object: o.to_string(),
        }
    }
}

/// Responses of the RPC service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RpcResponse {
    /// Ingest outcome
    Ingested {
        /// Dictionary entries allocated
        nodes_added: u64,
        /// Quads stored
        edges_added: u64,
    },
    /// SPARQL results as canonical JSON text
    Sparql {
        /// `{head, results}` / `{head, boolean}` JSON
        results_json: String,
    },
    /// Reasoning outcome
    Reasoned {
        /// Novel quads derived
        triples_inferred: u64,
        /// Fixpoint rounds executed
        rounds: u64,
    },
    /// Search hits
    SearchResults {
        /// Ordered hits
        results: Vec<SearchResult>,
    },
    /// Neighbor entries
    Neighbors {
        /// Entries in both directions as requested
        neighbors: Vec<NeighborEntry>,
    },
    /// Resolved id (absent when unknown)
    ResolvedId {
        /// The node id
        node_id: Option<u64>,
    },
    /// One batch of a dump; `done` marks the final frame
    Triples {
        /// Batch content
        triples: Vec<WireTriple>,
        /// Last frame marker
        done: bool,
    },
    /// Rows removed by a delete
    Deleted {
        /// Quads removed including cascade
        removed: u64,
    },
    /// Generic acknowledgement
    Ack {
        /// Operation succeeded
        success: bool,
        /// Human-readable detail
        message: String,
    },
    /// Error with the engine's kind tag
    Error {
        /// Stable kind (`validation`, `unauthenticated`, ...)
        kind: String,
        /// Human-readable detail
        message: String,
    },
}

impl RpcResponse {
    /// Build an error response from an engine error
    pub fn from_error(err: &engine::EngineError) -> Self {
        RpcResponse::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Encode a frame body
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(value)
}

/// Decode a frame body
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, bincode::Error> {
    bincode::deserialize(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_round_trip() {
        let envelope = RequestEnvelope {
            authorization: Some("Bearer secret-token".to_string()),
            request: RpcRequest::QuerySparql {
                namespace: "ns1".to_string(),
                query: "ASK { ?s ?p ?o }".to_string(),
            },
        };
        let bytes = encode(&envelope).unwrap();
        let back: RequestEnvelope = decode(&bytes).unwrap();
        assert_eq!(back.bearer_token(), Some("secret-token"));
        assert_eq!(back.request.namespace(), "ns1");
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut envelope = RequestEnvelope {
            authorization: None,
            request: RpcRequest::DeleteNamespace {
                namespace: "x".to_string(),
            },
        };
        assert_eq!(envelope.bearer_token(), None);

        envelope.authorization = Some("Basic abc".to_string());
        assert_eq!(envelope.bearer_token(), None);

        envelope.authorization = Some("Bearer  abc ".to_string());
        assert_eq!(envelope.bearer_token(), Some("abc"));
    }

    #[test]
    fn test_response_round_trip() {
        let response = RpcResponse::Triples {
            triples: vec![WireTriple {
                subject: "<http://ex/a>".to_string(),
                predicate: "<http://ex/p>".to_string(),
                object: "\"v\"".to_string(),
            }],
            done: true,
        };
        let bytes = encode(&response).unwrap();
        let back: RpcResponse = decode(&bytes).unwrap();
        match back {
            RpcResponse::Triples { triples, done } => {
                assert!(done);
                assert_eq!(triples[0].object, "\"v\"");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
