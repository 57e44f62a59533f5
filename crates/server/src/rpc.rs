//! Binary RPC transport over TCP
//!
//! Length-delimited frames with bincode bodies. Each connection is one
//! task; each frame is one request, answered by one response frame,
//! except `StreamTriples`, which answers with a run of batch frames
//! ending in `done: true`.

use crate::wire::{self, RequestEnvelope, RpcRequest, RpcResponse, WireTriple};
use engine::{
    AuthTokens, Direction, EngineError, HybridParams, NodeRef, RuleSet, SearchMode,
    SemanticEngine,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::bytes::Bytes;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

/// The TCP RPC server
pub struct RpcServer {
    engine: Arc<SemanticEngine>,
    auth: Option<AuthTokens>,
    port: u16,
}

impl RpcServer {
    /// Create the server over a shared engine
    pub fn new(engine: Arc<SemanticEngine>, auth: Option<AuthTokens>, port: u16) -> Self {
        if auth.is_none() {
            tracing::warn!("AUTH_TOKENS not configured, rpc transport accepts all requests");
        }
        Self { engine, auth, port }
    }

    /// Accept connections until the token fires
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.port)).await?;
        tracing::info!(port = self.port, "rpc transport listening");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    tracing::debug!(%peer, "rpc connection accepted");
                    let engine = Arc::clone(&self.engine);
                    let auth = self.auth.clone();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(engine, auth, stream, shutdown).await {
                            tracing::debug!(error = %e, "rpc connection closed with error");
                        }
                    });
                }
            }
        }
    }
}

async fn handle_connection(
    engine: Arc<SemanticEngine>,
    auth: Option<AuthTokens>,
    stream: TcpStream,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            frame = framed.next() => match frame {
                Some(frame) => frame?,
                None => return Ok(()),
            },
        };

        let envelope: RequestEnvelope = match wire::decode(&frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                let response = RpcResponse::Error {
                    kind: "validation".to_string(),
                    message: format!("bad frame: {e}"),
                };
                framed.send(Bytes::from(wire::encode(&response)?)).await?;
                continue;
            }
        };

        if let Some(auth) = &auth {
            if let Err(err) =
                auth.authorize(envelope.bearer_token(), envelope.request.namespace())
            {
                framed
                    .send(Bytes::from(wire::encode(&RpcResponse::from_error(&err))?))
                    .await?;
                continue;
            }
        }

        for response in dispatch(&engine, envelope.request).await {
            framed.send(Bytes::from(wire::encode(&response)?)).await?;
        }
    }
}

/// Execute one request; most return a single response frame
pub async fn dispatch(engine: &SemanticEngine, request: RpcRequest) -> Vec<RpcResponse> {
    match execute(engine, request).await {
        Ok(responses) => responses,
        Err(err) => vec![RpcResponse::from_error(&err)],
    }
}

async fn execute(
    engine: &SemanticEngine,
    request: RpcRequest,
) -> Result<Vec<RpcResponse>, EngineError> {
    let cancel = CancellationToken::new();
    match request {
        RpcRequest::IngestTriples { namespace, triples } => {
            let report = engine.ingest_triples(&namespace, triples, &cancel).await?;
            Ok(vec![RpcResponse::Ingested {
                nodes_added: report.nodes_added as u64,
                edges_added: report.edges_added as u64,
            }])
        }
        RpcRequest::IngestText {
            namespace,
            text,
            source,
        } => {
            let report = engine.ingest_text(&namespace, &text, source, &cancel).await?;
            Ok(vec![RpcResponse::Ingested {
                nodes_added: report.nodes_added as u64,
                edges_added: report.edges_added as u64,
            }])
        }
        RpcRequest::QuerySparql { namespace, query } => {
            let results = engine.sparql(&namespace, &query, &cancel)?;
            Ok(vec![RpcResponse::Sparql {
                results_json: results.to_json().to_string(),
            }])
        }
        RpcRequest::ApplyReasoning {
            namespace,
            strategy,
            materialize,
        } => {
            let rule_set: RuleSet = strategy.parse().map_err(EngineError::Validation)?;
            let report = engine
                .apply_reasoning(&namespace, rule_set, materialize, &cancel)
                .await?;
            Ok(vec![RpcResponse::Reasoned {
                triples_inferred: report.triples_inferred as u64,
                rounds: report.rounds as u64,
            }])
        }
        RpcRequest::HybridSearch {
            namespace,
            query,
            vector_k,
            graph_depth,
            mode,
        } => {
            let mut params = HybridParams::default();
            if let Some(k) = vector_k {
                params.k = k;
            }
            if let Some(depth) = graph_depth {
                params.graph_depth = depth;
            }
            if let Some(mode) = mode {
                params.mode = mode.parse::<SearchMode>()?;
            }
            let results = engine
                .hybrid_search(&namespace, &query, None, params, &cancel)
                .await?;
            Ok(vec![RpcResponse::SearchResults { results }])
        }
        RpcRequest::GetNeighbors {
            namespace,
            uri,
            node_id,
            direction,
        } => {
            let node = match (uri, node_id) {
                (Some(uri), _) => NodeRef::Uri(uri),
                (None, Some(id)) => NodeRef::Id(id),
                (None, None) => {
                    return Err(EngineError::Validation(
                        "GetNeighbors needs uri or node_id".to_string(),
                    ))
                }
            };
            let direction = match direction {
                Some(d) => d.parse()?,
                None => Direction::Both,
            };
            let neighbors = engine.get_neighbors(&namespace, node, direction)?;
            Ok(vec![RpcResponse::Neighbors { neighbors }])
        }
        RpcRequest::ResolveId { namespace, uri } => {
            let node_id = engine.resolve_id(&namespace, &uri)?;
            Ok(vec![RpcResponse::ResolvedId { node_id }])
        }
        RpcRequest::GetAllTriples { namespace, limit } => {
            let triples = engine.list_triples(&namespace, limit)?;
            Ok(vec![RpcResponse::Triples {
                triples: triples
                    .iter()
                    .map(|(s, p, o)| WireTriple::from_terms(s, p, o))
                    .collect(),
                done: true,
            }])
        }
        RpcRequest::StreamTriples {
            namespace,
            batch_size,
        } => {
            let batch_size = (batch_size as usize).max(1);
            let triples = engine.list_triples(&namespace, Some(usize::MAX))?;
            let mut responses = Vec::new();
            let mut chunks = triples.chunks(batch_size).peekable();
            while let Some(chunk) = chunks.next() {
                responses.push(RpcResponse::Triples {
                    triples: chunk
                        .iter()
                        .map(|(s, p, o)| WireTriple::from_terms(s, p, o))
                        .collect(),
                    done: chunks.peek().is_none(),
                });
            }
            if responses.is_empty() {
                responses.push(RpcResponse::Triples {
                    triples: Vec::new(),
                    done: true,
                });
            }
            Ok(responses)
        }
        RpcRequest::DeleteTriple { namespace, triple } => {
            let removed = engine.delete_triple(&namespace, &triple)?;
            Ok(vec![RpcResponse::Deleted {
                removed: removed as u64,
            }])
        }
        RpcRequest::DeleteNamespace { namespace } => {
            let existed = engine.delete_namespace(&namespace)?;
            Ok(vec![RpcResponse::Ack {
                success: true,
                message: if existed {
                    format!("namespace {namespace} deleted")
                } else {
                    format!("namespace {namespace} did not exist")
                },
            }])
        }
    }
}
