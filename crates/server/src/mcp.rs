//! MCP tool transport: JSON-RPC 2.0 over line-delimited stdio
//!
//! Implements the initialize / tools/list / tools/call handshake. Each
//! tool validates its arguments, calls one engine operation, and embeds
//! the JSON result as text content. The stdio transport runs inside the
//! agent host's process boundary, so it carries no token auth; the
//! network transport does.

use engine::{
    Direction, EngineError, HybridParams, NodeRef, RuleSet, SearchMode, SemanticEngine,
    TripleInput,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// The stdio tool server
pub struct McpServer {
    engine: Arc<SemanticEngine>,
}

#[derive(Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct IngestTriplesArgs {
    namespace: String,
    triples: Vec<TripleInput>,
}

#[derive(Deserialize)]
struct IngestTextArgs {
    namespace: String,
    text: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Deserialize)]
struct ListTriplesArgs {
    namespace: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct GetNeighborsArgs {
    namespace: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    node_id: Option<u64>,
    #[serde(default)]
    direction: Option<String>,
}

#[derive(Deserialize)]
struct HybridSearchArgs {
    namespace: String,
    query: String,
    #[serde(default)]
    vector_k: Option<usize>,
    #[serde(default)]
    graph_depth: Option<usize>,
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Deserialize)]
struct SparqlArgs {
    namespace: String,
    query: String,
}

#[derive(Deserialize)]
struct ApplyReasoningArgs {
    namespace: String,
    strategy: String,
    #[serde(default = "default_true")]
    materialize: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct DeleteNamespaceArgs {
    namespace: String,
}

impl McpServer {
    /// Create the server over a shared engine
    pub fn new(engine: Arc<SemanticEngine>) -> Self {
        Self { engine }
    }

    /// Serve until stdin closes
    pub async fn run(&self) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();
        tracing::info!("mcp transport listening on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                stdout
                    .write_all(format!("{response}\n").as_bytes())
                    .await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    /// Handle one request line; `None` for notifications
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                return Some(json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": -32700, "message": format!("parse error: {e}") }
                }))
            }
        };

        // notifications get no response
        let id = request.id.clone()?;
        let result = self.handle_request(request).await;
        Some(match result {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err((code, message)) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": code, "message": message }
            }),
        })
    }

    async fn handle_request(&self, request: Request) -> Result<Value, (i64, String)> {
        match request.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "graphmind",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            })),
            "tools/list" => Ok(json!({ "tools": tool_descriptors() })),
            "tools/call" => {
                let call: ToolCall = serde_json::from_value(request.params)
                    .map_err(|e| (-32602, format!("invalid params: {e}")))?;
                Ok(self.call_tool(&call.name, call.arguments).await)
            }
            "ping" => Ok(json!({})),
            other => Err((-32601, format!("unknown method: {other}"))),
        }
    }

    /// Run one tool, wrapping the outcome in a content array
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Value {
        match self.dispatch_tool(name, arguments).await {
            Ok(result) => json!({
                "content": [{ "type": "text", "text": result.to_string() }]
            }),
            Err(err) => json!({
                "content": [{ "type": "text", "text": json!({
                    "error": err.kind(),
                    "message": err.to_string(),
                }).to_string() }],
                "isError": true
            }),
        }
    }

    async fn dispatch_tool(&self, name: &str, args: Value) -> Result<Value, EngineError> {
        let cancel = CancellationToken::new();
        match name {
            "ingest_triples" => {
                let args: IngestTriplesArgs = parse_args(args)?;
                let report = self
                    .engine
                    .ingest_triples(&args.namespace, args.triples, &cancel)
                    .await?;
                Ok(json!({
                    "nodes_added": report.nodes_added,
                    "edges_added": report.edges_added,
                    "message": format!(
                        "ingested {} triples ({} new nodes)",
                        report.edges_added, report.nodes_added
                    ),
                }))
            }
            "ingest_text" => {
                let args: IngestTextArgs = parse_args(args)?;
                let report = self
                    .engine
                    .ingest_text(&args.namespace, &args.text, args.source, &cancel)
                    .await?;
                Ok(json!({
                    "nodes_added": report.nodes_added,
                    "edges_added": report.edges_added,
                    "message": format!("stored {} observations", report.edges_added),
                }))
            }
            "list_triples" => {
                let args: ListTriplesArgs = parse_args(args)?;
                let triples = self.engine.list_triples(&args.namespace, args.limit)?;
                let listed: Vec<Value> = triples
                    .iter()
                    .map(|(s, p, o)| {
                        json!({
                            "subject": s.value(),
                            "predicate": p.value(),
                            "object": o.value(),
                        })
                    })
                    .collect();
                Ok(json!({ "triples": listed }))
            }
            "get_neighbors" => {
                let args: GetNeighborsArgs = parse_args(args)?;
                let node = match (args.uri, args.node_id) {
                    (Some(uri), _) => NodeRef::Uri(uri),
                    (None, Some(id)) => NodeRef::Id(id),
                    (None, None) => {
                        return Err(EngineError::Validation(
                            "get_neighbors needs uri or node_id".to_string(),
                        ))
                    }
                };
                let direction = match args.direction {
                    Some(d) => d.parse()?,
                    None => Direction::Both,
                };
                let neighbors =
                    self.engine
                        .get_neighbors(&args.namespace, node, direction)?;
                Ok(json!({ "neighbors": neighbors }))
            }
            "hybrid_search" => {
                let args: HybridSearchArgs = parse_args(args)?;
                let mut params = HybridParams::default();
                if let Some(k) = args.vector_k {
                    params.k = k;
                }
                if let Some(depth) = args.graph_depth {
                    params.graph_depth = depth;
                }
                if let Some(mode) = args.mode {
                    params.mode = mode.parse::<SearchMode>()?;
                }
                let results = self
                    .engine
                    .hybrid_search(&args.namespace, &args.query, None, params, &cancel)
                    .await?;
                Ok(json!({ "results": results }))
            }
            "sparql_query" => {
                let args: SparqlArgs = parse_args(args)?;
                let results = self.engine.sparql(&args.namespace, &args.query, &cancel)?;
                Ok(results.to_json())
            }
            "apply_reasoning" => {
                let args: ApplyReasoningArgs = parse_args(args)?;
                let rule_set: RuleSet = args
                    .strategy
                    .parse()
                    .map_err(EngineError::Validation)?;
                let report = self
                    .engine
                    .apply_reasoning(&args.namespace, rule_set, args.materialize, &cancel)
                    .await?;
                Ok(json!({
                    "success": true,
                    "triples_inferred": report.triples_inferred,
                    "message": format!(
                        "{} triples inferred in {} rounds",
                        report.triples_inferred, report.rounds
                    ),
                }))
            }
            "delete_namespace" => {
                let args: DeleteNamespaceArgs = parse_args(args)?;
                let existed = self.engine.delete_namespace(&args.namespace)?;
                Ok(json!({
                    "success": true,
                    "message": if existed {
                        format!("namespace {} deleted", args.namespace)
                    } else {
                        format!("namespace {} did not exist", args.namespace)
                    },
                }))
            }
            other => Err(EngineError::NotFound(format!("tool {other}"))),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, EngineError> {
    serde_json::from_value(value)
        .map_err(|e| EngineError::Validation(format!("bad tool arguments: {e}")))
}

fn namespace_schema() -> Value {
    json!({ "type": "string", "description": "Target namespace" })
}

fn tool_descriptors() -> Vec<Value> {
    vec![
        json!({
            "name": "ingest_triples",
            "description": "Store subject/predicate/object triples in a namespace",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "namespace": namespace_schema(),
                    "triples": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "subject": { "type": "string" },
                                "predicate": { "type": "string" },
                                "object": { "type": "string" },
                                "provenance": { "type": "string" }
                            },
                            "required": ["subject", "predicate", "object"]
                        }
                    }
                },
                "required": ["namespace", "triples"]
            }
        }),
        json!({
            "name": "ingest_text",
            "description": "Split text into observations, store and embed them",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "namespace": namespace_schema(),
                    "text": { "type": "string" },
                    "source": { "type": "string" }
                },
                "required": ["namespace", "text"]
            }
        }),
        json!({
            "name": "list_triples",
            "description": "List stored triples",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "namespace": namespace_schema(),
                    "limit": { "type": "integer", "default": 100 }
                },
                "required": ["namespace"]
            }
        }),
        json!({
            "name": "get_neighbors",
            "description": "Graph neighbors of a node by IRI or id",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "namespace": namespace_schema(),
                    "uri": { "type": "string" },
                    "node_id": { "type": "integer" },
                    "direction": { "type": "string", "enum": ["outgoing", "incoming", "both"], "default": "both" }
                },
                "required": ["namespace"]
            }
        }),
        json!({
            "name": "hybrid_search",
            "description": "Vector search composed with graph expansion",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "namespace": namespace_schema(),
                    "query": { "type": "string" },
                    "vector_k": { "type": "integer", "default": 5 },
                    "graph_depth": { "type": "integer", "default": 1 },
                    "mode": { "type": "string", "enum": ["vector_only", "graph_only", "hybrid"], "default": "hybrid" }
                },
                "required": ["namespace", "query"]
            }
        }),
        json!({
            "name": "sparql_query",
            "description": "Run a SPARQL SELECT/ASK/CONSTRUCT query",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "namespace": namespace_schema(),
                    "query": { "type": "string" }
                },
                "required": ["namespace", "query"]
            }
        }),
        json!({
            "name": "apply_reasoning",
            "description": "Materialize RDFS or OWL-RL entailments",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "namespace": namespace_schema(),
                    "strategy": { "type": "string", "enum": ["rdfs", "owlrl"] },
                    "materialize": { "type": "boolean", "default": true }
                },
                "required": ["namespace", "strategy"]
            }
        }),
        json!({
            "name": "delete_namespace",
            "description": "Destroy a namespace and everything it owns",
            "inputSchema": {
                "type": "object",
                "properties": { "namespace": namespace_schema() },
                "required": ["namespace"]
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        McpServer::new(Arc::new(SemanticEngine::in_memory()))
    }

    #[tokio::test]
    async fn test_initialize_handshake() {
        let server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "graphmind");
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#)
            .await
            .unwrap();
        let tools = response["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        for expected in [
            "ingest_triples",
            "ingest_text",
            "list_triples",
            "get_neighbors",
            "hybrid_search",
            "sparql_query",
            "apply_reasoning",
            "delete_namespace",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"bogus"}"#)
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_ingest_and_query_via_tools() {
        let server = server();
        let call = json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": {
                "name": "ingest_triples",
                "arguments": {
                    "namespace": "ns1",
                    "triples": [{
                        "subject": "http://ex/A",
                        "predicate": "http://ex/p",
                        "object": "v"
                    }]
                }
            }
        });
        let response = server.handle_line(&call.to_string()).await.unwrap();
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["edges_added"], 1);

        let query = json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": {
                "name": "sparql_query",
                "arguments": {
                    "namespace": "ns1",
                    "query": "SELECT ?o WHERE { <http://ex/A> <http://ex/p> ?o }"
                }
            }
        });
        let response = server.handle_line(&query.to_string()).await.unwrap();
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["results"]["bindings"][0]["o"]["value"], "v");
    }

    #[tokio::test]
    async fn test_tool_error_is_flagged() {
        let server = server();
        let call = json!({
            "jsonrpc": "2.0", "id": 6, "method": "tools/call",
            "params": {
                "name": "sparql_query",
                "arguments": { "namespace": "ns1", "query": "SELECT WHERE broken" }
            }
        });
        let response = server.handle_line(&call.to_string()).await.unwrap();
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["error"], "validation");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let server = server();
        let response = server.call_tool("no_such_tool", json!({})).await;
        assert_eq!(response["isError"], true);
    }
}
