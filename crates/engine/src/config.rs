//! Engine configuration from environment variables
//!
//! `DATA_DIR`, `EMBEDDER_URL`, `EMBEDDING_DIM`, `LOG_LEVEL` (consumed by
//! the binary's subscriber), `RPC_PORT`, `AUTH_TOKENS` (parsed in
//! [`crate::auth`]). Everything has a default so `engine serve` works
//! out of the box.

use crate::{EngineError, EngineResult};
use std::path::PathBuf;
use std::time::Duration;
use vector_index::HnswParams;

/// Per-namespace quotas
#[derive(Clone, Copy, Debug)]
pub struct Quotas {
    /// Max stored quads per namespace
    pub max_triples: usize,
    /// Max vector records per namespace
    pub max_vectors: usize,
}

impl Default for Quotas {
    fn default() -> Self {
        Self {
            max_triples: 5_000_000,
            max_vectors: 1_000_000,
        }
    }
}

/// Per-operation budgets
#[derive(Clone, Copy, Debug)]
pub struct Timeouts {
    /// Ingest budget
    pub ingest: Duration,
    /// SPARQL query budget
    pub sparql: Duration,
    /// Reasoning budget
    pub reasoning: Duration,
    /// Hybrid search budget
    pub search: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            ingest: Duration::from_secs(30),
            sparql: Duration::from_secs(60),
            reasoning: Duration::from_secs(300),
            search: Duration::from_secs(15),
        }
    }
}

/// Engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Data root; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
    /// Hosted embedder endpoint; `None` selects the local hash embedder
    pub embedder_url: Option<String>,
    /// Dimension for the local embedder (remote dimensions are whatever
    /// the endpoint returns; namespaces pin them at first insert)
    pub embedding_dim: usize,
    /// Binary RPC listen port
    pub rpc_port: u16,
    /// Per-namespace quotas
    pub quotas: Quotas,
    /// Per-operation budgets
    pub timeouts: Timeouts,
    /// HNSW parameters for new namespaces
    pub hnsw: HnswParams,
    /// Embedder token-bucket rate
    pub embed_rate_per_sec: f64,
    /// Bounded embedding queue depth
    pub embed_queue: usize,
    /// Concurrent reasoning runs across all namespaces
    pub reasoner_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            embedder_url: None,
            embedding_dim: 384,
            rpc_port: 50051,
            quotas: Quotas::default(),
            timeouts: Timeouts::default(),
            hnsw: HnswParams::default(),
            embed_rate_per_sec: 32.0,
            embed_queue: 256,
            reasoner_workers: 2,
        }
    }
}

impl EngineConfig {
    /// Build from environment variables
    pub fn from_env() -> EngineResult<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(url) = std::env::var("EMBEDDER_URL") {
            if !url.is_empty() {
                config.embedder_url = Some(url);
            }
        }
        if let Ok(dim) = std::env::var("EMBEDDING_DIM") {
            config.embedding_dim = dim
                .parse()
                .map_err(|_| EngineError::Validation(format!("bad EMBEDDING_DIM: {dim:?}")))?;
        }
        if let Ok(port) = std::env::var("RPC_PORT") {
            config.rpc_port = port
                .parse()
                .map_err(|_| EngineError::Validation(format!("bad RPC_PORT: {port:?}")))?;
        }
        Ok(config)
    }

    /// In-memory configuration for tests and ephemeral runs
    pub fn in_memory() -> Self {
        Self::default()
    }
}
