//! Approximate-nearest-neighbor search over node embeddings
//!
//! One [`VectorStore`] per namespace wraps an HNSW graph with a
//! `NodeId`-keyed mapping layer: the ANN structure only ever sees dense
//! internal indices, deletion is a tombstone in the mapping, and the
//! namespace dimension is fixed by the first inserted vector.
//!
//! Embedding production is external; [`Embedder`] is the closed set of
//! ways to obtain one (caller-supplied vectors bypass it entirely).

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod embedder;
mod hnsw;

pub use embedder::{Embedder, HashEmbedder, HttpEmbedder, TokenBucket};
pub use hnsw::{HnswParams, SearchHit, VectorKind, VectorPayload, VectorStore};

/// Errors from the vector layer
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    /// Vector length differs from the namespace's fixed dimension
    #[error("Dimension mismatch: namespace is fixed at {expected}, got {actual}")]
    DimensionMismatch {
        /// Namespace dimension
        expected: usize,
        /// Offending vector length
        actual: usize,
    },

    /// All-zero or otherwise unnormalizable vector
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Remote embedder failed; retryable
    #[error("Embedder unavailable: {0}")]
    Embedder(String),

    /// Log file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Log record failed to (de)serialize
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for vector operations
pub type VectorResult<T> = Result<T, VectorError>;
