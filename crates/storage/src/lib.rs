//! Quad storage for the engine
//!
//! One [`TripleStore`] per namespace owns the authoritative quad set in
//! three sorted permutation indexes (SPO, POS, OSP), the provenance
//! ledger, and the append-only on-disk logs the namespace is rebuilt
//! from at startup.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod log;
mod provenance;
mod triple_store;

pub use log::{load_namespace, Manifest, NamespaceLog};
pub use provenance::{InferenceChain, Provenance, ProvenanceLedger};
pub use triple_store::{
    BatchOutcome, IdTriple, InsertOutcome, MatchIter, TriplePattern, TripleStore,
};

use rdf_model::TripleId;

/// Errors from the storage layer
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Referenced triple id does not exist
    #[error("Unknown triple id: {0}")]
    UnknownTriple(TripleId),

    /// On-disk state failed validation during replay
    #[error("Corrupt storage: {0}")]
    Corrupt(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Log record failed to (de)serialize
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;
