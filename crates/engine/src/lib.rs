//! Multi-tenant semantic engine
//!
//! Ties the leaves together behind one [`SemanticEngine`] value that the
//! transports share by reference: per-namespace dictionaries and triple
//! stores, the reasoner, the SPARQL executor, the vector index, quotas,
//! and token-scoped authorization. Writes go dictionary → store → ledger
//! → vector index; reads resolve back through the dictionary.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod auth;
mod config;
mod engine;
mod error;
mod namespace;

pub use auth::AuthTokens;
pub use config::{EngineConfig, Quotas, Timeouts};
pub use engine::{
    Direction, HybridParams, IngestReport, NeighborEntry, NodeRef, ReasoningReport,
    SearchMode, SearchResult, SemanticEngine, TripleInput, OBSERVATION_PREDICATE,
};
pub use error::{EngineError, EngineResult};
pub use namespace::{GraphState, Namespace, NamespaceInfo, NamespaceManager};

// re-exported so transports depend on one crate
pub use reasoning::RuleSet;
pub use sparql::QueryResults;
