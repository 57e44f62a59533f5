//! RDF term model with per-namespace identifier dictionaries
//!
//! This crate provides the data-model leaves of the engine:
//! - Owned [`Term`] values (IRIs, blank nodes, literals) with validation
//! - Compact [`NodeId`]/[`TripleId`] identifiers
//! - The [`Dictionary`] mapping terms to stable 64-bit ids per namespace
//! - Standard vocabularies and a Turtle/N-Triples subset reader
//!
//! Identifiers, not strings, are what the store indexes and the reasoner
//! join on; the dictionary owns the canonical term for each id.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dictionary;
mod id;
pub mod io;
mod term;
mod vocab;

pub use dictionary::Dictionary;
pub use id::{NodeId, TripleId};
pub use term::{Literal, Term, TermPosition};
pub use vocab::Vocabulary;

/// Errors that can occur when working with RDF data
#[derive(Debug, thiserror::Error)]
pub enum RdfError {
    /// Invalid IRI format
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// Invalid literal format
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    /// Invalid blank node label
    #[error("Invalid blank node label: {0}")]
    InvalidBlankNode(String),

    /// Structurally invalid triple
    #[error("Invalid triple: {0}")]
    InvalidTriple(String),

    /// Syntax error while reading a serialized RDF document
    #[error("Parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset of the offending token
        position: usize,
        /// Description of what went wrong
        message: String,
    },
}

/// Result type for RDF operations
pub type Result<T> = std::result::Result<T, RdfError>;
