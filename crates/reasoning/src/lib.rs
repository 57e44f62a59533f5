//! Entailment materialization over a namespace
//!
//! Derives new quads from the stored ones under a declared rule set and
//! hands them back as a batch the store absorbs atomically. The reasoner
//! only ever borrows the store; it owns no storage of its own.
//!
//! Rule sets:
//! - [`RuleSet::None`]: identity
//! - [`RuleSet::Rdfs`]: subclass/subproperty transitivity, domain/range
//!   type propagation, type propagation through `rdfs:subClassOf`
//! - [`RuleSet::OwlRl`]: RDFS plus `owl:inverseOf`, transitive and
//!   symmetric properties, equivalent classes/properties, and `owl:sameAs`
//!   propagation

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod engine;
mod rules;

pub use engine::{derive, SchemaIds};

use rdf_model::TripleId;
use serde::{Deserialize, Serialize};
use storage::IdTriple;

/// Closed set of supported entailment regimes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSet {
    /// No entailment
    None,
    /// RDF Schema entailment
    Rdfs,
    /// OWL 2 RL subset entailment
    OwlRl,
}

impl std::str::FromStr for RuleSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(RuleSet::None),
            "rdfs" => Ok(RuleSet::Rdfs),
            "owlrl" | "owl-rl" | "owl_rl" => Ok(RuleSet::OwlRl),
            other => Err(format!("unknown rule set: {other:?}")),
        }
    }
}

/// Reasoner configuration
#[derive(Debug, Clone)]
pub struct ReasonerConfig {
    /// Ceiling on fixpoint rounds per invocation
    pub max_rounds: usize,
    /// Ceiling on derived quads per invocation
    pub max_inferred: usize,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            max_rounds: 64,
            max_inferred: 1_000_000,
        }
    }
}

/// Reasoner error types
#[derive(Debug, thiserror::Error)]
pub enum ReasonerError {
    /// Round ceiling hit before reaching the fixpoint
    #[error("Reasoning budget exceeded after {rounds} rounds")]
    BudgetExceeded {
        /// Rounds executed when the ceiling was hit
        rounds: usize,
    },

    /// Derived-quad ceiling hit
    #[error("Inference limit exceeded: more than {limit} derived quads")]
    InferenceLimit {
        /// Configured ceiling
        limit: usize,
    },

    /// Caller cancelled between rounds
    #[error("Reasoning cancelled")]
    Cancelled,
}

/// Result type for reasoning operations
pub type ReasonerResult<T> = Result<T, ReasonerError>;

/// Reference to a premise of a derived quad.
///
/// Premises derived earlier in the same run have no store id yet; they
/// are referenced by their position in the output batch and resolved to
/// real ids when the batch is materialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PremiseRef {
    /// A quad already in the store
    Stored(TripleId),
    /// Index into this run's derived batch
    Derived(usize),
}

/// One derived quad with the rule and premises that produced it
#[derive(Clone, Debug)]
pub struct InferredQuad {
    /// The derived triple in identifier space
    pub triple: IdTriple,
    /// OWL 2 RL / RDFS rule name
    pub rule: &'static str,
    /// Ordered premise references
    pub premises: Vec<PremiseRef>,
}

/// Outcome of one fixpoint run
#[derive(Debug, Default)]
pub struct ReasoningOutcome {
    /// Derived quads in derivation order
    pub inferred: Vec<InferredQuad>,
    /// Rounds executed, including the final empty one
    pub rounds: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_set_parsing() {
        assert_eq!("rdfs".parse::<RuleSet>().unwrap(), RuleSet::Rdfs);
        assert_eq!("OWLRL".parse::<RuleSet>().unwrap(), RuleSet::OwlRl);
        assert_eq!("owl-rl".parse::<RuleSet>().unwrap(), RuleSet::OwlRl);
        assert!("owl-dl".parse::<RuleSet>().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = ReasonerConfig::default();
        assert_eq!(config.max_rounds, 64);
    }
}
