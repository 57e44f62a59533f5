//! Engine error taxonomy
//!
//! Component errors fold into these kinds at the facade boundary; the
//! transports map kinds onto their own status vocabulary. The engine
//! never panics on client input.

use rdf_model::RdfError;
use reasoning::ReasonerError;
use sparql::SparqlError;
use storage::StorageError;
use vector_index::VectorError;

/// Errors surfaced by engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed input: bad IRI, invalid SPARQL, dimension mismatch,
    /// missing required field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Namespace, node, or triple does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate operation or concurrent modification
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Namespace quota would be exceeded
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Missing or unknown token
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Valid token without namespace scope
    #[error("Permission denied for namespace {0}")]
    PermissionDenied(String),

    /// Reasoning rounds ceiling hit
    #[error("Reasoning budget exceeded: {0}")]
    ReasoningBudgetExceeded(String),

    /// Operation budget hit
    #[error("Timeout during {0}")]
    Timeout(String),

    /// Request cancelled by the caller
    #[error("Cancelled")]
    Cancelled,

    /// Retryable failure (embedder unreachable, I/O flake)
    #[error("Transient error: {0}")]
    Transient(String),

    /// Non-retryable failure (storage corruption, allocator exhaustion)
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl EngineError {
    /// Stable kind tag used by the transports
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::QuotaExceeded(_) => "quota_exceeded",
            EngineError::Unauthenticated => "unauthenticated",
            EngineError::PermissionDenied(_) => "permission_denied",
            EngineError::ReasoningBudgetExceeded(_) => "reasoning_budget_exceeded",
            EngineError::Timeout(_) => "timeout",
            EngineError::Cancelled => "cancelled",
            EngineError::Transient(_) => "transient",
            EngineError::Fatal(_) => "fatal",
        }
    }

    /// Whether a retry could help
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }
}

impl From<RdfError> for EngineError {
    fn from(err: RdfError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownTriple(id) => EngineError::NotFound(format!("triple {id}")),
            StorageError::Corrupt(msg) => EngineError::Fatal(format!("storage corrupt: {msg}")),
            StorageError::Io(e) => EngineError::Transient(format!("storage I/O: {e}")),
            StorageError::Serialization(e) => {
                EngineError::Fatal(format!("storage record: {e}"))
            }
        }
    }
}

impl From<SparqlError> for EngineError {
    fn from(err: SparqlError) -> Self {
        match err {
            SparqlError::Parse { .. } | SparqlError::Eval(_) => {
                EngineError::Validation(err.to_string())
            }
            SparqlError::Unsupported(feature) => {
                EngineError::Validation(format!("unsupported SPARQL feature: {feature}"))
            }
            SparqlError::Timeout => EngineError::Timeout("sparql".to_string()),
            SparqlError::Cancelled => EngineError::Cancelled,
        }
    }
}

impl From<ReasonerError> for EngineError {
    fn from(err: ReasonerError) -> Self {
        match err {
            ReasonerError::BudgetExceeded { .. } | ReasonerError::InferenceLimit { .. } => {
                EngineError::ReasoningBudgetExceeded(err.to_string())
            }
            ReasonerError::Cancelled => EngineError::Cancelled,
        }
    }
}

impl From<VectorError> for EngineError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::DimensionMismatch { .. } | VectorError::InvalidVector(_) => {
                EngineError::Validation(err.to_string())
            }
            VectorError::Embedder(msg) => EngineError::Transient(format!("embedder: {msg}")),
            VectorError::Io(e) => EngineError::Transient(format!("vector I/O: {e}")),
            VectorError::Serialization(e) => EngineError::Fatal(format!("vector record: {e}")),
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(EngineError::Unauthenticated.kind(), "unauthenticated");
        assert_eq!(
            EngineError::QuotaExceeded("t".into()).kind(),
            "quota_exceeded"
        );
    }

    #[test]
    fn test_sparql_error_mapping() {
        let err: EngineError = SparqlError::Timeout.into();
        assert!(matches!(err, EngineError::Timeout(_)));
        let err: EngineError = SparqlError::Parse {
            position: 3,
            message: "x".into(),
        }
        .into();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(EngineError::Transient("x".into()).is_retryable());
        assert!(!EngineError::Fatal("x".into()).is_retryable());
    }
}
