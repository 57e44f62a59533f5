//! SPARQL 1.1 subset over the identifier-space triple store
//!
//! Pipeline: lex → parse → algebra → plan → execute. Supported forms are
//! SELECT, ASK, and CONSTRUCT with basic graph patterns, OPTIONAL, UNION,
//! FILTER, GROUP BY with COUNT, ORDER BY, LIMIT/OFFSET, DISTINCT, and
//! property paths `*`, `+`, `?`, `^`, `/`, `|`.
//!
//! The physical layer picks the store index per triple pattern from the
//! positions bound in the current binding set; joins between groups hash
//! on the shared variables, falling back to nested loops for small
//! inputs.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod algebra;
mod eval;
mod lexer;
mod parser;
mod plan;
mod results;

pub use eval::{ExecOptions, Executor};
pub use parser::parse_query;
pub use results::QueryResults;

/// SPARQL errors
#[derive(Debug, thiserror::Error)]
pub enum SparqlError {
    /// Syntax error with byte position
    #[error("Parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset of the offending token
        position: usize,
        /// Description of what went wrong
        message: String,
    },

    /// Query uses a feature outside the supported subset
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Expression failed to evaluate (bad regex, type error)
    #[error("Evaluation error: {0}")]
    Eval(String),

    /// Per-query budget exceeded
    #[error("Query timed out")]
    Timeout,

    /// Caller cancelled the query
    #[error("Query cancelled")]
    Cancelled,
}

/// Result type for SPARQL operations
pub type SparqlResult<T> = Result<T, SparqlError>;
