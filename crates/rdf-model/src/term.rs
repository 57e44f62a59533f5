//! RDF term types
//!
//! Owned representation of IRIs, blank nodes, and literals. Terms are
//! interned into a per-namespace [`crate::Dictionary`] which owns the
//! canonical copy; identifiers, not strings, flow through the indexes.

use crate::vocab::Vocabulary;
use crate::{RdfError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An RDF literal: lexical form plus optional datatype or language tag.
///
/// A language tag is only valid together with a string datatype; the
/// constructors on [`Term`] enforce the exclusivity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    /// Lexical form (string representation)
    pub lexical: String,

    /// Datatype IRI; `None` is interpreted as `xsd:string`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub datatype: Option<String>,

    /// Language tag (e.g., "en", "fr")
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
}

impl Literal {
    /// Effective datatype IRI, defaulting to `xsd:string`
    pub fn datatype_iri(&self) -> &str {
        self.datatype.as_deref().unwrap_or(Vocabulary::XSD_STRING)
    }

    /// Check if this is a plain string literal (no language, no datatype)
    pub fn is_plain(&self) -> bool {
        self.language.is_none() && self.datatype.is_none()
    }

    /// Try to interpret the lexical form as an integer
    pub fn as_i64(&self) -> Option<i64> {
        self.lexical.parse().ok()
    }

    /// Try to interpret the lexical form as a float
    pub fn as_f64(&self) -> Option<f64> {
        self.lexical.parse().ok()
    }

    /// Try to interpret the lexical form as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self.lexical.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_literal(&self.lexical))?;
        if let Some(lang) = &self.language {
            write!(f, "@{}", lang)?;
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{}>", dt)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Literal({})", self)
    }
}

/// RDF term: IRI, blank node, or literal.
///
/// Subjects are IRIs or blank nodes, predicates are IRIs, objects may be
/// any term; [`Term::validate_for_position`] checks those constraints.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// IRI reference, e.g. `<http://example.org/resource>`
    Iri(String),

    /// Blank node with a namespace-local label, e.g. `_:b0`
    BlankNode(String),

    /// Literal value, e.g. `"John"@en` or `"42"^^xsd:integer`
    Literal(Literal),
}

/// Position of a term inside a triple, used for validation
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TermPosition {
    /// Subject position: IRI or blank node
    Subject,
    /// Predicate position: IRI only
    Predicate,
    /// Object position: any term
    Object,
}

impl Term {
    /// Create an IRI term
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// Create a blank node term
    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    /// Create a plain string literal
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: value.into(),
            datatype: None,
            language: None,
        })
    }

    /// Create a language-tagged literal
    pub fn literal_lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: value.into(),
            datatype: None,
            language: Some(language.into()),
        })
    }

    /// Create a typed literal
    pub fn literal_typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        })
    }

    /// Check if this is an IRI
    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// Check if this is a blank node
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    /// Get as IRI string
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Get as literal
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// String value for display and search payloads.
    ///
    /// IRIs and blank node labels return their identifier, literals their
    /// lexical form.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::BlankNode(label) => label,
            Term::Literal(lit) => &lit.lexical,
        }
    }

    /// Validate the term's own well-formedness.
    ///
    /// IRIs must be absolute (contain a scheme separator) and free of
    /// whitespace and angle brackets; language tags must be BCP47-shaped
    /// and exclusive with a non-string datatype.
    pub fn validate(&self) -> Result<()> {
        match self {
            Term::Iri(iri) => validate_iri(iri),
            Term::BlankNode(label) => {
                if label.is_empty() || !label.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    return Err(RdfError::InvalidBlankNode(label.clone()));
                }
                Ok(())
            }
            Term::Literal(lit) => {
                if let Some(lang) = &lit.language {
                    if lang.is_empty()
                        || !lang
                            .chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '-')
                    {
                        return Err(RdfError::InvalidLiteral(format!(
                            "bad language tag: {lang:?}"
                        )));
                    }
                    if let Some(dt) = &lit.datatype {
                        if dt != Vocabulary::XSD_STRING && dt != Vocabulary::RDF_LANG_STRING {
                            return Err(RdfError::InvalidLiteral(format!(
                                "language tag with non-string datatype {dt}"
                            )));
                        }
                    }
                }
                if let Some(dt) = &lit.datatype {
                    validate_iri(dt)?;
                }
                Ok(())
            }
        }
    }

    /// Validate the term against a triple position
    pub fn validate_for_position(&self, position: TermPosition) -> Result<()> {
        self.validate()?;
        match (position, self) {
            (TermPosition::Subject, Term::Literal(_)) => Err(RdfError::InvalidTriple(
                "literal in subject position".to_string(),
            )),
            (TermPosition::Predicate, Term::Iri(_)) => Ok(()),
            (TermPosition::Predicate, other) => Err(RdfError::InvalidTriple(format!(
                "predicate must be an IRI, got {other}"
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal(lit) => write!(f, "{}", lit),
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "Iri({})", iri),
            Term::BlankNode(label) => write!(f, "BlankNode({})", label),
            Term::Literal(lit) => write!(f, "{:?}", lit),
        }
    }
}

fn validate_iri(iri: &str) -> Result<()> {
    if iri.is_empty() || !iri.contains(':') {
        return Err(RdfError::InvalidIri(iri.to_string()));
    }
    if iri
        .chars()
        .any(|c| c.is_whitespace() || c == '<' || c == '>' || c == '"')
    {
        return Err(RdfError::InvalidIri(iri.to_string()));
    }
    Ok(())
}

fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
