//! Turtle / N-Triples reader for batch ingestion
//!
//! Covers the subset used by ontology and data files fed to the CLI:
//! `@prefix` / `@base` directives, `a`, semicolon and comma lists, typed
//! and language-tagged literals, blank node labels. N-Triples documents
//! are valid input since the grammar is a superset.

use crate::{RdfError, Result, Term, Vocabulary};
use logos::Logos;
use std::collections::HashMap;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
enum Token {
    #[regex(r"<[^<>\x00-\x20]*>", |lex| trim_ends(lex.slice(), 1, 1))]
    Iri(String),

    #[token("@prefix")]
    PrefixDecl,

    #[token("@base")]
    BaseDecl,

    #[regex(r"@[a-zA-Z]+(-[a-zA-Z0-9]+)*", |lex| trim_ends(lex.slice(), 1, 0))]
    LangTag(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(trim_ends(lex.slice(), 1, 1)))]
    StringLiteral(String),

    #[regex(r"_:[A-Za-z_][A-Za-z0-9_]*", |lex| trim_ends(lex.slice(), 2, 0))]
    BlankNode(String),

    #[regex(
        r"[A-Za-z_][A-Za-z0-9_\-]*:[A-Za-z_][A-Za-z0-9_\-]*|:[A-Za-z_][A-Za-z0-9_\-]*|[A-Za-z_][A-Za-z0-9_\-]*:",
        |lex| lex.slice().to_owned()
    )]
    PrefixedName(String),

    #[regex(r"[+-]?[0-9]+", |lex| lex.slice().to_owned())]
    Integer(String),

    #[regex(r"[+-]?[0-9]*\.[0-9]+", |lex| lex.slice().to_owned())]
    Decimal(String),

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("a")]
    A,

    #[token("^^")]
    DatatypeMarker,

    #[token(".")]
    Dot,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,
}

fn trim_ends(s: &str, front: usize, back: usize) -> String {
    s[front..s.len() - back].to_owned()
}

fn unescape(s: String) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if let Some(u) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(u);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Reader for Turtle / N-Triples documents
pub struct TurtleReader {
    prefixes: HashMap<String, String>,
    base: Option<String>,
}

struct TokenStream {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl TokenStream {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let item = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        item
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, p)| *p)
            .unwrap_or(0)
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.next() {
            Some((t, _)) if &t == expected => Ok(()),
            Some((t, p)) => Err(RdfError::Parse {
                position: p,
                message: format!("expected {expected:?}, found {t:?}"),
            }),
            None => Err(RdfError::Parse {
                position: self.position(),
                message: format!("expected {expected:?}, found end of input"),
            }),
        }
    }
}

impl TurtleReader {
    /// Create a reader with no prefixes bound
    pub fn new() -> Self {
        Self {
            prefixes: HashMap::new(),
            base: None,
        }
    }

    /// Parse a full document into subject/predicate/object triples
    pub fn parse(&mut self, input: &str) -> Result<Vec<(Term, Term, Term)>> {
        let mut tokens = Vec::new();
        for (result, span) in Token::lexer(input).spanned() {
            match result {
                Ok(token) => tokens.push((token, span.start)),
                Err(()) => {
                    return Err(RdfError::Parse {
                        position: span.start,
                        message: format!("unrecognized input: {:?}", &input[span]),
                    })
                }
            }
        }

        let mut stream = TokenStream { tokens, pos: 0 };
        let mut triples = Vec::new();

        while stream.peek().is_some() {
            match stream.peek() {
                Some(Token::PrefixDecl) => self.parse_prefix(&mut stream)?,
                Some(Token::BaseDecl) => self.parse_base(&mut stream)?,
                _ => self.parse_triples(&mut stream, &mut triples)?,
            }
        }

        Ok(triples)
    }

    fn parse_prefix(&mut self, stream: &mut TokenStream) -> Result<()> {
        stream.expect(&Token::PrefixDecl)?;
        let (name_token, pos) = stream.next().ok_or_else(|| RdfError::Parse {
            position: stream.position(),
            message: "expected prefix name".to_string(),
        })?;
        let name = match name_token {
            Token::PrefixedName(p) if p.ends_with(':') => trim_ends(&p, 0, 1),
            other => {
                return Err(RdfError::Parse {
                    position: pos,
                    message: format!("expected prefix name, found {other:?}"),
                })
            }
        };
        let iri = self.parse_iri_token(stream)?;
        stream.expect(&Token::Dot)?;
        self.prefixes.insert(name, iri);
        Ok(())
    }

    fn parse_base(&mut self, stream: &mut TokenStream) -> Result<()> {
        stream.expect(&Token::BaseDecl)?;
        let iri = self.parse_iri_token(stream)?;
        stream.expect(&Token::Dot)?;
        self.base = Some(iri);
        Ok(())
    }

    fn parse_iri_token(&mut self, stream: &mut TokenStream) -> Result<String> {
        match stream.next() {
            Some((Token::Iri(iri), _)) => Ok(self.resolve(iri)),
            Some((t, p)) => Err(RdfError::Parse {
                position: p,
                message: format!("expected IRI, found {t:?}"),
            }),
            None => Err(RdfError::Parse {
                position: stream.position(),
                message: "expected IRI, found end of input".to_string(),
            }),
        }
    }

    fn resolve(&self, iri: String) -> String {
        if iri.contains(':') {
            iri
        } else if let Some(base) = &self.base {
            format!("{base}{iri}")
        } else {
            iri
        }
    }

    fn expand_prefixed(&self, pname: &str, position: usize) -> Result<String> {
        let (prefix, local) = pname.split_once(':').unwrap_or(("", pname));
        match self.prefixes.get(prefix) {
            Some(ns) => Ok(format!("{ns}{local}")),
            None => Err(RdfError::Parse {
                position,
                message: format!("undefined prefix: {prefix:?}"),
            }),
        }
    }

    fn parse_triples(
        &mut self,
        stream: &mut TokenStream,
        out: &mut Vec<(Term, Term, Term)>,
    ) -> Result<()> {
        let subject = self.parse_subject(stream)?;
        loop {
            let predicate = self.parse_verb(stream)?;
            loop {
                let object = self.parse_object(stream)?;
                out.push((subject.clone(), predicate.clone(), object));
                match stream.peek() {
                    Some(Token::Comma) => {
                        stream.next();
                    }
                    _ => break,
                }
            }
            match stream.peek() {
                Some(Token::Semicolon) => {
                    stream.next();
                    // trailing semicolon before the final dot is legal
                    if matches!(stream.peek(), Some(Token::Dot)) {
                        break;
                    }
                }
                _ => break,
            }
        }
        stream.expect(&Token::Dot)
    }

    fn parse_subject(&mut self, stream: &mut TokenStream) -> Result<Term> {
        match stream.next() {
            Some((Token::Iri(iri), _)) => Ok(Term::iri(self.resolve(iri))),
            Some((Token::PrefixedName(p), pos)) => {
                Ok(Term::iri(self.expand_prefixed(&p, pos)?))
            }
            Some((Token::BlankNode(label), _)) => Ok(Term::blank(label)),
            Some((t, p)) => Err(RdfError::Parse {
                position: p,
                message: format!("expected subject, found {t:?}"),
            }),
            None => Err(RdfError::Parse {
                position: stream.position(),
                message: "expected subject, found end of input".to_string(),
            }),
        }
    }

    fn parse_verb(&mut self, stream: &mut TokenStream) -> Result<Term> {
        match stream.next() {
            Some((Token::A, _)) => Ok(Term::iri(Vocabulary::RDF_TYPE)),
            Some((Token::Iri(iri), _)) => Ok(Term::iri(self.resolve(iri))),
            Some((Token::PrefixedName(p), pos)) => {
                Ok(Term::iri(self.expand_prefixed(&p, pos)?))
            }
            Some((t, p)) => Err(RdfError::Parse {
                position: p,
                message: format!("expected predicate, found {t:?}"),
            }),
            None => Err(RdfError::Parse {
                position: stream.position(),
                message: "expected predicate, found end of input".to_string(),
            }),
        }
    }

    fn parse_object(&mut self, stream: &mut TokenStream) -> Result<Term> {
        match stream.next() {
            Some((Token::Iri(iri), _)) => Ok(Term::iri(self.resolve(iri))),
            Some((Token::PrefixedName(p), pos)) => {
                Ok(Term::iri(self.expand_prefixed(&p, pos)?))
            }
            Some((Token::BlankNode(label), _)) => Ok(Term::blank(label)),
            Some((Token::Integer(n), _)) => Ok(Term::literal_typed(n, Vocabulary::XSD_INTEGER)),
            Some((Token::Decimal(n), _)) => Ok(Term::literal_typed(n, Vocabulary::XSD_DECIMAL)),
            Some((Token::True, _)) => Ok(Term::literal_typed("true", Vocabulary::XSD_BOOLEAN)),
            Some((Token::False, _)) => Ok(Term::literal_typed("false", Vocabulary::XSD_BOOLEAN)),
            Some((Token::StringLiteral(value), _)) => match stream.peek() {
                Some(Token::LangTag(_)) => {
                    let Some((Token::LangTag(lang), _)) = stream.next() else {
                        unreachable!()
                    };
                    Ok(Term::literal_lang(value, lang))
                }
                Some(Token::DatatypeMarker) => {
                    stream.next();
                    let datatype = match stream.next() {
                        Some((Token::Iri(iri), _)) => self.resolve(iri),
                        Some((Token::PrefixedName(p), pos)) => self.expand_prefixed(&p, pos)?,
                        Some((t, p)) => {
                            return Err(RdfError::Parse {
                                position: p,
                                message: format!("expected datatype IRI, found {t:?}"),
                            })
                        }
                        None => {
                            return Err(RdfError::Parse {
                                position: stream.position(),
                                message: "expected datatype IRI".to_string(),
                            })
                        }
                    };
                    Ok(Term::literal_typed(value, datatype))
                }
                _ => Ok(Term::literal(value)),
            },
            Some((t, p)) => Err(RdfError::Parse {
                position: p,
                message: format!("expected object, found {t:?}"),
            }),
            None => Err(RdfError::Parse {
                position: stream.position(),
                message: "expected object, found end of input".to_string(),
            }),
        }
    }
}

impl Default for TurtleReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntriples_line() {
        let doc = r#"<http://ex.org/a> <http://ex.org/p> "value" ."#;
        let triples = TurtleReader::new().parse(doc).unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].0, Term::iri("http://ex.org/a"));
        assert_eq!(triples[0].2, Term::literal("value"));
    }

    #[test]
    fn test_prefix_and_a() {
        let doc = r#"
            @prefix ex: <http://ex.org/> .
            ex:Fido a ex:Dog .
        "#;
        let triples = TurtleReader::new().parse(doc).unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].0, Term::iri("http://ex.org/Fido"));
        assert_eq!(triples[0].1, Term::iri(Vocabulary::RDF_TYPE));
        assert_eq!(triples[0].2, Term::iri("http://ex.org/Dog"));
    }

    #[test]
    fn test_predicate_object_lists() {
        let doc = r#"
            @prefix ex: <http://ex.org/> .
            ex:a ex:p ex:b , ex:c ;
                 ex:q "v" .
        "#;
        let triples = TurtleReader::new().parse(doc).unwrap();
        assert_eq!(triples.len(), 3);
        assert_eq!(triples[1].2, Term::iri("http://ex.org/c"));
        assert_eq!(triples[2].1, Term::iri("http://ex.org/q"));
    }

    #[test]
    fn test_typed_and_lang_literals() {
        let doc = r#"
            @prefix ex: <http://ex.org/> .
            @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
            ex:a ex:age "42"^^xsd:integer ;
                 ex:name "Jean"@fr ;
                 ex:score 3.5 .
        "#;
        let triples = TurtleReader::new().parse(doc).unwrap();
        assert_eq!(
            triples[0].2,
            Term::literal_typed("42", Vocabulary::XSD_INTEGER)
        );
        assert_eq!(triples[1].2, Term::literal_lang("Jean", "fr"));
        assert_eq!(
            triples[2].2,
            Term::literal_typed("3.5", Vocabulary::XSD_DECIMAL)
        );
    }

    #[test]
    fn test_blank_nodes_and_comments() {
        let doc = r#"
            # a comment
            _:b0 <http://ex.org/p> _:b1 .
        "#;
        let triples = TurtleReader::new().parse(doc).unwrap();
        assert_eq!(triples[0].0, Term::blank("b0"));
        assert_eq!(triples[0].2, Term::blank("b1"));
    }

    #[test]
    fn test_undefined_prefix_is_error() {
        let doc = "ex:a ex:p ex:b .";
        let err = TurtleReader::new().parse(doc).unwrap_err();
        assert!(matches!(err, RdfError::Parse { .. }));
    }

    #[test]
    fn test_string_escapes() {
        let doc = r#"<http://ex.org/a> <http://ex.org/p> "line\nbreak \"quoted\"" ."#;
        let triples = TurtleReader::new().parse(doc).unwrap();
        assert_eq!(triples[0].2, Term::literal("line\nbreak \"quoted\""));
    }
}
