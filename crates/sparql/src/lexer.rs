//! SPARQL tokenizer
//!
//! Longest-match rules keep the grammar's overloaded characters apart:
//! `<` starts an IRI only when a closing `>` follows without whitespace,
//! `?` starts a variable only when a name follows, `^^` wins over `^`.

use logos::Logos;

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

/// SPARQL tokens
#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    // keywords
    /// `SELECT`
    #[token("SELECT", ignore(ascii_case))]
    Select,
    /// `CONSTRUCT`
    #[token("CONSTRUCT", ignore(ascii_case))]
    Construct,
    /// `ASK`
    #[token("ASK", ignore(ascii_case))]
    Ask,
    /// `WHERE`
    #[token("WHERE", ignore(ascii_case))]
    Where,
    /// `PREFIX`
    #[token("PREFIX", ignore(ascii_case))]
    Prefix,
    /// `BASE`
    #[token("BASE", ignore(ascii_case))]
    Base,
    /// `FILTER`
    #[token("FILTER", ignore(ascii_case))]
    Filter,
    /// `OPTIONAL`
    #[token("OPTIONAL", ignore(ascii_case))]
    Optional,
    /// `UNION`
    #[token("UNION", ignore(ascii_case))]
    Union,
    /// `DISTINCT`
    #[token("DISTINCT", ignore(ascii_case))]
    Distinct,
    /// `ORDER`
    #[token("ORDER", ignore(ascii_case))]
    Order,
    /// `GROUP`
    #[token("GROUP", ignore(ascii_case))]
    Group,
    /// `BY`
    #[token("BY", ignore(ascii_case))]
    By,
    /// `ASC`
    #[token("ASC", ignore(ascii_case))]
    Asc,
    /// `DESC`
    #[token("DESC", ignore(ascii_case))]
    Desc,
    /// `LIMIT`
    #[token("LIMIT", ignore(ascii_case))]
    Limit,
    /// `OFFSET`
    #[token("OFFSET", ignore(ascii_case))]
    Offset,
    /// `AS`
    #[token("AS", ignore(ascii_case))]
    As,
    /// `COUNT`
    #[token("COUNT", ignore(ascii_case))]
    Count,
    /// `REGEX`
    #[token("REGEX", ignore(ascii_case))]
    Regex,
    /// `BOUND`
    #[token("BOUND", ignore(ascii_case))]
    Bound,
    /// `isIRI` / `isURI`
    #[token("isIRI", ignore(ascii_case))]
    #[token("isURI", ignore(ascii_case))]
    IsIri,
    /// `isLITERAL`
    #[token("isLITERAL", ignore(ascii_case))]
    IsLiteral,
    /// boolean `true`
    #[token("true")]
    True,
    /// boolean `false`
    #[token("false")]
    False,
    /// `a` (rdf:type shorthand)
    #[token("a")]
    A,

    // terms
    /// `<iri>` with brackets stripped
    #[regex(r"<[^<>\x00-\x20]*>", |lex| trim_ends(lex.slice(), 1, 1))]
    Iri(String),
    /// `?name` / `$name` with the sigil stripped
    #[regex(r"[?$][A-Za-z_][A-Za-z0-9_]*", |lex| trim_ends(lex.slice(), 1, 0))]
    Var(String),
    /// Prefixed name, kept whole (`ex:name`, `:name`, `ex:`)
    #[regex(
        r"[A-Za-z_][A-Za-z0-9_\-]*:[A-Za-z_][A-Za-z0-9_\-]*|:[A-Za-z_][A-Za-z0-9_\-]*|[A-Za-z_][A-Za-z0-9_\-]*:",
        |lex| lex.slice().to_owned()
    )]
    PrefixedName(String),
    /// String literal, unescaped
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(trim_ends(lex.slice(), 1, 1)))]
    Str(String),
    /// Integer literal
    #[regex(r"[+-]?[0-9]+", |lex| lex.slice().to_owned())]
    Integer(String),
    /// Decimal literal
    #[regex(r"[+-]?[0-9]*\.[0-9]+", |lex| lex.slice().to_owned())]
    Decimal(String),
    /// Language tag with `@` stripped
    #[regex(r"@[a-zA-Z]+(-[a-zA-Z0-9]+)*", |lex| trim_ends(lex.slice(), 1, 0))]
    LangTag(String),
    /// `^^`
    #[token("^^")]
    DatatypeMarker,

    // punctuation
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `.`
    #[token(".")]
    Dot,
    /// `;`
    #[token(";")]
    Semicolon,
    /// `,`
    #[token(",")]
    Comma,
    /// `*`
    #[token("*")]
    Star,
    /// `+`
    #[token("+")]
    Plus,
    /// `?` (path modifier)
    #[token("?")]
    Question,
    /// `/`
    #[token("/")]
    Slash,
    /// `|`
    #[token("|")]
    Pipe,
    /// `^` (path inverse)
    #[token("^")]
    Caret,
    /// `&&`
    #[token("&&")]
    AndAnd,
    /// `||`
    #[token("||")]
    OrOr,
    /// `!`
    #[token("!")]
    Bang,
    /// `=`
    #[token("=")]
    CmpEq,
    /// `!=`
    #[token("!=")]
    CmpNe,
    /// `<=`
    #[token("<=")]
    CmpLe,
    /// `>=`
    #[token(">=")]
    CmpGe,
    /// `<`
    #[token("<")]
    CmpLt,
    /// `>`
    #[token(">")]
    CmpGt,
}

/// Tokenize a query, returning tokens with their byte offsets
pub fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, crate::SparqlError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push((token, span.start)),
            Err(()) => {
                return Err(crate::SparqlError::Parse {
                    position: span.start,
                    message: format!("unrecognized input: {:?}", &input[span]),
                })
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(kinds("select SeLeCt")[0], Token::Select);
        assert_eq!(kinds("select SeLeCt")[1], Token::Select);
    }

    #[test]
    fn test_iri_vs_less_than() {
        let tokens = kinds("<http://ex.org/a> < ?x");
        assert_eq!(tokens[0], Token::Iri("http://ex.org/a".into()));
        assert_eq!(tokens[1], Token::CmpLt);
        assert_eq!(tokens[2], Token::Var("x".into()));
    }

    #[test]
    fn test_var_vs_path_question() {
        let tokens = kinds("?x foaf:knows? ?y");
        assert_eq!(tokens[0], Token::Var("x".into()));
        assert_eq!(tokens[1], Token::PrefixedName("foaf:knows".into()));
        assert_eq!(tokens[2], Token::Question);
        assert_eq!(tokens[3], Token::Var("y".into()));
    }

    #[test]
    fn test_string_with_escapes() {
        let tokens = kinds(r#""he said \"hi\"""#);
        assert_eq!(tokens[0], Token::Str("he said \"hi\"".into()));
    }

    #[test]
    fn test_typed_literal_tokens() {
        let tokens = kinds(r#""42"^^xsd:integer"#);
        assert_eq!(tokens[0], Token::Str("42".into()));
        assert_eq!(tokens[1], Token::DatatypeMarker);
        assert_eq!(tokens[2], Token::PrefixedName("xsd:integer".into()));
    }

    #[test]
    fn test_comparison_operators() {
        let tokens = kinds("<= >= != = !");
        assert_eq!(
            tokens,
            vec![
                Token::CmpLe,
                Token::CmpGe,
                Token::CmpNe,
                Token::CmpEq,
                Token::Bang
            ]
        );
    }

    #[test]
    fn test_comment_skipped() {
        let tokens = kinds("SELECT # comment here\n ?x");
        assert_eq!(tokens.len(), 2);
    }
}
