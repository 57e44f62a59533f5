//! Recursive-descent SPARQL parser
//!
//! Consumes the token stream and produces a [`Query`]. Prefixed names are
//! expanded here, so everything downstream sees absolute IRIs.

use crate::algebra::*;
use crate::lexer::{tokenize, Token};
use crate::{SparqlError, SparqlResult};
use rdf_model::{Term, Vocabulary};
use std::collections::HashMap;

/// Parse a SPARQL query string
pub fn parse_query(input: &str) -> SparqlResult<Query> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        prefixes: HashMap::new(),
        base: None,
    };
    let query = parser.parse()?;
    if let Some((token, position)) = parser.current() {
        return Err(SparqlError::Parse {
            position,
            message: format!("unexpected trailing {token:?}"),
        });
    }
    Ok(query)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    prefixes: HashMap<String, String>,
    base: Option<String>,
}

impl Parser {
    fn current(&self) -> Option<(Token, usize)> {
        self.tokens.get(self.pos).cloned()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, p)| *p)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let item = self.current();
        self.pos += 1;
        item
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> SparqlResult<()> {
        match self.advance() {
            Some((t, _)) if &t == token => Ok(()),
            Some((t, p)) => Err(SparqlError::Parse {
                position: p,
                message: format!("expected {token:?}, found {t:?}"),
            }),
            None => Err(SparqlError::Parse {
                position: self.position(),
                message: format!("expected {token:?}, found end of query"),
            }),
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> SparqlResult<T> {
        Err(SparqlError::Parse {
            position: self.position(),
            message: message.into(),
        })
    }

    fn parse(&mut self) -> SparqlResult<Query> {
        self.parse_prologue()?;
        match self.peek() {
            Some(Token::Select) => self.parse_select(),
            Some(Token::Ask) => self.parse_ask(),
            Some(Token::Construct) => self.parse_construct(),
            Some(other) => {
                let other = other.clone();
                self.error(format!("expected SELECT, ASK or CONSTRUCT, found {other:?}"))
            }
            None => self.error("empty query"),
        }
    }

    fn parse_prologue(&mut self) -> SparqlResult<()> {
        loop {
            match self.peek() {
                Some(Token::Prefix) => {
                    self.advance();
                    let name = match self.advance() {
                        Some((Token::PrefixedName(p), _)) if p.ends_with(':') => {
                            p[..p.len() - 1].to_string()
                        }
                        Some((t, p)) => {
                            return Err(SparqlError::Parse {
                                position: p,
                                message: format!("expected prefix name, found {t:?}"),
                            })
                        }
                        None => return self.error("expected prefix name"),
                    };
                    let iri = self.expect_iri()?;
                    self.prefixes.insert(name, iri);
                }
                Some(Token::Base) => {
                    self.advance();
                    let iri = self.expect_iri()?;
                    self.base = Some(iri);
                }
                _ => return Ok(()),
            }
        }
    }

    fn expect_iri(&mut self) -> SparqlResult<String> {
        match self.advance() {
            Some((Token::Iri(iri), _)) => Ok(self.resolve_iri(iri)),
            Some((t, p)) => Err(SparqlError::Parse {
                position: p,
                message: format!("expected IRI, found {t:?}"),
            }),
            None => self.error("expected IRI"),
        }
    }

    fn resolve_iri(&self, iri: String) -> String {
        if iri.contains(':') {
            iri
        } else if let Some(base) = &self.base {
            format!("{base}{iri}")
        } else {
            iri
        }
    }

    fn expand_prefixed(&self, pname: &str, position: usize) -> SparqlResult<String> {
        let (prefix, local) = pname.split_once(':').unwrap_or(("", pname));
        match self.prefixes.get(prefix) {
            Some(ns) => Ok(format!("{ns}{local}")),
            None => Err(SparqlError::Parse {
                position,
                message: format!("undefined prefix: {prefix:?}"),
            }),
        }
    }

    // --- query forms -----------------------------------------------------

    fn parse_select(&mut self) -> SparqlResult<Query> {
        self.expect(&Token::Select)?;
        let distinct = self.eat(&Token::Distinct);

        let projection = if self.eat(&Token::Star) {
            Projection::All
        } else {
            let mut items = Vec::new();
            loop {
                match self.peek() {
                    Some(Token::Var(_)) => {
                        let Some((Token::Var(v), _)) = self.advance() else {
                            unreachable!()
                        };
                        items.push(SelectItem::Var(v));
                    }
                    Some(Token::LParen) => items.push(self.parse_aggregate_item()?),
                    _ => break,
                }
            }
            if items.is_empty() {
                return self.error("SELECT needs a projection");
            }
            Projection::Items(items)
        };

        let pattern = self.parse_where_clause()?;
        let group_by = self.parse_group_by()?;
        let order_by = self.parse_order_by()?;
        let (limit, offset) = self.parse_limit_offset()?;

        Ok(Query {
            form: QueryForm::Select {
                distinct,
                projection,
                group_by,
            },
            pattern,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_aggregate_item(&mut self) -> SparqlResult<SelectItem> {
        self.expect(&Token::LParen)?;
        self.expect(&Token::Count)?;
        self.expect(&Token::LParen)?;
        let (var, distinct) = if self.eat(&Token::Star) {
            (None, false)
        } else {
            let distinct = self.eat(&Token::Distinct);
            match self.advance() {
                Some((Token::Var(v), _)) => (Some(v), distinct),
                Some((t, p)) => {
                    return Err(SparqlError::Parse {
                        position: p,
                        message: format!("expected variable in COUNT, found {t:?}"),
                    })
                }
                None => return self.error("expected variable in COUNT"),
            }
        };
        self.expect(&Token::RParen)?;
        self.expect(&Token::As)?;
        let alias = match self.advance() {
            Some((Token::Var(v), _)) => v,
            Some((t, p)) => {
                return Err(SparqlError::Parse {
                    position: p,
                    message: format!("expected alias variable, found {t:?}"),
                })
            }
            None => return self.error("expected alias variable"),
        };
        self.expect(&Token::RParen)?;
        Ok(SelectItem::Count {
            var,
            distinct,
            alias,
        })
    }

    fn parse_ask(&mut self) -> SparqlResult<Query> {
        self.expect(&Token::Ask)?;
        self.eat(&Token::Where);
        let pattern = self.parse_group_graph_pattern()?;
        Ok(Query {
            form: QueryForm::Ask,
            pattern,
            order_by: Vec::new(),
            limit: None,
            offset: 0,
        })
    }

    fn parse_construct(&mut self) -> SparqlResult<Query> {
        self.expect(&Token::Construct)?;
        self.expect(&Token::LBrace)?;
        let mut template = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            if self.eat(&Token::Dot) {
                continue;
            }
            self.parse_triples_same_subject(&mut template)?;
        }
        self.expect(&Token::RBrace)?;
        for pattern in &template {
            if let PredicatePattern::Path(path) = &pattern.predicate {
                if path.as_iri().is_none() {
                    return Err(SparqlError::Unsupported(
                        "property paths in CONSTRUCT templates".to_string(),
                    ));
                }
            }
        }

        let pattern = self.parse_where_clause()?;
        let (limit, offset) = self.parse_limit_offset()?;
        Ok(Query {
            form: QueryForm::Construct { template },
            pattern,
            order_by: Vec::new(),
            limit,
            offset,
        })
    }

    fn parse_where_clause(&mut self) -> SparqlResult<Algebra> {
        self.eat(&Token::Where);
        self.parse_group_graph_pattern()
    }

    // --- graph patterns --------------------------------------------------

    fn parse_group_graph_pattern(&mut self) -> SparqlResult<Algebra> {
        self.expect(&Token::LBrace)?;
        let mut current: Option<Algebra> = None;
        let mut bgp: Vec<TriplePattern> = Vec::new();
        let mut filters: Vec<Expression> = Vec::new();

        loop {
            match self.peek() {
                Some(Token::RBrace) => break,
                Some(Token::Dot) => {
                    self.advance();
                }
                Some(Token::Filter) => {
                    self.advance();
                    filters.push(self.parse_constraint()?);
                }
                Some(Token::Optional) => {
                    self.advance();
                    flush_bgp(&mut current, &mut bgp);
                    let right = self.parse_group_graph_pattern()?;
                    let left = current.take().unwrap_or(Algebra::Bgp(Vec::new()));
                    current = Some(Algebra::LeftJoin {
                        left: Box::new(left),
                        right: Box::new(right),
                        filter: None,
                    });
                }
                Some(Token::LBrace) => {
                    flush_bgp(&mut current, &mut bgp);
                    let group = self.parse_group_or_union()?;
                    current = Some(join(current.take(), group));
                }
                Some(_) => {
                    self.parse_triples_same_subject(&mut bgp)?;
                }
                None => return self.error("unterminated group pattern"),
            }
        }
        self.expect(&Token::RBrace)?;

        flush_bgp(&mut current, &mut bgp);
        let mut result = current.unwrap_or(Algebra::Bgp(Vec::new()));
        for expr in filters {
            result = Algebra::Filter {
                expr,
                input: Box::new(result),
            };
        }
        Ok(result)
    }

    fn parse_group_or_union(&mut self) -> SparqlResult<Algebra> {
        let mut result = self.parse_group_graph_pattern()?;
        while self.eat(&Token::Union) {
            let right = self.parse_group_graph_pattern()?;
            result = Algebra::Union(Box::new(result), Box::new(right));
        }
        Ok(result)
    }

    fn parse_triples_same_subject(
        &mut self,
        out: &mut Vec<TriplePattern>,
    ) -> SparqlResult<()> {
        let subject = self.parse_subject()?;
        loop {
            let predicate = self.parse_verb()?;
            loop {
                let object = self.parse_object()?;
                out.push(TriplePattern {
                    subject: subject.clone(),
                    predicate: predicate.clone(),
                    object,
                });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            if self.eat(&Token::Semicolon) {
                // trailing semicolon before the closing brace or dot
                match self.peek() {
                    Some(Token::Dot) | Some(Token::RBrace) | None => break,
                    _ => continue,
                }
            }
            break;
        }
        Ok(())
    }

    fn parse_subject(&mut self) -> SparqlResult<TermOrVar> {
        match self.advance() {
            Some((Token::Var(v), _)) => Ok(TermOrVar::Var(v)),
            Some((Token::Iri(iri), _)) => Ok(TermOrVar::Term(Term::iri(self.resolve_iri(iri)))),
            Some((Token::PrefixedName(p), pos)) => {
                Ok(TermOrVar::Term(Term::iri(self.expand_prefixed(&p, pos)?)))
            }
            Some((t, p)) => Err(SparqlError::Parse {
                position: p,
                message: format!("expected subject, found {t:?}"),
            }),
            None => self.error("expected subject"),
        }
    }

    fn parse_verb(&mut self) -> SparqlResult<PredicatePattern> {
        if let Some(Token::Var(_)) = self.peek() {
            let Some((Token::Var(v), _)) = self.advance() else {
                unreachable!()
            };
            return Ok(PredicatePattern::Var(v));
        }
        Ok(PredicatePattern::Path(self.parse_path()?))
    }

    fn parse_path(&mut self) -> SparqlResult<PropertyPath> {
        let mut path = self.parse_path_sequence()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_path_sequence()?;
            path = PropertyPath::Alternative(Box::new(path), Box::new(right));
        }
        Ok(path)
    }

    fn parse_path_sequence(&mut self) -> SparqlResult<PropertyPath> {
        let mut path = self.parse_path_elt()?;
        while self.eat(&Token::Slash) {
            let right = self.parse_path_elt()?;
            path = PropertyPath::Sequence(Box::new(path), Box::new(right));
        }
        Ok(path)
    }

    fn parse_path_elt(&mut self) -> SparqlResult<PropertyPath> {
        let inverse = self.eat(&Token::Caret);
        let mut path = self.parse_path_primary()?;
        match self.peek() {
            Some(Token::Star) => {
                self.advance();
                path = PropertyPath::ZeroOrMore(Box::new(path));
            }
            Some(Token::Plus) => {
                self.advance();
                path = PropertyPath::OneOrMore(Box::new(path));
            }
            Some(Token::Question) => {
                self.advance();
                path = PropertyPath::ZeroOrOne(Box::new(path));
            }
            _ => {}
        }
        if inverse {
            path = PropertyPath::Inverse(Box::new(path));
        }
        Ok(path)
    }

    fn parse_path_primary(&mut self) -> SparqlResult<PropertyPath> {
        match self.advance() {
            Some((Token::A, _)) => Ok(PropertyPath::Iri(Vocabulary::RDF_TYPE.to_string())),
            Some((Token::Iri(iri), _)) => Ok(PropertyPath::Iri(self.resolve_iri(iri))),
            Some((Token::PrefixedName(p), pos)) => {
                Ok(PropertyPath::Iri(self.expand_prefixed(&p, pos)?))
            }
            Some((Token::LParen, _)) => {
                let path = self.parse_path()?;
                self.expect(&Token::RParen)?;
                Ok(path)
            }
            Some((t, p)) => Err(SparqlError::Parse {
                position: p,
                message: format!("expected predicate, found {t:?}"),
            }),
            None => self.error("expected predicate"),
        }
    }

    fn parse_object(&mut self) -> SparqlResult<TermOrVar> {
        match self.advance() {
            Some((Token::Var(v), _)) => Ok(TermOrVar::Var(v)),
            Some((Token::Iri(iri), _)) => Ok(TermOrVar::Term(Term::iri(self.resolve_iri(iri)))),
            Some((Token::PrefixedName(p), pos)) => {
                Ok(TermOrVar::Term(Term::iri(self.expand_prefixed(&p, pos)?)))
            }
            Some((Token::Integer(n), _)) => Ok(TermOrVar::Term(Term::literal_typed(
                n,
                Vocabulary::XSD_INTEGER,
            ))),
            Some((Token::Decimal(n), _)) => Ok(TermOrVar::Term(Term::literal_typed(
                n,
                Vocabulary::XSD_DECIMAL,
            ))),
            Some((Token::True, _)) => Ok(TermOrVar::Term(Term::literal_typed(
                "true",
                Vocabulary::XSD_BOOLEAN,
            ))),
            Some((Token::False, _)) => Ok(TermOrVar::Term(Term::literal_typed(
                "false",
                Vocabulary::XSD_BOOLEAN,
            ))),
            Some((Token::Str(value), _)) => Ok(TermOrVar::Term(self.finish_literal(value)?)),
            Some((t, p)) => Err(SparqlError::Parse {
                position: p,
                message: format!("expected object, found {t:?}"),
            }),
            None => self.error("expected object"),
        }
    }

    fn finish_literal(&mut self, value: String) -> SparqlResult<Term> {
        match self.peek() {
            Some(Token::LangTag(_)) => {
                let Some((Token::LangTag(lang), _)) = self.advance() else {
                    unreachable!()
                };
                Ok(Term::literal_lang(value, lang))
            }
            Some(Token::DatatypeMarker) => {
                self.advance();
                let datatype = match self.advance() {
                    Some((Token::Iri(iri), _)) => self.resolve_iri(iri),
                    Some((Token::PrefixedName(p), pos)) => self.expand_prefixed(&p, pos)?,
                    Some((t, p)) => {
                        return Err(SparqlError::Parse {
                            position: p,
                            message: format!("expected datatype IRI, found {t:?}"),
                        })
                    }
                    None => return self.error("expected datatype IRI"),
                };
                Ok(Term::literal_typed(value, datatype))
            }
            _ => Ok(Term::literal(value)),
        }
    }

    // --- filter expressions ----------------------------------------------

    fn parse_constraint(&mut self) -> SparqlResult<Expression> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            _ => self.parse_builtin(),
        }
    }

    fn parse_expression(&mut self) -> SparqlResult<Expression> {
        let mut expr = self.parse_and_expression()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and_expression()?;
            expr = Expression::Or(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_and_expression(&mut self) -> SparqlResult<Expression> {
        let mut expr = self.parse_relational()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_relational()?;
            expr = Expression::And(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_relational(&mut self) -> SparqlResult<Expression> {
        let left = self.parse_primary_expression()?;
        let op = match self.peek() {
            Some(Token::CmpEq) => Some(CompareOp::Eq),
            Some(Token::CmpNe) => Some(CompareOp::Ne),
            Some(Token::CmpLt) => Some(CompareOp::Lt),
            Some(Token::CmpLe) => Some(CompareOp::Le),
            Some(Token::CmpGt) => Some(CompareOp::Gt),
            Some(Token::CmpGe) => Some(CompareOp::Ge),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let right = self.parse_primary_expression()?;
                Ok(Expression::Compare(op, Box::new(left), Box::new(right)))
            }
            None => Ok(left),
        }
    }

    fn parse_primary_expression(&mut self) -> SparqlResult<Expression> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Bang) => {
                self.advance();
                let inner = self.parse_primary_expression()?;
                Ok(Expression::Not(Box::new(inner)))
            }
            Some(Token::Regex) | Some(Token::Bound) | Some(Token::IsIri)
            | Some(Token::IsLiteral) => self.parse_builtin(),
            Some(Token::Var(_)) => {
                let Some((Token::Var(v), _)) = self.advance() else {
                    unreachable!()
                };
                Ok(Expression::Var(v))
            }
            Some(Token::Iri(_)) => {
                let Some((Token::Iri(iri), _)) = self.advance() else {
                    unreachable!()
                };
                Ok(Expression::Constant(Term::iri(self.resolve_iri(iri))))
            }
            Some(Token::PrefixedName(_)) => {
                let Some((Token::PrefixedName(p), pos)) = self.advance() else {
                    unreachable!()
                };
                Ok(Expression::Constant(Term::iri(
                    self.expand_prefixed(&p, pos)?,
                )))
            }
            Some(Token::Str(_)) => {
                let Some((Token::Str(value), _)) = self.advance() else {
                    unreachable!()
                };
                Ok(Expression::Constant(self.finish_literal(value)?))
            }
            Some(Token::Integer(_)) => {
                let Some((Token::Integer(n), _)) = self.advance() else {
                    unreachable!()
                };
                Ok(Expression::Constant(Term::literal_typed(
                    n,
                    Vocabulary::XSD_INTEGER,
                )))
            }
            Some(Token::Decimal(_)) => {
                let Some((Token::Decimal(n), _)) = self.advance() else {
                    unreachable!()
                };
                Ok(Expression::Constant(Term::literal_typed(
                    n,
                    Vocabulary::XSD_DECIMAL,
                )))
            }
            Some(Token::True) => {
                self.advance();
                Ok(Expression::Constant(Term::literal_typed(
                    "true",
                    Vocabulary::XSD_BOOLEAN,
                )))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Expression::Constant(Term::literal_typed(
                    "false",
                    Vocabulary::XSD_BOOLEAN,
                )))
            }
            Some(other) => {
                let other = other.clone();
                self.error(format!("expected expression, found {other:?}"))
            }
            None => self.error("expected expression"),
        }
    }

    fn parse_builtin(&mut self) -> SparqlResult<Expression> {
        match self.advance() {
            Some((Token::Regex, _)) => {
                self.expect(&Token::LParen)?;
                let text = self.parse_expression()?;
                self.expect(&Token::Comma)?;
                let pattern = self.parse_expression()?;
                let flags = if self.eat(&Token::Comma) {
                    Some(Box::new(self.parse_expression()?))
                } else {
                    None
                };
                self.expect(&Token::RParen)?;
                Ok(Expression::Regex(Box::new(text), Box::new(pattern), flags))
            }
            Some((Token::Bound, _)) => {
                self.expect(&Token::LParen)?;
                let var = match self.advance() {
                    Some((Token::Var(v), _)) => v,
                    Some((t, p)) => {
                        return Err(SparqlError::Parse {
                            position: p,
                            message: format!("BOUND expects a variable, found {t:?}"),
                        })
                    }
                    None => return self.error("BOUND expects a variable"),
                };
                self.expect(&Token::RParen)?;
                Ok(Expression::Bound(var))
            }
            Some((Token::IsIri, _)) => {
                self.expect(&Token::LParen)?;
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(Expression::IsIri(Box::new(inner)))
            }
            Some((Token::IsLiteral, _)) => {
                self.expect(&Token::LParen)?;
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(Expression::IsLiteral(Box::new(inner)))
            }
            Some((t, p)) => Err(SparqlError::Parse {
                position: p,
                message: format!("expected FILTER constraint, found {t:?}"),
            }),
            None => self.error("expected FILTER constraint"),
        }
    }

    // --- solution modifiers ----------------------------------------------

    fn parse_group_by(&mut self) -> SparqlResult<Vec<String>> {
        if self.peek() != Some(&Token::Group) {
            return Ok(Vec::new());
        }
        self.advance();
        self.expect(&Token::By)?;
        let mut vars = Vec::new();
        while let Some(Token::Var(_)) = self.peek() {
            let Some((Token::Var(v), _)) = self.advance() else {
                unreachable!()
            };
            vars.push(v);
        }
        if vars.is_empty() {
            return self.error("GROUP BY needs at least one variable");
        }
        Ok(vars)
    }

    fn parse_order_by(&mut self) -> SparqlResult<Vec<OrderCondition>> {
        if self.peek() != Some(&Token::Order) {
            return Ok(Vec::new());
        }
        self.advance();
        self.expect(&Token::By)?;
        let mut conditions = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Asc) | Some(Token::Desc) => {
                    let descending = self.peek() == Some(&Token::Desc);
                    self.advance();
                    self.expect(&Token::LParen)?;
                    let expr = self.parse_expression()?;
                    self.expect(&Token::RParen)?;
                    conditions.push(OrderCondition { expr, descending });
                }
                Some(Token::Var(_)) => {
                    let Some((Token::Var(v), _)) = self.advance() else {
                        unreachable!()
                    };
                    conditions.push(OrderCondition {
                        expr: Expression::Var(v),
                        descending: false,
                    });
                }
                _ => break,
            }
        }
        if conditions.is_empty() {
            return self.error("ORDER BY needs at least one condition");
        }
        Ok(conditions)
    }

    fn parse_limit_offset(&mut self) -> SparqlResult<(Option<usize>, usize)> {
        let mut limit = None;
        let mut offset = 0;
        loop {
            match self.peek() {
                Some(Token::Limit) => {
                    self.advance();
                    limit = Some(self.expect_usize()?);
                }
                Some(Token::Offset) => {
                    self.advance();
                    offset = self.expect_usize()?;
                }
                _ => return Ok((limit, offset)),
            }
        }
    }

    fn expect_usize(&mut self) -> SparqlResult<usize> {
        match self.advance() {
            Some((Token::Integer(n), p)) => n.parse().map_err(|_| SparqlError::Parse {
                position: p,
                message: format!("bad integer: {n}"),
            }),
            Some((t, p)) => Err(SparqlError::Parse {
                position: p,
                message: format!("expected integer, found {t:?}"),
            }),
            None => self.error("expected integer"),
        }
    }
}

fn flush_bgp(current: &mut Option<Algebra>, bgp: &mut Vec<TriplePattern>) {
    if bgp.is_empty() {
        return;
    }
    let block = Algebra::Bgp(std::mem::take(bgp));
    *current = Some(join(current.take(), block));
}

fn join(left: Option<Algebra>, right: Algebra) -> Algebra {
    match left {
        Some(l) => Algebra::Join(Box::new(l), Box::new(right)),
        None => right,
    }
}
