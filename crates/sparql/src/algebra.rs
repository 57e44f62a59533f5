//! SPARQL query algebra
//!
//! Owned operator tree produced by the parser and consumed by the
//! planner and evaluator. The operator set is closed; anything the
//! grammar accepts maps onto one of these nodes.

use rdf_model::Term;

/// A term or a variable in a pattern position
#[derive(Clone, Debug, PartialEq)]
pub enum TermOrVar {
    /// Concrete term
    Term(Term),
    /// Named variable
    Var(String),
}

impl TermOrVar {
    /// Variable name, if this is a variable
    pub fn as_var(&self) -> Option<&str> {
        match self {
            TermOrVar::Var(v) => Some(v),
            TermOrVar::Term(_) => None,
        }
    }
}

/// Property path over predicate position
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyPath {
    /// Plain predicate IRI
    Iri(String),
    /// `^p`: inverse
    Inverse(Box<PropertyPath>),
    /// `p / q`: sequence
    Sequence(Box<PropertyPath>, Box<PropertyPath>),
    /// `p | q`: alternative
    Alternative(Box<PropertyPath>, Box<PropertyPath>),
    /// `p*`: reflexive transitive closure
    ZeroOrMore(Box<PropertyPath>),
    /// `p+`: transitive closure
    OneOrMore(Box<PropertyPath>),
    /// `p?`: zero or one
    ZeroOrOne(Box<PropertyPath>),
}

impl PropertyPath {
    /// Check whether this is a plain predicate
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            PropertyPath::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

/// Predicate position of a triple pattern
#[derive(Clone, Debug, PartialEq)]
pub enum PredicatePattern {
    /// Variable predicate
    Var(String),
    /// Concrete predicate or path expression
    Path(PropertyPath),
}

/// One triple pattern inside a basic graph pattern
#[derive(Clone, Debug, PartialEq)]
pub struct TriplePattern {
    /// Subject position
    pub subject: TermOrVar,
    /// Predicate position
    pub predicate: PredicatePattern,
    /// Object position
    pub object: TermOrVar,
}

/// Comparison operators usable in FILTER
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// FILTER expression tree
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// Variable reference
    Var(String),
    /// Constant term
    Constant(Term),
    /// Logical or
    Or(Box<Expression>, Box<Expression>),
    /// Logical and
    And(Box<Expression>, Box<Expression>),
    /// Logical negation
    Not(Box<Expression>),
    /// Binary comparison
    Compare(CompareOp, Box<Expression>, Box<Expression>),
    /// `REGEX(text, pattern[, flags])`
    Regex(Box<Expression>, Box<Expression>, Option<Box<Expression>>),
    /// `BOUND(?v)`
    Bound(String),
    /// `isIRI(e)`
    IsIri(Box<Expression>),
    /// `isLITERAL(e)`
    IsLiteral(Box<Expression>),
}

/// Algebra operators over binding sets
#[derive(Clone, Debug, PartialEq)]
pub enum Algebra {
    /// Basic graph pattern
    Bgp(Vec<TriplePattern>),
    /// Inner join of two groups
    Join(Box<Algebra>, Box<Algebra>),
    /// OPTIONAL
    LeftJoin {
        /// Required side
        left: Box<Algebra>,
        /// Optional side
        right: Box<Algebra>,
        /// Filter scoped to the optional side
        filter: Option<Expression>,
    },
    /// UNION of two groups
    Union(Box<Algebra>, Box<Algebra>),
    /// FILTER over a group
    Filter {
        /// Constraint expression
        expr: Expression,
        /// Input operator
        input: Box<Algebra>,
    },
}

impl Algebra {
    /// Collect the variables this operator tree can bind, in first-seen order
    pub fn visible_vars(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, out: &mut Vec<String>) {
        let mut push = |name: &str| {
            if !out.iter().any(|v| v == name) {
                out.push(name.to_string());
            }
        };
        match self {
            Algebra::Bgp(patterns) => {
                for p in patterns {
                    if let Some(v) = p.subject.as_var() {
                        push(v);
                    }
                    if let PredicatePattern::Var(v) = &p.predicate {
                        push(v);
                    }
                    if let Some(v) = p.object.as_var() {
                        push(v);
                    }
                }
            }
            Algebra::Join(l, r) | Algebra::Union(l, r) => {
                l.collect_vars(out);
                r.collect_vars(out);
            }
            Algebra::LeftJoin { left, right, .. } => {
                left.collect_vars(out);
                right.collect_vars(out);
            }
            Algebra::Filter { input, .. } => input.collect_vars(out),
        }
    }
}

/// Item of a SELECT clause
#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    /// Plain variable
    Var(String),
    /// `(COUNT(*) AS ?alias)` / `(COUNT(?v) AS ?alias)`
    Count {
        /// Counted variable; `None` counts rows
        var: Option<String>,
        /// Count only distinct values
        distinct: bool,
        /// Output variable name
        alias: String,
    },
}

/// SELECT projection
#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    /// `SELECT *`
    All,
    /// Explicit item list
    Items(Vec<SelectItem>),
}

/// One ORDER BY condition
#[derive(Clone, Debug, PartialEq)]
pub struct OrderCondition {
    /// Sort key expression (a variable in the supported subset)
    pub expr: Expression,
    /// Descending order
    pub descending: bool,
}

/// Query form: what the result looks like
#[derive(Clone, Debug, PartialEq)]
pub enum QueryForm {
    /// Variable bindings
    Select {
        /// DISTINCT flag
        distinct: bool,
        /// Projection list
        projection: Projection,
        /// GROUP BY variables
        group_by: Vec<String>,
    },
    /// Boolean
    Ask,
    /// Instantiated template triples
    Construct {
        /// Template to instantiate per solution
        template: Vec<TriplePattern>,
    },
}

/// A parsed query
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    /// Result form
    pub form: QueryForm,
    /// WHERE clause operator tree
    pub pattern: Algebra,
    /// ORDER BY conditions
    pub order_by: Vec<OrderCondition>,
    /// LIMIT
    pub limit: Option<usize>,
    /// OFFSET
    pub offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_vars_dedup() {
        let bgp = Algebra::Bgp(vec![
            TriplePattern {
                subject: TermOrVar::Var("s".into()),
                predicate: PredicatePattern::Var("p".into()),
                object: TermOrVar::Var("o".into()),
            },
            TriplePattern {
                subject: TermOrVar::Var("s".into()),
                predicate: PredicatePattern::Path(PropertyPath::Iri("http://ex.org/q".into())),
                object: TermOrVar::Var("x".into()),
            },
        ]);
        assert_eq!(bgp.visible_vars(), vec!["s", "p", "o", "x"]);
    }
}
