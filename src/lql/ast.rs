//! Expression tree for tag conditions.
//!
//! The tree is produced by the query-language parser; here it is only
//! modelled, deserialized and rendered back to text.
//!
//! Shape:
//!   Expression  = OrCondition ("OR" OrCondition)*
//!   OrCondition = XCondition ("AND" XCondition)*
//!   XCondition  = ["NOT"] (Condition | "(" Expression ")")
//!   Condition   = operand operator value

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root of a tags filter: OR of the contained conditions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Expression {
    #[serde(default)]
    pub or: Vec<OrCondition>,
}

/// AND of the contained terms.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OrCondition {
    #[serde(default)]
    pub and: Vec<XCondition>,
}

/// A single, optionally negated term.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct XCondition {
    #[serde(default)]
    pub not: bool,
    #[serde(flatten)]
    pub term: Term,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    /// Leaf comparison: `env = "prod"`
    Cond(Condition),
    /// Parenthesized sub-expression
    Expr(Expression),
}

/// Leaf comparison of a tag value against a literal.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Condition {
    pub operand: String,
    pub op: String,
    pub value: String,
}

impl Expression {
    pub fn new(or: Vec<OrCondition>) -> Self {
        Self { or }
    }
}

impl OrCondition {
    pub fn new(and: Vec<XCondition>) -> Self {
        Self { and }
    }
}

impl XCondition {
    pub fn cond(operand: &str, op: &str, value: &str) -> Self {
        Self {
            not: false,
            term: Term::Cond(Condition {
                operand: operand.to_string(),
                op: op.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn expr(expr: Expression) -> Self {
        Self {
            not: false,
            term: Term::Expr(expr),
        }
    }

    pub fn negate(mut self) -> Self {
        self.not = !self.not;
        self
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, oc) in self.or.iter().enumerate() {
            if i > 0 {
                write!(f, " OR ")?;
            }
            write!(f, "{}", oc)?;
        }
        Ok(())
    }
}

impl fmt::Display for OrCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, xc) in self.and.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", xc)?;
        }
        Ok(())
    }
}

impl fmt::Display for XCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.not {
            write!(f, "NOT ")?;
        }
        match &self.term {
            Term::Cond(cond) => write!(f, "{}", cond),
            Term::Expr(expr) => write!(f, "({})", expr),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.operand, self.op, self.value)
    }
}
