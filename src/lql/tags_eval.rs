//! Compiler from tag condition trees to reusable predicates.

use super::ast::{Condition, Expression, OrCondition, Term, XCondition};
use super::error::CompileError;
use super::glob::GlobPattern;
use crate::model::TagMap;
use std::fmt;
use std::sync::Arc;

/// String comparison operator. Values are compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq, // =
    Ne, // !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl CompareOp {
    fn apply(self, left: &str, right: &str) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::Ne => write!(f, "!="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
        }
    }
}

/// Caller-supplied check embedded in a predicate.
#[derive(Clone)]
pub struct TagsFn(Arc<dyn Fn(&TagMap) -> bool + Send + Sync>);

impl fmt::Debug for TagsFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TagsFn")
    }
}

/// A compiled tags filter.
///
/// Combinators evaluate left to right and stop as soon as the result is
/// known. Evaluation never fails: a missing tag reads as "" for comparisons
/// and makes LIKE, CONTAINS, HAS_PREFIX and HAS_SUFFIX false.
#[derive(Debug, Clone)]
pub enum TagsPredicate {
    Const(bool),
    And(Box<TagsPredicate>, Box<TagsPredicate>),
    Or(Box<TagsPredicate>, Box<TagsPredicate>),
    Not(Box<TagsPredicate>),
    Compare {
        tag: String,
        op: CompareOp,
        value: String,
    },
    Like {
        tag: String,
        pattern: GlobPattern,
    },
    Contains {
        tag: String,
        value: String,
    },
    HasPrefix {
        tag: String,
        value: String,
    },
    HasSuffix {
        tag: String,
        value: String,
    },
    Func(TagsFn),
}

impl TagsPredicate {
    pub fn matches(&self, tags: &TagMap) -> bool {
        match self {
            TagsPredicate::Const(res) => *res,
            TagsPredicate::And(left, right) => left.matches(tags) && right.matches(tags),
            TagsPredicate::Or(left, right) => left.matches(tags) || right.matches(tags),
            TagsPredicate::Not(inner) => !inner.matches(tags),
            TagsPredicate::Compare { tag, op, value } => {
                let actual = tags.get(tag).map(String::as_str).unwrap_or("");
                op.apply(actual, value)
            }
            TagsPredicate::Like { tag, pattern } => {
                tags.get(tag).is_some_and(|actual| pattern.matches(actual))
            }
            TagsPredicate::Contains { tag, value } => tags
                .get(tag)
                .is_some_and(|actual| actual.contains(value.as_str())),
            TagsPredicate::HasPrefix { tag, value } => tags
                .get(tag)
                .is_some_and(|actual| actual.starts_with(value.as_str())),
            TagsPredicate::HasSuffix { tag, value } => tags
                .get(tag)
                .is_some_and(|actual| actual.ends_with(value.as_str())),
            TagsPredicate::Func(f) => (f.0)(tags),
        }
    }

    pub fn and(self, other: TagsPredicate) -> TagsPredicate {
        TagsPredicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: TagsPredicate) -> TagsPredicate {
        TagsPredicate::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> TagsPredicate {
        TagsPredicate::Not(Box::new(self))
    }

    /// Wrap an arbitrary check so it can be combined with compiled filters.
    pub fn from_fn<F>(f: F) -> TagsPredicate
    where
        F: Fn(&TagMap) -> bool + Send + Sync + 'static,
    {
        TagsPredicate::Func(TagsFn(Arc::new(f)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagOp {
    Compare(CompareOp),
    Like,
    Contains,
    HasPrefix,
    HasSuffix,
}

/// Supported operator tokens, upper case.
const TAG_OPS: &[(&str, TagOp)] = &[
    ("<", TagOp::Compare(CompareOp::Lt)),
    (">", TagOp::Compare(CompareOp::Gt)),
    ("<=", TagOp::Compare(CompareOp::Le)),
    (">=", TagOp::Compare(CompareOp::Ge)),
    ("!=", TagOp::Compare(CompareOp::Ne)),
    ("=", TagOp::Compare(CompareOp::Eq)),
    ("LIKE", TagOp::Like),
    ("CONTAINS", TagOp::Contains),
    ("HAS_PREFIX", TagOp::HasPrefix),
    ("HAS_SUFFIX", TagOp::HasSuffix),
];

impl TagOp {
    fn lookup(token: &str) -> Option<TagOp> {
        let token = token.to_uppercase();
        TAG_OPS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, op)| *op)
    }

    fn build(self, cond: &Condition) -> Result<TagsPredicate, CompileError> {
        let tag = cond.operand.clone();
        let value = cond.value.clone();
        let predicate = match self {
            TagOp::Compare(op) => TagsPredicate::Compare { tag, op, value },
            TagOp::Like => {
                let pattern =
                    GlobPattern::parse(&value).map_err(|source| CompileError::InvalidPattern {
                        tag: tag.clone(),
                        pattern: value,
                        source,
                    })?;
                TagsPredicate::Like { tag, pattern }
            }
            TagOp::Contains => TagsPredicate::Contains { tag, value },
            TagOp::HasPrefix => TagsPredicate::HasPrefix { tag, value },
            TagOp::HasSuffix => TagsPredicate::HasSuffix { tag, value },
        };
        Ok(predicate)
    }
}

/// Compile a tags expression into a predicate.
///
/// An absent expression matches everything. The whole tree is validated
/// here; the first invalid condition aborts compilation.
pub fn compile_tags_expr(expr: Option<&Expression>) -> Result<TagsPredicate, CompileError> {
    let Some(expr) = expr else {
        return Ok(TagsPredicate::Const(true));
    };

    let predicate = compile_or(&expr.or)?;
    tracing::debug!("Compiled tags expression: {}", expr);
    Ok(predicate)
}

fn compile_or(conds: &[OrCondition]) -> Result<TagsPredicate, CompileError> {
    fold_left(conds, |oc| compile_and(&oc.and), TagsPredicate::or)
}

fn compile_and(conds: &[XCondition]) -> Result<TagsPredicate, CompileError> {
    fold_left(conds, compile_term, TagsPredicate::and)
}

fn compile_term(xc: &XCondition) -> Result<TagsPredicate, CompileError> {
    let predicate = match &xc.term {
        Term::Expr(expr) => compile_or(&expr.or)?,
        Term::Cond(cond) => compile_leaf(cond)?,
    };

    if xc.not {
        Ok(predicate.not())
    } else {
        Ok(predicate)
    }
}

fn compile_leaf(cond: &Condition) -> Result<TagsPredicate, CompileError> {
    match TagOp::lookup(&cond.op) {
        Some(op) => op.build(cond),
        None => Err(CompileError::UnsupportedOperator {
            op: cond.op.clone(),
            tag: cond.operand.clone(),
        }),
    }
}

/// Compile each item and chain the results left to right; empty means true.
fn fold_left<T>(
    items: &[T],
    compile: impl Fn(&T) -> Result<TagsPredicate, CompileError>,
    combine: fn(TagsPredicate, TagsPredicate) -> TagsPredicate,
) -> Result<TagsPredicate, CompileError> {
    let mut iter = items.iter();
    let Some(first) = iter.next() else {
        return Ok(TagsPredicate::Const(true));
    };

    iter.try_fold(
        compile(first)?,
        |acc, item| -> Result<TagsPredicate, CompileError> { Ok(combine(acc, compile(item)?)) },
    )
}
