//! The predicate tree and its boolean algebra.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use itemstore_api_rs::models::Value;

use super::lookup::{split_key, Lookup, Op, Suffix};
use crate::error::{QueryError, Result};

/// How the children of a group are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conn {
    And,
    Or,
    /// Negation of the AND of all children.
    Not,
}

impl Conn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conn::And => "AND",
            Conn::Or => "OR",
            Conn::Not => "NOT",
        }
    }
}

/// A boolean predicate over item fields.
///
/// The empty group (`Q::all()`) matches everything and compiles to no
/// restriction at all. Empty children are dropped when combining, so
/// `Q::all() & q` and `Q::all() | q` both behave like `q`.
#[derive(Debug, Clone, PartialEq)]
pub enum Q {
    Leaf(Lookup),
    Group { conn: Conn, children: Vec<Q> },
}

impl Default for Q {
    fn default() -> Self {
        Self::all()
    }
}

impl From<Lookup> for Q {
    fn from(lookup: Lookup) -> Self {
        Q::Leaf(lookup)
    }
}

impl Q {
    /// The identity predicate: matches everything.
    pub fn all() -> Self {
        Q::Group {
            conn: Conn::And,
            children: Vec::new(),
        }
    }

    /// A leaf comparison.
    pub fn leaf(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Q::Leaf(Lookup::new(field, op, value))
    }

    /// A group of predicates. Empty children are dropped.
    pub fn group(conn: Conn, children: impl IntoIterator<Item = Q>) -> Self {
        Q::Group {
            conn,
            children: children.into_iter().filter(|c| !c.is_empty()).collect(),
        }
    }

    /// The AND of all given predicates.
    pub fn all_of(children: impl IntoIterator<Item = Q>) -> Self {
        Self::group(Conn::And, children)
    }

    /// The OR of all given predicates.
    pub fn any_of(children: impl IntoIterator<Item = Q>) -> Self {
        Self::group(Conn::Or, children)
    }

    /// Builds a predicate from a `field__suffix` lookup key.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidLiteral` for a null value, a `range` value
    /// that is not a two-element list, or a non-boolean `exists` value.
    pub fn kw(key: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        if value.is_null() {
            return Err(QueryError::invalid_literal(key, &value, "value cannot be None"));
        }
        let (field, suffix) = split_key(key);
        let op = match suffix {
            Suffix::Range => {
                let (low, high) = match value.as_list() {
                    Some([low, high]) => (low.clone(), high.clone()),
                    _ => {
                        return Err(QueryError::invalid_literal(
                            key,
                            &value,
                            "range requires exactly 2 elements",
                        ))
                    }
                };
                return Ok(Q::all_of([
                    Q::leaf(field, Op::Gte, low),
                    Q::leaf(field, Op::Lte, high),
                ]));
            }
            Suffix::Op(op) => op,
        };
        if op == Op::Exists {
            return match value {
                Value::Bool(true) => Ok(Q::leaf(field, Op::Exists, true)),
                Value::Bool(false) => Ok(Q::leaf(field, Op::Exists, true).negate()),
                other => Err(QueryError::invalid_literal(
                    key,
                    &other,
                    "exists requires true or false",
                )),
            };
        }
        Ok(Q::leaf(field, op, value))
    }

    /// The AND of several lookup keys, in the given order.
    pub fn kws<K, V, I>(lookups: I) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let children = lookups
            .into_iter()
            .map(|(k, v)| Q::kw(k.as_ref(), v))
            .collect::<Result<Vec<_>>>()?;
        Ok(match children.len() {
            1 => children.into_iter().next().unwrap_or_default(),
            _ => Q::all_of(children),
        })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Q::Leaf(_))
    }

    /// True for the identity predicate (a group without children).
    pub fn is_empty(&self) -> bool {
        matches!(self, Q::Group { children, .. } if children.is_empty())
    }

    /// Logical AND of two predicates.
    pub fn and(self, other: Q) -> Q {
        Q::group(Conn::And, [self, other])
    }

    /// Logical OR of two predicates.
    pub fn or(self, other: Q) -> Q {
        Q::group(Conn::Or, [self, other])
    }

    /// Logical negation.
    ///
    /// A leaf with an invertible operator has its operator flipped instead of
    /// being wrapped (`==` ↔ `!=`, `>` ↔ `<=`, `>=` ↔ `<`). Negating a NOT
    /// group turns it back into an AND group. The identity stays the identity.
    pub fn negate(self) -> Q {
        match self {
            Q::Leaf(lookup) => match lookup.op.inverse() {
                Some(inverse) => Q::Leaf(Lookup { op: inverse, ..lookup }),
                None => Q::Group {
                    conn: Conn::Not,
                    children: vec![Q::Leaf(lookup)],
                },
            },
            Q::Group {
                conn: Conn::Not,
                children,
            } => Q::Group {
                conn: Conn::And,
                children,
            },
            q if q.is_empty() => q,
            q => Q::Group {
                conn: Conn::Not,
                children: vec![q],
            },
        }
    }

    /// Descends through single-child AND/OR groups, which carry no meaning.
    pub(crate) fn flattened(&self) -> &Q {
        match self {
            Q::Group { conn, children } if *conn != Conn::Not && children.len() == 1 => {
                children[0].flattened()
            }
            q => q,
        }
    }

    /// Key used to order sibling predicates deterministically.
    pub(crate) fn sort_key(&self) -> &str {
        match self.flattened() {
            Q::Leaf(lookup) => &lookup.field,
            Q::Group { .. } => "",
        }
    }

    /// Children sorted by [`Q::sort_key`], stable for equal keys.
    pub(crate) fn sorted_children(children: &[Q]) -> Vec<&Q> {
        let mut sorted: Vec<&Q> = children.iter().collect();
        sorted.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
        sorted
    }

    /// Applies `f` to every leaf, rebuilding the tree with the results.
    pub(crate) fn try_map_leaves<F>(self, f: &mut F) -> Result<Q>
    where
        F: FnMut(Lookup) -> Result<Q>,
    {
        match self {
            Q::Leaf(lookup) => f(lookup),
            Q::Group { conn, children } => {
                let children = children
                    .into_iter()
                    .map(|c| c.try_map_leaves(f))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Q::Group { conn, children })
            }
        }
    }

    /// Renders the predicate as an expression string, or `None` for the identity.
    pub fn expr(&self) -> Option<String> {
        let expr = match self {
            Q::Leaf(lookup) => lookup.to_string(),
            Q::Group { children, .. } if children.is_empty() => return None,
            Q::Group { children, .. } if children.len() == 1 => children[0].expr()?,
            Q::Group { conn, children } => {
                let joiner = match conn {
                    Conn::Or => " OR ",
                    Conn::And | Conn::Not => " AND ",
                };
                let parts = Self::sorted_children(children)
                    .into_iter()
                    .filter_map(|c| {
                        let inner = c.expr()?;
                        Some(match c.flattened() {
                            Q::Leaf(_) | Q::Group { conn: Conn::Not, .. } => inner,
                            _ => format!("({})", inner),
                        })
                    })
                    .collect::<Vec<_>>();
                if parts.is_empty() {
                    return None;
                }
                parts.join(joiner)
            }
        };
        if let Q::Group {
            conn: Conn::Not,
            children,
        } = self
        {
            let atomic = children.len() == 1 && children[0].flattened().is_leaf();
            return Some(if atomic {
                format!("NOT {}", expr)
            } else {
                format!("NOT ({})", expr)
            });
        }
        Some(expr)
    }
}

impl fmt::Display for Q {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr() {
            Some(expr) => f.write_str(&expr),
            None => f.write_str("Q()"),
        }
    }
}

impl BitAnd for Q {
    type Output = Q;

    fn bitand(self, rhs: Q) -> Q {
        self.and(rhs)
    }
}

impl BitOr for Q {
    type Output = Q;

    fn bitor(self, rhs: Q) -> Q {
        self.or(rhs)
    }
}

impl Not for Q {
    type Output = Q;

    fn not(self) -> Q {
        self.negate()
    }
}
