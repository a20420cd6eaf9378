//! Comparison operators and single-field lookups.

use std::fmt;

use itemstore_api_rs::fields::PATH_SEPARATOR;
use itemstore_api_rs::models::Value;

/// A comparison operator of a leaf predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Exact,
    IExact,
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    /// Equal to any element of a list literal. Expanded at compile time.
    In,
    Exists,
}

/// What a lookup key suffix asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Suffix {
    Op(Op),
    /// Two-sided inclusive range; never stored in a tree.
    Range,
}

impl Op {
    /// Parses a lookup key suffix.
    pub(crate) fn from_suffix(suffix: &str) -> Option<Suffix> {
        let op = match suffix {
            "range" => return Some(Suffix::Range),
            "not" => Op::Ne,
            "gt" => Op::Gt,
            "gte" => Op::Gte,
            "lt" => Op::Lt,
            "lte" => Op::Lte,
            "exact" => Op::Exact,
            "iexact" => Op::IExact,
            "contains" => Op::Contains,
            "icontains" => Op::IContains,
            "startswith" => Op::StartsWith,
            "istartswith" => Op::IStartsWith,
            "in" => Op::In,
            "exists" => Op::Exists,
            _ => return None,
        };
        Some(Suffix::Op(op))
    }

    /// The lookup key suffix for this operator (`""` for equality).
    pub fn suffix(&self) -> &'static str {
        match self {
            Op::Eq => "",
            Op::Ne => "not",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Exact => "exact",
            Op::IExact => "iexact",
            Op::Contains => "contains",
            Op::IContains => "icontains",
            Op::StartsWith => "startswith",
            Op::IStartsWith => "istartswith",
            Op::In => "in",
            Op::Exists => "exists",
        }
    }

    /// The symbol used in predicate expression strings.
    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            other => other.suffix(),
        }
    }

    /// The operator that matches exactly the complement, if there is one.
    pub fn inverse(&self) -> Option<Op> {
        match self {
            Op::Eq => Some(Op::Ne),
            Op::Ne => Some(Op::Eq),
            Op::Gt => Some(Op::Lte),
            Op::Lte => Some(Op::Gt),
            Op::Gte => Some(Op::Lt),
            Op::Lt => Some(Op::Gte),
            _ => None,
        }
    }

    /// Binary comparisons against a single literal.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Op::Eq | Op::Ne | Op::Gt | Op::Gte | Op::Lt | Op::Lte
        )
    }

    /// Substring, prefix and full-string matches.
    pub fn is_containment(&self) -> bool {
        matches!(
            self,
            Op::Exact
                | Op::IExact
                | Op::Contains
                | Op::IContains
                | Op::StartsWith
                | Op::IStartsWith
        )
    }

    pub fn is_case_insensitive(&self) -> bool {
        matches!(self, Op::IExact | Op::IContains | Op::IStartsWith)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single comparison: `field op value`.
///
/// `field` is a field path string and may name a labeled entry and sub-field
/// (`physical_addresses__Home__city`).
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

impl Lookup {
    pub fn new(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// The lookup key that produces this leaf (`size__gte`).
    pub fn key(&self) -> String {
        match self.op {
            Op::Eq => self.field.clone(),
            op => format!("{}{}{}", self.field, PATH_SEPARATOR, op.suffix()),
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

/// Splits a lookup key on its last separator into a field path and a suffix.
///
/// A trailing segment that is not a known suffix is kept as part of the path
/// (it may be a label); the resolver rejects it later if the field has no
/// such label.
pub(crate) fn split_key(key: &str) -> (&str, Suffix) {
    if let Some((path, suffix)) = key.rsplit_once(PATH_SEPARATOR) {
        if let Some(parsed) = Op::from_suffix(suffix) {
            return (path, parsed);
        }
    }
    (key, Suffix::Op(Op::Eq))
}
