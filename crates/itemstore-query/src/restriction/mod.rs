//! Compiled restrictions.
//!
//! A [`CompiledRestriction`] is the wire-ready form of a predicate: a tree of
//! [`Expr`] nodes naming store field URIs and carrying literals already
//! rendered to wire text. It is produced by [`compile`], rendered with
//! [`CompiledRestriction::to_xml`], and can be evaluated locally against an
//! item with [`CompiledRestriction::matches`].
//!
//! # Example
//!
//! ```
//! use itemstore_api_rs::fields::FieldCatalog;
//! use itemstore_query_rs::predicate::Q;
//! use itemstore_query_rs::restriction::compile;
//!
//! let catalog = FieldCatalog::standard();
//! let q = Q::kw("subject", "Hi").unwrap();
//! let restriction = compile(&q, &catalog).unwrap().unwrap();
//! assert!(restriction.to_xml().contains(r#"<t:Constant Value="Hi"/>"#));
//!
//! // The identity predicate compiles to no restriction at all.
//! assert!(compile(&Q::all(), &catalog).unwrap().is_none());
//! ```

mod compile;
mod evaluate;
mod xml;

pub use compile::compile;

use std::fmt;

use itemstore_api_rs::fields::FieldPath;
use itemstore_api_rs::models::Value;

use crate::coerce::format_literal;
use crate::error::Result;

/// The store's name for a field, optionally narrowed to one labeled entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUri {
    /// `item:Subject`, or the sub-field URI for record sub-fields.
    pub uri: String,
    /// Label of the entry of an indexed field.
    pub index: Option<String>,
    /// The field path this URI was resolved from.
    pub path: FieldPath,
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// The XML element name of the comparison.
    pub fn element(&self) -> &'static str {
        match self {
            CompareOp::Eq => "t:IsEqualTo",
            CompareOp::Ne => "t:IsNotEqualTo",
            CompareOp::Gt => "t:IsGreaterThan",
            CompareOp::Gte => "t:IsGreaterThanOrEqualTo",
            CompareOp::Lt => "t:IsLessThan",
            CompareOp::Lte => "t:IsLessThanOrEqualTo",
        }
    }
}

/// Which part of the field value a containment test matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentMode {
    FullString,
    Substring,
    Prefixed,
}

impl ContainmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainmentMode::FullString => "FullString",
            ContainmentMode::Substring => "Substring",
            ContainmentMode::Prefixed => "Prefixed",
        }
    }
}

/// Case sensitivity of a containment test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentComparison {
    Exact,
    IgnoreCase,
}

impl ContainmentComparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainmentComparison::Exact => "Exact",
            ContainmentComparison::IgnoreCase => "IgnoreCase",
        }
    }
}

/// A coerced literal together with its wire text.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    value: Value,
    text: String,
}

impl Literal {
    /// Renders a coerced value.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidLiteral` for values without a wire form.
    pub fn new(field: &str, value: Value) -> Result<Self> {
        let text = format_literal(field, &value)?;
        Ok(Self { value, text })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The wire text sent to the store.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One node of a compiled restriction.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        field: FieldUri,
        op: CompareOp,
        literal: Literal,
    },
    Contains {
        field: FieldUri,
        mode: ContainmentMode,
        comparison: ContainmentComparison,
        literal: Literal,
    },
    Exists {
        field: FieldUri,
    },
}

/// A wire-ready restriction. Immutable; cheap to clone and reuse.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRestriction {
    root: Expr,
}

impl CompiledRestriction {
    pub fn new(root: Expr) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Field paths referenced anywhere in the restriction, in tree order
    /// without duplicates.
    pub fn field_paths(&self) -> Vec<&FieldPath> {
        let mut paths = Vec::new();
        collect_paths(&self.root, &mut paths);
        paths
    }
}

fn collect_paths<'a>(expr: &'a Expr, paths: &mut Vec<&'a FieldPath>) {
    match expr {
        Expr::And(children) | Expr::Or(children) => {
            for child in children {
                collect_paths(child, paths);
            }
        }
        Expr::Not(child) => collect_paths(child, paths),
        Expr::Compare { field, .. } | Expr::Contains { field, .. } | Expr::Exists { field } => {
            if !paths.contains(&&field.path) {
                paths.push(&field.path);
            }
        }
    }
}

impl fmt::Display for CompiledRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}
