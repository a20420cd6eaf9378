//! Local evaluation of compiled restrictions against items.
//!
//! Mirrors the store's semantics closely enough for in-memory execution and
//! tests: missing values never compare equal, `!=` is always the complement of
//! `==`, and tests on list-valued fields match when any element matches.

use std::cmp::Ordering;

use itemstore_api_rs::models::{Item, Value};

use super::{CompareOp, CompiledRestriction, ContainmentComparison, ContainmentMode, Expr};

impl CompiledRestriction {
    /// Returns true if the item satisfies the restriction.
    pub fn matches(&self, item: &Item) -> bool {
        evaluate(&self.root, item)
    }
}

fn evaluate(expr: &Expr, item: &Item) -> bool {
    match expr {
        Expr::And(children) => children.iter().all(|c| evaluate(c, item)),
        Expr::Or(children) => children.iter().any(|c| evaluate(c, item)),
        Expr::Not(child) => !evaluate(child, item),
        Expr::Exists { field } => item.value_at(&field.path).is_some_and(|v| has_value(&v)),
        Expr::Compare { field, op, literal } => match item.value_at(&field.path) {
            Some(Value::List(values)) => match op {
                CompareOp::Ne => !values
                    .iter()
                    .any(|v| compare(v, CompareOp::Eq, literal.value())),
                _ => values.iter().any(|v| compare(v, *op, literal.value())),
            },
            value => {
                let ordering = value.and_then(|v| v.compare(literal.value()));
                ordering_matches(*op, ordering)
            }
        },
        Expr::Contains {
            field,
            mode,
            comparison,
            literal,
        } => match item.value_at(&field.path) {
            Some(Value::List(values)) => values
                .iter()
                .any(|v| text_matches(v, *mode, *comparison, literal.text())),
            Some(value) => text_matches(&value, *mode, *comparison, literal.text()),
            None => false,
        },
    }
}

fn compare(value: &Value, op: CompareOp, literal: &Value) -> bool {
    ordering_matches(op, value.compare(literal))
}

fn ordering_matches(op: CompareOp, ordering: Option<Ordering>) -> bool {
    match (op, ordering) {
        (CompareOp::Ne, None) => true,
        (_, None) => false,
        (CompareOp::Eq, Some(o)) => o == Ordering::Equal,
        (CompareOp::Ne, Some(o)) => o != Ordering::Equal,
        (CompareOp::Gt, Some(o)) => o == Ordering::Greater,
        (CompareOp::Gte, Some(o)) => o != Ordering::Less,
        (CompareOp::Lt, Some(o)) => o == Ordering::Less,
        (CompareOp::Lte, Some(o)) => o != Ordering::Greater,
    }
}

fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::List(values) => !values.is_empty(),
        _ => true,
    }
}

fn text_matches(
    value: &Value,
    mode: ContainmentMode,
    comparison: ContainmentComparison,
    needle: &str,
) -> bool {
    let Some(haystack) = value.as_str() else {
        return false;
    };
    let (haystack, needle) = match comparison {
        ContainmentComparison::Exact => (haystack.to_string(), needle.to_string()),
        ContainmentComparison::IgnoreCase => (haystack.to_lowercase(), needle.to_lowercase()),
    };
    match mode {
        ContainmentMode::FullString => haystack == needle,
        ContainmentMode::Substring => haystack.contains(&needle),
        ContainmentMode::Prefixed => haystack.starts_with(&needle),
    }
}
