//! Predicate tree to restriction compilation.

use itemstore_api_rs::fields::FieldCatalog;
use itemstore_api_rs::models::Value;
use tracing::trace;

use super::{
    CompareOp, CompiledRestriction, ContainmentComparison, ContainmentMode, Expr, FieldUri, Literal,
};
use crate::error::Result;
use crate::predicate::{Conn, Lookup, Op, Q};
use crate::resolve::{Resolver, Target};

/// Compiles a predicate into a restriction.
///
/// The tree is resolved against the catalog first, so every error is raised
/// here, before anything is sent to the store. Returns `Ok(None)` for the
/// identity predicate, which restricts nothing.
///
/// # Errors
///
/// Returns `UnknownField`, `UnsupportedLookup`, `InvalidLiteral` or
/// `AmbiguousFieldPath`.
pub fn compile(q: &Q, catalog: &FieldCatalog) -> Result<Option<CompiledRestriction>> {
    let resolver = Resolver::new(catalog);
    let resolved = resolver.resolve(q.clone())?;
    let restriction = compile_node(&resolved, &resolver)?.map(CompiledRestriction::new);
    if let Some(restriction) = &restriction {
        trace!(xml = %restriction.to_xml(), "Compiled restriction");
    }
    Ok(restriction)
}

fn compile_node(q: &Q, resolver: &Resolver<'_>) -> Result<Option<Expr>> {
    let (conn, children) = match q.flattened() {
        Q::Leaf(lookup) => return compile_leaf(lookup, resolver).map(Some),
        Q::Group { conn, children } => (*conn, children),
    };
    let mut compiled = Vec::with_capacity(children.len());
    for child in Q::sorted_children(children) {
        // Children that restrict nothing are dropped.
        if let Some(expr) = compile_node(child, resolver)? {
            compiled.push(expr);
        }
    }
    let inner = match compiled.len() {
        0 => return Ok(None),
        1 => compiled.pop(),
        _ => Some(match conn {
            Conn::Or => Expr::Or(compiled),
            Conn::And | Conn::Not => Expr::And(compiled),
        }),
    };
    Ok(match conn {
        Conn::Not => inner.map(|expr| Expr::Not(Box::new(expr))),
        Conn::And | Conn::Or => inner,
    })
}

fn compile_leaf(lookup: &Lookup, resolver: &Resolver<'_>) -> Result<Expr> {
    use ContainmentComparison::{Exact, IgnoreCase};
    use ContainmentMode::{FullString, Prefixed, Substring};

    let target = resolver.filter_target(&lookup.field, &lookup.key())?;
    let field = field_uri(&target);
    let name = target.path.to_string();

    let compare = |op: CompareOp, value: &Value| -> Result<Expr> {
        Ok(Expr::Compare {
            field: field.clone(),
            op,
            literal: Literal::new(&name, value.clone())?,
        })
    };
    let contains = |mode: ContainmentMode,
                    comparison: ContainmentComparison,
                    value: &Value|
     -> Result<Expr> {
        Ok(Expr::Contains {
            field: field.clone(),
            mode,
            comparison,
            literal: Literal::new(&name, value.clone())?,
        })
    };

    let value = &lookup.value;
    if target.is_multi_valued() && lookup.op == Op::Contains {
        // Membership in a list field matches whole elements.
        return compare(CompareOp::Eq, value);
    }
    match lookup.op {
        Op::Eq => compare(CompareOp::Eq, value),
        Op::Ne => compare(CompareOp::Ne, value),
        Op::Gt => compare(CompareOp::Gt, value),
        Op::Gte => compare(CompareOp::Gte, value),
        Op::Lt => compare(CompareOp::Lt, value),
        Op::Lte => compare(CompareOp::Lte, value),
        Op::Exact => contains(FullString, Exact, value),
        Op::IExact => contains(FullString, IgnoreCase, value),
        Op::Contains => contains(Substring, Exact, value),
        Op::IContains => contains(Substring, IgnoreCase, value),
        Op::StartsWith => contains(Prefixed, Exact, value),
        Op::IStartsWith => contains(Prefixed, IgnoreCase, value),
        Op::Exists => Ok(Expr::Exists {
            field: field.clone(),
        }),
        Op::In => {
            // The store has no native IN: expand to an OR, one test per value.
            let values = value.as_list().unwrap_or(std::slice::from_ref(value));
            let mut alternatives = values
                .iter()
                .map(|v| compare(CompareOp::Eq, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(match alternatives.len() {
                1 => alternatives.remove(0),
                _ => Expr::Or(alternatives),
            })
        }
    }
}

fn field_uri(target: &Target<'_>) -> FieldUri {
    let subfield = target
        .path
        .subfield
        .as_deref()
        .and_then(|name| target.def.index.as_ref()?.subfield(name));
    FieldUri {
        uri: subfield.map_or_else(|| target.def.uri.clone(), |s| s.uri.clone()),
        index: target.path.label.clone(),
        path: target.path.clone(),
    }
}
