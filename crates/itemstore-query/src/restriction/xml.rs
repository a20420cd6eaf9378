//! XML rendering of compiled restrictions.

use std::fmt::Write;

use quick_xml::escape::escape;

use super::{CompiledRestriction, Expr, FieldUri};

const MESSAGES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
const TYPES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/types";

impl CompiledRestriction {
    /// Renders the restriction as the store's `m:Restriction` element.
    ///
    /// The `t:` namespace is declared on the first child. Attribute values
    /// are XML-escaped.
    pub fn to_xml(&self) -> String {
        let mut out = format!(r#"<m:Restriction xmlns:m="{}">"#, MESSAGES_NS);
        write_expr(&mut out, &self.root, true);
        out.push_str("</m:Restriction>");
        out
    }
}

fn open(out: &mut String, name: &str, declare_ns: bool, attrs: &[(&str, &str)]) {
    out.push('<');
    out.push_str(name);
    if declare_ns {
        let _ = write!(out, r#" xmlns:t="{}""#, TYPES_NS);
    }
    for (key, value) in attrs {
        let _ = write!(out, r#" {}="{}""#, key, escape(*value));
    }
}

fn element(out: &mut String, name: &str, attrs: &[(&str, &str)]) {
    open(out, name, false, attrs);
    out.push_str("/>");
}

fn close(out: &mut String, name: &str) {
    let _ = write!(out, "</{}>", name);
}

fn write_field(out: &mut String, field: &FieldUri) {
    match &field.index {
        Some(label) => element(
            out,
            "t:IndexedFieldURI",
            &[("FieldURI", field.uri.as_str()), ("FieldIndex", label.as_str())],
        ),
        None => element(out, "t:FieldURI", &[("FieldURI", field.uri.as_str())]),
    }
}

fn write_expr(out: &mut String, expr: &Expr, declare_ns: bool) {
    match expr {
        Expr::And(children) | Expr::Or(children) => {
            let name = if matches!(expr, Expr::And(_)) { "t:And" } else { "t:Or" };
            open(out, name, declare_ns, &[]);
            out.push('>');
            for child in children {
                write_expr(out, child, false);
            }
            close(out, name);
        }
        Expr::Not(child) => {
            open(out, "t:Not", declare_ns, &[]);
            out.push('>');
            write_expr(out, child, false);
            close(out, "t:Not");
        }
        Expr::Compare { field, op, literal } => {
            let name = op.element();
            open(out, name, declare_ns, &[]);
            out.push('>');
            write_field(out, field);
            out.push_str("<t:FieldURIOrConstant>");
            element(out, "t:Constant", &[("Value", literal.text())]);
            out.push_str("</t:FieldURIOrConstant>");
            close(out, name);
        }
        Expr::Contains {
            field,
            mode,
            comparison,
            literal,
        } => {
            open(
                out,
                "t:Contains",
                declare_ns,
                &[
                    ("ContainmentMode", mode.as_str()),
                    ("ContainmentComparison", comparison.as_str()),
                ],
            );
            out.push('>');
            write_field(out, field);
            element(out, "t:Constant", &[("Value", literal.text())]);
            close(out, "t:Contains");
        }
        Expr::Exists { field } => {
            open(out, "t:Exists", declare_ns, &[]);
            out.push('>');
            write_field(out, field);
            close(out, "t:Exists");
        }
    }
}
