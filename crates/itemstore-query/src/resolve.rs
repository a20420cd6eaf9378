//! Lookup resolution against a field catalog.
//!
//! [`Q::kw`] only parses lookup keys. The [`Resolver`] checks every leaf of a
//! predicate against the [`FieldCatalog`]: the field must exist and be
//! searchable, labeled fields must name a valid label (and sub-field), the
//! operator must make sense for the field, and the literal is coerced to the
//! field's kind. List-valued lookups are rewritten into their canonical form
//! along the way.
//!
//! Resolution is pure and idempotent: resolving an already resolved tree
//! yields the same tree.

use std::fmt;

use itemstore_api_rs::fields::{FieldCatalog, FieldDef, FieldKind, FieldPath, IndexSpec, PATH_SEPARATOR};
use itemstore_api_rs::models::Value;

use crate::coerce::coerce_literal;
use crate::error::{QueryError, Result};
use crate::predicate::{Lookup, Op, Q};

/// Sub-fields of records are compared as text.
static SUBFIELD_KIND: FieldKind = FieldKind::Text;

/// A filterable field path checked against the catalog.
#[derive(Debug, Clone)]
pub(crate) struct Target<'c> {
    pub def: &'c FieldDef,
    pub path: FieldPath,
}

impl Target<'_> {
    /// The kind literals are coerced to.
    pub fn kind(&self) -> &FieldKind {
        match self.path.subfield {
            Some(_) => &SUBFIELD_KIND,
            None => &self.def.kind,
        }
    }

    /// True when the lookup tests membership in a list of values rather than
    /// comparing a single value. A label always selects a single entry.
    pub fn is_multi_valued(&self) -> bool {
        self.def.is_list() && !self.def.is_indexed()
    }
}

/// One client-side sort key: a field path and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOrder {
    pub path: FieldPath,
    pub descending: bool,
}

impl fmt::Display for FieldOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-")?;
        }
        write!(f, "{}", self.path)
    }
}

/// Validates predicates and field paths against one catalog.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'c> {
    catalog: &'c FieldCatalog,
}

impl<'c> Resolver<'c> {
    pub fn new(catalog: &'c FieldCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'c FieldCatalog {
        self.catalog
    }

    /// Resolves every leaf of a predicate.
    ///
    /// # Errors
    ///
    /// Returns the first `UnknownField`, `UnsupportedLookup`, `InvalidLiteral`
    /// or `AmbiguousFieldPath` error found, in tree order.
    pub fn resolve(&self, q: Q) -> Result<Q> {
        q.try_map_leaves(&mut |lookup| self.resolve_lookup(lookup))
    }

    fn resolve_lookup(&self, lookup: Lookup) -> Result<Q> {
        let key = lookup.key();
        let target = self.filter_target(&lookup.field, &key)?;
        let field = target.path.to_string();

        if lookup.op == Op::Exists {
            return match lookup.value {
                Value::Bool(true) => Ok(Q::leaf(field, Op::Exists, true)),
                Value::Bool(false) => Ok(Q::leaf(field, Op::Exists, true).negate()),
                other => Err(QueryError::invalid_literal(
                    key,
                    other,
                    "exists requires true or false",
                )),
            };
        }
        if target.is_multi_valued() {
            return self.resolve_membership(&target, field, &key, lookup.op, lookup.value);
        }

        let kind = target.kind();
        match (lookup.op, lookup.value) {
            (Op::In, Value::List(values)) => {
                let values = coerce_all(&field, &key, kind, values)?;
                Ok(Q::leaf(field, Op::In, values))
            }
            (Op::In, value) => {
                let value = coerce_literal(&field, kind, value)?;
                Ok(Q::leaf(field, Op::Eq, value))
            }
            (_, value @ Value::List(_)) => Err(QueryError::invalid_literal(
                field,
                value,
                "expected a single value, got a list",
            )),
            (op, value) => {
                if (op.is_containment() || op.is_case_insensitive()) && !kind.is_textual() {
                    return Err(QueryError::unsupported_lookup(
                        key,
                        format!(
                            "'{}' is only supported on text fields, '{}' is a {} field",
                            op.suffix(),
                            field,
                            kind.name()
                        ),
                    ));
                }
                let value = coerce_literal(&field, kind, value)?;
                Ok(Q::leaf(field, op, value))
            }
        }
    }

    /// Lookups on list-valued fields: `contains` with a list means "has all
    /// of these", `in` means "has at least one of these".
    fn resolve_membership(
        &self,
        target: &Target<'_>,
        field: String,
        key: &str,
        op: Op,
        value: Value,
    ) -> Result<Q> {
        if !matches!(op, Op::Contains | Op::In) {
            return Err(QueryError::unsupported_lookup(
                key,
                format!(
                    "only contains, in and exists are supported on list field '{}'",
                    field
                ),
            ));
        }
        let kind = target.kind();
        let values = match value {
            Value::List(values) => coerce_all(&field, key, kind, values)?,
            scalar => {
                let value = coerce_literal(&field, kind, scalar)?;
                return Ok(Q::leaf(field, Op::Contains, value));
            }
        };
        match op {
            Op::Contains => Ok(Q::all_of(
                values
                    .into_iter()
                    .map(|v| Q::leaf(field.clone(), Op::Contains, v)),
            )),
            _ => Ok(Q::leaf(field, Op::In, values)),
        }
    }

    /// Checks a field path used in a filter. Labeled fields require a label,
    /// and a sub-field when the field declares any.
    pub(crate) fn filter_target(&self, raw: &str, key: &str) -> Result<Target<'c>> {
        let path = FieldPath::split(raw)
            .ok_or_else(|| QueryError::unsupported_lookup(key, "malformed field path"))?;
        let def = self.field_def(&path.field)?;
        if !def.searchable {
            return Err(QueryError::unsupported_lookup(
                key,
                format!("field '{}' is not searchable", def.name),
            ));
        }
        if def.is_list() && def.kind == FieldKind::Record && !def.is_indexed() {
            return Err(QueryError::unsupported_lookup(
                key,
                format!("field '{}' is a list of records and cannot be searched", def.name),
            ));
        }
        match &def.index {
            Some(index) if index.subfields.is_empty() && path.subfield.is_some() => {
                let suffix = path.subfield.as_deref().unwrap_or(raw);
                return Err(QueryError::unsupported_lookup(
                    key,
                    format!("unknown lookup suffix '{}'", suffix),
                ));
            }
            Some(index) => check_index(index, &path, true)?,
            None if path.label.is_some() => {
                let suffix = raw.rsplit(PATH_SEPARATOR).next().unwrap_or(raw);
                return Err(QueryError::unsupported_lookup(
                    key,
                    format!("unknown lookup suffix '{}'", suffix),
                ));
            }
            None => {}
        }
        Ok(Target { def, path })
    }

    /// Checks a field path used in a projection or ordering. A label is
    /// optional there: without one the whole field is fetched.
    pub fn field_path(&self, raw: &str) -> Result<FieldPath> {
        let path = FieldPath::split(raw)
            .ok_or_else(|| QueryError::ambiguous_path(raw, "malformed field path"))?;
        let def = self.field_def(&path.field)?;
        match &def.index {
            Some(index) => check_index(index, &path, false)?,
            None if path.label.is_some() => {
                return Err(QueryError::ambiguous_path(
                    raw,
                    format!("field '{}' has no labels", def.name),
                ));
            }
            None => {}
        }
        Ok(path)
    }

    /// Parses a sort key such as `subject` or `-datetime_received`.
    pub fn order(&self, key: &str) -> Result<FieldOrder> {
        let (descending, raw) = match key.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, key),
        };
        Ok(FieldOrder {
            path: self.field_path(raw)?,
            descending,
        })
    }

    fn field_def(&self, name: &str) -> Result<&'c FieldDef> {
        self.catalog.get(name).ok_or_else(|| {
            QueryError::unknown_field(name, self.catalog.object(), self.catalog.names())
        })
    }
}

fn coerce_all(field: &str, key: &str, kind: &FieldKind, values: Vec<Value>) -> Result<Vec<Value>> {
    if values.is_empty() {
        return Err(QueryError::invalid_literal(
            key,
            Value::List(values),
            "list cannot be empty",
        ));
    }
    values
        .into_iter()
        .map(|v| coerce_literal(field, kind, v))
        .collect()
}

fn check_index(index: &IndexSpec, path: &FieldPath, require_label: bool) -> Result<()> {
    let Some(label) = path.label.as_deref() else {
        if require_label {
            return Err(QueryError::ambiguous_path(
                path.to_string(),
                format!("a label is required, one of: {}", index.labels.join(", ")),
            ));
        }
        return Ok(());
    };
    if !index.has_label(label) {
        return Err(QueryError::ambiguous_path(
            path.to_string(),
            format!(
                "unknown label '{}', valid labels are: {}",
                label,
                index.labels.join(", ")
            ),
        ));
    }
    let subfield_names = || {
        index
            .subfields
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    match path.subfield.as_deref() {
        None if require_label && !index.subfields.is_empty() => Err(QueryError::ambiguous_path(
            path.to_string(),
            format!("a sub-field is required, one of: {}", subfield_names()),
        )),
        Some(_) if index.subfields.is_empty() => Err(QueryError::ambiguous_path(
            path.to_string(),
            format!("field '{}' has no sub-fields", path.field),
        )),
        Some(sub) if index.subfield(sub).is_none() => Err(QueryError::ambiguous_path(
            path.to_string(),
            format!(
                "unknown sub-field '{}', valid sub-fields are: {}",
                sub,
                subfield_names()
            ),
        )),
        _ => Ok(()),
    }
}
