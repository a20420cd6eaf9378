//! Literal coercion and wire formatting.
//!
//! Every literal in a predicate is checked against the semantic kind of the
//! field it is compared with, normalized (decimals from integers, timestamps
//! to UTC) and finally rendered to the text form the store expects.
//!
//! | Kind       | Accepted literals           | Wire form                      |
//! |------------|-----------------------------|--------------------------------|
//! | text       | text                        | as is                          |
//! | choice     | text among the choices      | as is                          |
//! | boolean    | boolean                     | `true` / `false`               |
//! | integer    | integer                     | decimal digits                 |
//! | decimal    | decimal, integer            | digits, scale preserved        |
//! | datetime   | zone-aware timestamp        | RFC 3339 in UTC, `Z` suffix    |
//! | date       | date                        | `YYYY-MM-DD`                   |

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use itemstore_api_rs::fields::FieldKind;
use itemstore_api_rs::models::{Decimal, Value};

use crate::error::{QueryError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Checks a scalar literal against a field kind and normalizes it.
///
/// # Errors
///
/// Returns `QueryError::InvalidLiteral` when the literal does not fit the
/// kind. Nothing is converted across incompatible types: text is never parsed
/// into a number and a list is never turned into a scalar.
pub fn coerce_literal(field: &str, kind: &FieldKind, value: Value) -> Result<Value> {
    let mismatch = |value: &Value| {
        QueryError::invalid_literal(
            field,
            value,
            format!("expected a {} value, got {}", kind.name(), value.type_name()),
        )
    };
    match (kind, value) {
        (FieldKind::Text, value @ Value::Text(_)) => Ok(value),
        (FieldKind::Choice(choices), Value::Text(text)) => {
            if choices.iter().any(|c| *c == text) {
                Ok(Value::Text(text))
            } else {
                Err(QueryError::invalid_literal(
                    field,
                    Value::Text(text),
                    format!("valid choices are: {}", choices.join(", ")),
                ))
            }
        }
        (FieldKind::Boolean, value @ Value::Bool(_)) => Ok(value),
        (FieldKind::Integer, value @ Value::Int(_)) => Ok(value),
        (FieldKind::Decimal, value @ Value::Decimal(_)) => Ok(value),
        (FieldKind::Decimal, Value::Int(i)) => Ok(Value::Decimal(Decimal::from(i))),
        (FieldKind::DateTime, Value::DateTime(dt)) => {
            Ok(Value::DateTime(dt.with_timezone(&Utc).fixed_offset()))
        }
        (FieldKind::DateTime, value @ Value::NaiveDateTime(_)) => Err(QueryError::invalid_literal(
            field,
            value,
            "timestamps must be timezone aware",
        )),
        (FieldKind::Date, value @ Value::Date(_)) => Ok(value),
        (FieldKind::Record, value) => Err(QueryError::invalid_literal(
            field,
            value,
            "record fields can only be compared through a sub-field",
        )),
        (_, value) => Err(mismatch(&value)),
    }
}

/// Renders a coerced scalar literal as wire text.
///
/// # Errors
///
/// Returns `QueryError::InvalidLiteral` for values without a scalar wire form
/// (null, lists, records, labeled entries, naive timestamps).
pub fn format_literal(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::Text(text) => Ok(text.clone()),
        Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Decimal(d) => Ok(d.to_string()),
        Value::DateTime(dt) => Ok(dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Date(d) => Ok(d.format(DATE_FORMAT).to_string()),
        other => Err(QueryError::invalid_literal(
            field,
            other,
            format!("{} values have no wire form", other.type_name()),
        )),
    }
}

/// Parses wire text back into a literal of the given kind.
///
/// This is the inverse of [`format_literal`] for every scalar kind, so that
/// `parse_literal(kind, format_literal(v)) == v` for coerced values.
pub fn parse_literal(field: &str, kind: &FieldKind, text: &str) -> Result<Value> {
    let invalid = |reason: &str| QueryError::invalid_literal(field, text, reason);
    let value = match kind {
        FieldKind::Text | FieldKind::Choice(_) => Value::Text(text.to_string()),
        FieldKind::Boolean => match text {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => return Err(invalid("expected true, false, 1 or 0")),
        },
        FieldKind::Integer => Value::Int(text.parse().map_err(|_| invalid("expected an integer"))?),
        FieldKind::Decimal => {
            Value::Decimal(text.parse().map_err(|_| invalid("expected a decimal number"))?)
        }
        FieldKind::DateTime => Value::DateTime(
            DateTime::parse_from_rfc3339(text)
                .map_err(|_| invalid("expected an RFC 3339 timestamp"))?,
        ),
        FieldKind::Date => Value::Date(
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map_err(|_| invalid("expected a date as YYYY-MM-DD"))?,
        ),
        FieldKind::Record => return Err(invalid("record fields have no wire form")),
    };
    coerce_literal(field, kind, value)
}
