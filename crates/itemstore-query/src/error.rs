//! Error types for query construction and execution.

use itemstore_api_rs::error::RemoteError;
use strsim::levenshtein;
use thiserror::Error;

/// Maximum Levenshtein distance to consider a field name as a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// A specialized Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors raised by the predicate compiler and the query engine.
///
/// Everything except [`QueryError::Remote`] is raised locally, before any
/// request reaches the store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    /// The field does not exist on the object type being queried.
    #[error("{}", format_unknown_field(field, object, suggestion.as_deref()))]
    UnknownField {
        field: String,
        object: String,
        suggestion: Option<String>,
    },

    /// The lookup suffix or the operator/field combination is not supported.
    #[error("lookup '{lookup}' is not supported: {reason}")]
    UnsupportedLookup { lookup: String, reason: String },

    /// A literal does not fit the field's type.
    #[error("invalid value {value} for field '{field}': {reason}")]
    InvalidLiteral {
        field: String,
        value: String,
        reason: String,
    },

    /// A labeled or sub-fielded path is missing a required part or names an
    /// unknown one.
    #[error("ambiguous field path '{path}': {reason}")]
    AmbiguousFieldPath { path: String, reason: String },

    /// Invalid arguments to a projection, ordering or slicing call.
    #[error("{message}")]
    InvalidSliceArguments { message: String },

    /// `get()` found no matching item.
    #[error("query matched no items")]
    DoesNotExist,

    /// `get()` found more than one matching item.
    #[error("query matched {count} items, expected exactly one")]
    MultipleObjectsReturned { count: usize },

    /// Single-index access past either end of the result.
    #[error("index {index} out of range")]
    IndexOutOfRange { index: isize },

    /// The store reported a failure for the item a terminal call returned.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

impl QueryError {
    /// Creates an unknown field error, suggesting a close match from `candidates`.
    pub fn unknown_field<'a>(
        field: impl Into<String>,
        object: impl Into<String>,
        candidates: impl Iterator<Item = &'a str>,
    ) -> Self {
        let field = field.into();
        let suggestion = find_similar_name(&field, candidates);
        QueryError::UnknownField {
            field,
            object: object.into(),
            suggestion,
        }
    }

    /// Creates an unsupported lookup error.
    pub fn unsupported_lookup(lookup: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::UnsupportedLookup {
            lookup: lookup.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid literal error.
    pub fn invalid_literal(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        QueryError::InvalidLiteral {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an ambiguous field path error.
    pub fn ambiguous_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::AmbiguousFieldPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid arguments error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        QueryError::InvalidSliceArguments {
            message: message.into(),
        }
    }

    /// Returns true for errors raised before any request reaches the store.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            QueryError::UnknownField { .. }
                | QueryError::UnsupportedLookup { .. }
                | QueryError::InvalidLiteral { .. }
                | QueryError::AmbiguousFieldPath { .. }
                | QueryError::InvalidSliceArguments { .. }
        )
    }
}

/// Formats the unknown field message, optionally including a suggestion.
fn format_unknown_field(field: &str, object: &str, suggestion: Option<&str>) -> String {
    let base = format!("'{}' is not a valid field on {}", field, object);
    match suggestion {
        Some(s) => format!("{}. Did you mean '{}'?", base, s),
        None => base,
    }
}

/// Finds the best matching name from a list of candidates using Levenshtein distance.
fn find_similar_name<'a>(query: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    let query_lower = query.to_lowercase();

    let (best_match, best_distance) = candidates
        .filter(|name| !name.is_empty())
        .map(|name| (name, levenshtein(&query_lower, &name.to_lowercase())))
        .min_by_key(|(_, d)| *d)?;

    if best_distance > 0 && best_distance <= MAX_SUGGESTION_DISTANCE {
        Some(best_match.to_string())
    } else {
        None
    }
}
