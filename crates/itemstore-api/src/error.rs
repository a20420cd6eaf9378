//! Error types reported by the remote item store.

use std::fmt;

/// A final, non-retryable failure reported by the store for a single item or page.
///
/// The transport layer has already applied its retry policy by the time one of
/// these reaches a caller, so they are surfaced inline in result streams rather
/// than aborting a whole query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The store rejected one item with a response code (e.g. `ErrorItemCorrupt`).
    Item { code: String, message: String },
    /// The referenced item or folder does not exist.
    NotFound { resource: String, id: String },
    /// Authentication or authorization failure.
    Auth { message: String },
    /// Network/connection error that outlived the transport's retries.
    Network { message: String },
    /// Any other server-side failure.
    Server { code: String, message: String },
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Item { code, message } => write!(f, "item error {}: {}", code, message),
            RemoteError::NotFound { resource, id } => write!(f, "{} not found: {}", resource, id),
            RemoteError::Auth { message } => write!(f, "Auth error: {}", message),
            RemoteError::Network { message } => write!(f, "Network error: {}", message),
            RemoteError::Server { code, message } => {
                write!(f, "server error {}: {}", code, message)
            }
        }
    }
}

impl std::error::Error for RemoteError {}

impl RemoteError {
    /// Creates an item-level error with the store's response code.
    pub fn item(code: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::Item {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a not-found error for an item id.
    pub fn item_not_found(id: impl Into<String>) -> Self {
        RemoteError::NotFound {
            resource: "item".to_string(),
            id: id.into(),
        }
    }

    /// Returns true if the failure was transient in nature.
    ///
    /// The query engine never retries; this only helps callers decide whether
    /// re-running a query is worthwhile.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Network { .. })
    }

    /// Returns the store's response code, if there is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            RemoteError::Item { code, .. } | RemoteError::Server { code, .. } => Some(code),
            _ => None,
        }
    }
}
