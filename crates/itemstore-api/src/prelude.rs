//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```
//! use itemstore_api_rs::prelude::*;
//!
//! let catalog = FieldCatalog::standard();
//! assert!(catalog.get("subject").is_some());
//! ```

// Error types
pub use crate::error::RemoteError;

// Field catalog
pub use crate::fields::{FieldCatalog, FieldDef, FieldKind, FieldPath, IndexSpec, Multiplicity};

// Data models
pub use crate::models::{Decimal, EntityShape, FolderId, Item, ItemId, TraversalDepth, Value};
